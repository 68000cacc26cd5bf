//! Dependency manifest colocated with a boundary's base directory.
//!
//! ```json
//! { "dependencies": { "script:format/text": "libs/format.wasm" } }
//! ```
//!
//! Keys are import names, values are component paths. Relative paths are resolved against
//! the base directory.

use std::collections::HashMap ;
use std::path::{ Path, PathBuf };
use serde::Deserialize ;
use thiserror::Error ;



/// File name of the manifest inside the base directory.
pub const MANIFEST_FILE_NAME: &str = "deps.json" ;

/// Errors raised while reading a dependency manifest.
#[derive( Debug, Error )]
pub enum ManifestError {
	/// The manifest exists but could not be read.
	#[error( "Failed to read {}: {}", .0.display(), .1 )] Io( PathBuf, std::io::Error ),
	/// The manifest is not valid JSON of the expected shape.
	#[error( "Malformed manifest {}: {}", .0.display(), .1 )] Malformed( PathBuf, serde_json::Error ),
}

#[derive( Debug, Default, Deserialize )]
struct ManifestData {
	#[serde( default )]
	dependencies: HashMap<String, PathBuf>,
}

/// Maps import names to component paths for one base directory.
#[derive( Debug, Clone, Default )]
pub struct DependencyManifest {
	base_dir: PathBuf,
	dependencies: HashMap<String, PathBuf>,
}

impl DependencyManifest {

	/// Reads `deps.json` from `base_dir`. A missing file is an empty manifest.
	///
	/// # Errors
	/// Returns an error if the file exists but can't be read or parsed.
	pub fn load( base_dir: &Path ) -> Result<Self, ManifestError> {
		let path = base_dir.join( MANIFEST_FILE_NAME );
		let data = match std::fs::read_to_string( &path ) {
			Ok( text ) => Self::parse( &text ).map_err(| err | ManifestError::Malformed( path, err ))?,
			Err( err ) if err.kind() == std::io::ErrorKind::NotFound => ManifestData::default(),
			Err( err ) => return Err( ManifestError::Io( path, err )),
		};
		Ok( Self { base_dir: base_dir.to_path_buf(), dependencies: data.dependencies })
	}

	fn parse( text: &str ) -> Result<ManifestData, serde_json::Error> { serde_json::from_str( text ) }

	/// Returns the path listed for `import`, if it is listed and the file exists.
	pub fn resolve( &self, import: &str ) -> Option<PathBuf> {
		let listed = self.dependencies.get( import )?;
		let path = match listed.is_absolute() {
			true => listed.clone(),
			false => self.base_dir.join( listed ),
		};
		path.is_file().then_some( path )
	}

	#[inline] pub fn len( &self ) -> usize { self.dependencies.len() }
	#[inline] pub fn is_empty( &self ) -> bool { self.dependencies.is_empty() }

}

#[cfg( test )]
mod tests {
	use super::*;

	#[test]
	fn missing_manifest_is_empty() {
		let dir = tempfile::tempdir().unwrap();
		let manifest = DependencyManifest::load( dir.path() ).unwrap();
		assert!( manifest.is_empty() );
		assert_eq!( manifest.resolve( "script:format/text" ), None );
	}

	#[test]
	fn listed_paths_resolve_relative_to_base_dir() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write( dir.path().join( "format.wat" ), "(component)" ).unwrap();
		std::fs::write(
			dir.path().join( MANIFEST_FILE_NAME ),
			r#"{ "dependencies": { "script:format/text": "format.wat", "script:gone/text": "gone.wat" } }"#,
		).unwrap();

		let manifest = DependencyManifest::load( dir.path() ).unwrap();
		assert_eq!( manifest.len(), 2 );
		assert_eq!( manifest.resolve( "script:format/text" ), Some( dir.path().join( "format.wat" )));
		assert_eq!( manifest.resolve( "script:gone/text" ), None );
	}

	#[test]
	fn malformed_manifest_is_an_error() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write( dir.path().join( MANIFEST_FILE_NAME ), "{ not json" ).unwrap();
		match DependencyManifest::load( dir.path() ) {
			Err( ManifestError::Malformed( _, _ )) => {}
			other => panic!( "Expected Malformed, found: {:?}", other ),
		}
	}
}
