//! Reference resolution for the compiler frontend.
//!
//! A reference names a component file (binary `.wasm` or text `.wat`) whose exports a
//! script is allowed to import. Names may be relative or absolute paths, or bare file names
//! that are looked up in the runtime library directory.

use std::path::{ Path, PathBuf };
use thiserror::Error ;
use tracing::{ debug, warn };



/// A resolved reference: the absolute path of a component file.
///
/// The token is a reference, not a snapshot. The file is read again when a script is
/// compiled, so edits made between resolution and compilation are picked up.
#[derive( Debug, Clone, PartialEq, Eq, Hash )]
pub struct ReferenceToken {
	path: PathBuf,
}

impl ReferenceToken {

	fn open( path: PathBuf ) -> Result<Self, ReferenceError> {
		let file = match std::fs::File::open( &path ) {
			Ok( file ) => file,
			Err( err ) => return Err( ReferenceError::InvalidToken( path, err )),
		};
		match file.metadata() {
			Ok( metadata ) if metadata.is_file() => Ok( Self { path }),
			Ok( _ ) => Err( ReferenceError::NotAFile( path )),
			Err( err ) => Err( ReferenceError::InvalidToken( path, err )),
		}
	}

	/// Absolute path of the referenced component file.
	#[inline] pub fn path( &self ) -> &Path { &self.path }

}

/// Why a reference name could not be added to a [`ReferenceSet`].
#[derive( Debug, Error )]
pub enum ReferenceError {
	/// The name was empty or whitespace.
	#[error( "Empty Reference Name" )] EmptyName,
	/// Neither the path itself nor the runtime library directory contains the file.
	#[error( "Unresolved Reference: {0}" )] Unresolved( String ),
	/// The file exists but could not be opened.
	#[error( "Invalid Reference {}: {}", .0.display(), .1 )] InvalidToken( PathBuf, std::io::Error ),
	/// The resolved path is not a regular file.
	#[error( "Not A File: {}", .0.display() )] NotAFile( PathBuf ),
}

/// Ordered set of resolved references, unique by absolute path.
#[derive( Debug, Clone )]
pub struct ReferenceSet {
	runtime_library_dir: PathBuf,
	tokens: Vec<ReferenceToken>,
}

impl ReferenceSet {

	/// Creates an empty set whose bare file names fall back to `runtime_library_dir`.
	pub fn new( runtime_library_dir: impl Into<PathBuf> ) -> Self {
		let runtime_library_dir = runtime_library_dir.into();
		Self {
			runtime_library_dir: std::path::absolute( &runtime_library_dir ).unwrap_or( runtime_library_dir ),
			tokens: Vec::new(),
		}
	}

	/// Directory searched for references that don't resolve as given.
	#[inline] pub fn runtime_library_dir( &self ) -> &Path { &self.runtime_library_dir }

	/// Resolves `name` and appends it unless a reference with the same absolute path is
	/// already present. Adding a duplicate succeeds without changing the set.
	///
	/// # Errors
	/// Returns the reason the name could not be resolved. The set is left untouched.
	pub fn try_add( &mut self, name: &str ) -> Result<(), ReferenceError> {

		let trimmed = name.trim();
		if trimmed.is_empty() { return Err( ReferenceError::EmptyName ) }

		let absolute = std::path::absolute( trimmed )
			.map_err(|_| ReferenceError::Unresolved( name.to_string() ))?;
		if self.contains( &absolute ) { return Ok(()) }

		let resolved = match absolute.is_file() {
			true => absolute,
			false => {
				let fallback = Path::new( trimmed ).file_name()
					.map(| file_name | self.runtime_library_dir.join( file_name ))
					.filter(| candidate | candidate.is_file() )
					.ok_or_else(|| ReferenceError::Unresolved( name.to_string() ))?;
				if self.contains( &fallback ) { return Ok(()) }
				fallback
			}
		};

		let token = ReferenceToken::open( resolved )?;
		debug!( reference = %token.path().display(), "reference added" );
		self.tokens.push( token );
		Ok(())

	}

	/// Like [`ReferenceSet::try_add`] but only reports whether the name was accepted.
	pub fn add( &mut self, name: &str ) -> bool {
		match self.try_add( name ) {
			Ok(()) => true,
			Err( err ) => {
				warn!( reference = name, error = %err, "reference rejected" );
				false
			}
		}
	}

	/// Adds every name, continuing past failures. Returns the names that failed, in the
	/// order they were given.
	pub fn add_all<I, S>( &mut self, names: I ) -> Vec<String>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		names.into_iter()
			.filter(| name | !self.add( name.as_ref() ))
			.map(| name | name.as_ref().to_string() )
			.collect()
	}

	/// Returns `true` if a reference with this absolute path is present.
	pub fn contains( &self, path: &Path ) -> bool {
		self.tokens.iter().any(| token | token.path == path )
	}

	#[inline] pub fn len( &self ) -> usize { self.tokens.len() }
	#[inline] pub fn is_empty( &self ) -> bool { self.tokens.is_empty() }
	#[inline] pub fn iter( &self ) -> std::slice::Iter<'_, ReferenceToken> { self.tokens.iter() }

}

impl<'a> IntoIterator for &'a ReferenceSet {
	type Item = &'a ReferenceToken ;
	type IntoIter = std::slice::Iter<'a, ReferenceToken> ;
	fn into_iter( self ) -> Self::IntoIter { self.tokens.iter() }
}
