//! Host configuration.
//!
//! ```toml
//! optimization-level = "debug"
//! warnings-as-errors = true
//! max-memory-bytes = 16777216
//! unload-max-attempts = 20
//! unload-delay-ms = 50
//! ```
//!
//! Every key is optional.

use std::path::{ Path, PathBuf };
use std::time::Duration ;
use serde::Deserialize ;
use thiserror::Error ;

use crate::compiler::OptimizationLevel ;
use crate::monitor::{ DEFAULT_DELAY, DEFAULT_MAX_ATTEMPTS, UnloadMonitor };



#[derive( Debug, Error )]
pub enum ConfigError {
	/// The configuration file could not be read.
	#[error( "Failed to read {}: {}", .0.display(), .1 )] Io( PathBuf, std::io::Error ),
	/// Malformed TOML, a value of the wrong type, or an unknown key.
	#[error( "Invalid Configuration: {0}" )] Parse( #[from] toml::de::Error ),
}

/// Settings shared by every boundary a host creates.
#[derive( Debug, Clone, PartialEq, Eq, Deserialize )]
#[serde( default, rename_all = "kebab-case", deny_unknown_fields )]
pub struct HostConfig {
	pub optimization_level: OptimizationLevel,
	/// Fail compilation on warnings as well as errors.
	pub warnings_as_errors: bool,
	/// Upper bound on linear memory per store. Unlimited when unset.
	pub max_memory_bytes: Option<usize>,
	pub unload_max_attempts: u32,
	pub unload_delay_ms: u64,
}

impl Default for HostConfig {
	fn default() -> Self {
		Self {
			optimization_level: OptimizationLevel::default(),
			warnings_as_errors: false,
			max_memory_bytes: None,
			unload_max_attempts: DEFAULT_MAX_ATTEMPTS,
			unload_delay_ms: whole_millis( DEFAULT_DELAY ),
		}
	}
}

impl HostConfig {

	/// # Errors
	/// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys.
	pub fn from_toml_str( text: &str ) -> Result<Self, ConfigError> {
		Ok( toml::from_str( text )? )
	}

	/// # Errors
	/// Returns [`ConfigError::Io`] if the file can't be read, otherwise as [`HostConfig::from_toml_str`].
	pub fn from_file( path: impl AsRef<Path> ) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string( path )
			.map_err(| err | ConfigError::Io( path.to_path_buf(), err ))?;
		Self::from_toml_str( &text )
	}

	pub fn with_optimization_level( mut self, optimization_level: OptimizationLevel ) -> Self {
		self.optimization_level = optimization_level ;
		self
	}

	pub fn with_warnings_as_errors( mut self, enabled: bool ) -> Self {
		self.warnings_as_errors = enabled ;
		self
	}

	pub fn with_max_memory_bytes( mut self, bytes: usize ) -> Self {
		self.max_memory_bytes = Some( bytes );
		self
	}

	pub fn with_unload_monitor( mut self, monitor: UnloadMonitor ) -> Self {
		self.unload_max_attempts = monitor.max_attempts();
		self.unload_delay_ms = whole_millis( monitor.delay() );
		self
	}

	/// The unload monitor these settings describe.
	pub fn monitor( &self ) -> UnloadMonitor {
		UnloadMonitor::new( self.unload_max_attempts, Duration::from_millis( self.unload_delay_ms ))
	}

}

/// Saturates at `u64::MAX` milliseconds.
fn whole_millis( duration: Duration ) -> u64 {
	u64::try_from( duration.as_millis() ).unwrap_or( u64::MAX )
}

#[cfg( test )]
mod tests {
	use super::*;

	#[test]
	fn empty_config_is_default() {
		assert_eq!( HostConfig::from_toml_str( "" ).unwrap(), HostConfig::default() );
	}

	#[test]
	fn keys_are_kebab_case() {
		let config = HostConfig::from_toml_str( r#"
			optimization-level = "debug"
			warnings-as-errors = true
			max-memory-bytes = 65536
			unload-max-attempts = 3
			unload-delay-ms = 5
		"# ).unwrap();
		assert_eq!( config.optimization_level, OptimizationLevel::Debug );
		assert!( config.warnings_as_errors );
		assert_eq!( config.max_memory_bytes, Some( 65536 ));
		assert_eq!( config.monitor(), UnloadMonitor::new( 3, Duration::from_millis( 5 )));
	}

	#[test]
	fn unknown_keys_are_rejected() {
		match HostConfig::from_toml_str( "optimisation = \"debug\"" ) {
			Err( ConfigError::Parse( _ )) => {}
			other => panic!( "Expected Parse, found: {:?}", other ),
		}
	}

	#[test]
	fn monitor_delay_round_trips_through_millis() {
		let monitor = UnloadMonitor::new( 4, Duration::from_millis( 250 ));
		assert_eq!( HostConfig::default().with_unload_monitor( monitor ).monitor(), monitor );
	}

	#[test]
	fn oversized_delay_saturates() {
		let config = HostConfig::default().with_unload_monitor( UnloadMonitor::new( 1, Duration::MAX ));
		assert_eq!( config.unload_delay_ms, u64::MAX );
		assert_eq!( config.unload_max_attempts, 1 );
	}

	#[test]
	fn missing_file_is_an_io_error() {
		let dir = tempfile::tempdir().unwrap();
		match HostConfig::from_file( dir.path().join( "host.toml" )) {
			Err( ConfigError::Io( path, _ )) => assert_eq!( path, dir.path().join( "host.toml" )),
			other => panic!( "Expected Io, found: {:?}", other ),
		}
	}
}
