//! Compile WebAssembly component scripts at run time, run them inside an unloadable
//! boundary, and confirm that the boundary was actually torn down.
//!
//! Scripts are components written in the WebAssembly text format. They may import
//! interfaces exported by other components, the script's **references**. A script is run
//! by exporting an interface with an `execute: func( name: string ) -> string` function.
//!
//! # Core Concepts
//!
//! - [`ScriptCompiler`]: Compiles source text into a [`CompiledModule`], checking every
//! 	import against the registered references. Failures come back as a list of
//! 	[`Diagnostic`]s instead of a single error.
//!
//! - [`ScriptContext`]: A loading boundary. Owns the compiled module, its linker and every
//! 	dependency instance. Dependencies are found through the boundary's `deps.json`
//! 	manifest first, then through the compile-time references.
//!
//! - [`EntryPoint`] / [`ScriptInstance`]: The one exported interface satisfying the
//! 	[`CapabilityContract`], and a running instance of it. Invocations run on tokio's
//! 	blocking pool and can be cancelled.
//!
//! - [`ObservationHandle`] / [`UnloadMonitor`]: A weak view of a boundary, and a poller that
//! 	waits for it to be reclaimed after [`ScriptContext::unload`].
//!
//! - [`ScriptExecutor`]: Everything above in one call, driven by a [`HostConfig`].
//!
//! # Example
//!
//! ```no_run
//! use wasm_script_host::{ HostConfig, ScriptExecutor };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = std::fs::read_to_string( "demos/greeter.wat" )?;
//! let executor = ScriptExecutor::new( HostConfig::default() );
//! let report = executor.execute_entry_point( "demos", &source, Vec::<String>::new(), "Mary", None ).await?;
//!
//! match report.result {
//! 	Ok( Ok( greeting )) => println!( "{}", greeting ),
//! 	Ok( Err( err )) => eprintln!( "script failed: {}", err ),
//! 	Err( diagnostics ) => diagnostics.iter().for_each(| diagnostic | eprintln!( "{}", diagnostic )),
//! }
//! assert!( report.unload.is_reclaimed() );
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! The crate logs through [`tracing`] and never installs a subscriber.

mod diagnostic ;
mod references ;
mod compiler ;
mod manifest ;
mod store ;
mod dependency ;
mod context ;
mod entry_point ;
mod monitor ;
mod config ;
mod executor ;

pub use diagnostic::{ Diagnostic, Location, Severity, has_errors };
pub use references::{ ReferenceError, ReferenceSet, ReferenceToken };
pub use compiler::{ CompileError, CompiledModule, OptimizationLevel, ScriptCompiler };
pub use manifest::{ DependencyManifest, MANIFEST_FILE_NAME, ManifestError };
pub use context::{ Lifecycle, LoadError, LoadOutcome, LoadedModule, ObservationHandle, ScriptContext };
pub use entry_point::{ CapabilityContract, DEFAULT_ENTRY_FUNCTION, EntryPoint, EntryPointError, InvocationError, ScriptInstance };
pub use monitor::{ UnloadError, UnloadMonitor, UnloadOutcome };
pub use config::{ ConfigError, HostConfig };
pub use executor::{ ExecutorError, Run, RunReport, ScriptError, ScriptExecutor };
pub use tokio_util::sync::CancellationToken ;
