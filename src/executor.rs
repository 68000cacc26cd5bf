//! Host-side facade: load, execute, unload and confirm the teardown in one call.

use std::future::Future ;
use std::path::Path ;
use thiserror::Error ;
use tokio_util::sync::CancellationToken ;
use tracing::{ info, warn };

use crate::config::HostConfig ;
use crate::context::{ LoadError, LoadOutcome, LoadedModule, ObservationHandle, ScriptContext };
use crate::diagnostic::Diagnostic ;
use crate::entry_point::{ EntryPointError, InvocationError };
use crate::monitor::{ UnloadError, UnloadOutcome };



/// Anything that can go wrong between a loaded module and the value its entry point returns.
#[derive( Debug, Error )]
pub enum ScriptError {
	/// No single entry point, or it could not be instantiated.
	#[error( transparent )] EntryPoint( #[from] EntryPointError ),
	/// The entry point ran and failed.
	#[error( transparent )] Invocation( #[from] InvocationError ),
}

#[derive( Debug, Error )]
pub enum ExecutorError {
	/// The boundary could not be created.
	#[error( transparent )] Load( #[from] LoadError ),
	/// Waiting for the boundary to be reclaimed was cancelled.
	#[error( transparent )] Unload( #[from] UnloadError ),
}

/// A script that was loaded, handed to the caller and unloaded again.
#[derive( Debug )]
pub struct Run<T> {
	/// Observes the boundary, which has already been asked to unload.
	pub handle: ObservationHandle,
	/// What the callback returned, or the diagnostics that kept the module from loading.
	/// Those are the errors, or every warning when warnings were treated as errors.
	pub result: Result<T, Vec<Diagnostic>>,
	/// Every diagnostic from loading, warnings included.
	pub diagnostics: Vec<Diagnostic>,
}

/// A [`Run`] whose teardown has been waited for.
#[derive( Debug )]
pub struct RunReport<T> {
	pub result: Result<T, Vec<Diagnostic>>,
	pub diagnostics: Vec<Diagnostic>,
	pub unload: UnloadOutcome,
}

#[derive( Debug, Clone, Default )]
pub struct ScriptExecutor {
	config: HostConfig,
}

impl ScriptExecutor {

	pub fn new( config: HostConfig ) -> Self { Self { config }}

	#[inline] pub fn config( &self ) -> &HostConfig { &self.config }

	/// Loads `source` into a fresh boundary rooted at `base_dir`.
	///
	/// # Errors
	/// See [`ScriptContext::load_and_compile`].
	pub fn load<I, S>( &self, base_dir: impl AsRef<Path>, source: &str, references: I ) -> Result<LoadOutcome, LoadError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		ScriptContext::load_and_compile_with( &self.config, base_dir, source, references, || {} )
	}

	/// Loads `source`, passes the module to `execute`, then unloads the boundary.
	///
	/// The boundary is unloaded whether or not the module loaded and whatever `execute`
	/// returned. If the module didn't load, `execute` isn't called and the diagnostics are
	/// logged and returned.
	///
	/// # Errors
	/// See [`ScriptContext::load_and_compile`].
	pub async fn run<I, S, F, Fut, T>(
		&self,
		base_dir: impl AsRef<Path>,
		source: &str,
		references: I,
		execute: F,
	) -> Result<Run<T>, LoadError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
		F: FnOnce( LoadedModule ) -> Fut,
		Fut: Future<Output = T>,
	{

		let LoadOutcome { context, module, diagnostics } = self.load( base_dir, source, references )?;

		let result = match module {
			Some( module ) => Ok( execute( module ).await ),
			None => {
				diagnostics.iter().for_each(| diagnostic | warn!( boundary = %context.id(), "{}", diagnostic ));
				let errors = diagnostics.iter().filter(| diagnostic | diagnostic.is_error() ).cloned().collect::<Vec<_>>();
				Err( match errors.is_empty() {
					true => diagnostics.clone(),
					false => errors,
				})
			}
		};

		Ok( Run { handle: context.unload(), result, diagnostics })

	}

	/// Like [`ScriptExecutor::run`], then waits for the boundary to be reclaimed.
	///
	/// # Errors
	/// Loading errors as [`ScriptExecutor::run`], and [`UnloadError::Cancelled`] if
	/// `cancellation` fires while waiting.
	pub async fn run_and_unload<I, S, F, Fut, T>(
		&self,
		base_dir: impl AsRef<Path>,
		source: &str,
		references: I,
		cancellation: Option<&CancellationToken>,
		execute: F,
	) -> Result<RunReport<T>, ExecutorError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
		F: FnOnce( LoadedModule ) -> Fut,
		Fut: Future<Output = T>,
	{
		let Run { handle, result, diagnostics } = self.run( base_dir, source, references, execute ).await?;
		let unload = self.config.monitor().wait_for_unload( &handle, cancellation ).await?;
		info!( boundary = %handle.id(), reclaimed = unload.is_reclaimed(), attempts = unload.attempts(), "run finished" );
		Ok( RunReport { result, diagnostics, unload })
	}

	/// Loads `source`, invokes its `execute` entry point with `name`, unloads and waits.
	///
	/// # Errors
	/// See [`ScriptExecutor::run_and_unload`]. Failures of the script itself are reported
	/// in [`RunReport::result`].
	pub async fn execute_entry_point<I, S>(
		&self,
		base_dir: impl AsRef<Path>,
		source: &str,
		references: I,
		name: &str,
		cancellation: Option<&CancellationToken>,
	) -> Result<RunReport<Result<String, ScriptError>>, ExecutorError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let name = name.to_string();
		let token = cancellation.cloned();
		self.run_and_unload( base_dir, source, references, cancellation, | module | invoke( module, name, token )).await
	}

}

async fn invoke( module: LoadedModule, name: String, cancellation: Option<CancellationToken> ) -> Result<String, ScriptError> {
	let instance = module.resolve_entry_point()?.instantiate()?;
	Ok( instance.execute( &name, cancellation.as_ref() ).await? )
}
