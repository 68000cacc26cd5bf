//! Loading boundaries.
//!
//! A [`ScriptContext`] owns everything loaded for one script: the compiled module, the
//! linker carrying its imports, and every dependency instance. Nothing leaks between two
//! boundaries, even when they load the same dependency or compile the same source.
//!
//! The context is the only strong owner the host keeps. [`LoadedModule`], entry points and
//! script instances hold it alive too, so a boundary is reclaimed once all of them are gone.
//! [`ObservationHandle`] watches it without keeping it alive.

use std::path::{ Path, PathBuf };
use std::sync::{ Arc, Mutex, PoisonError, Weak };
use pipe_trait::Pipe ;
use thiserror::Error ;
use tracing::{ debug, info, warn };
use uuid::Uuid ;
use wasmtime::Store ;
use wasmtime::component::{ Instance, Linker };

use crate::compiler::{ CompiledInner, CompiledModule, OptimizationLevel, ScriptCompiler };
use crate::config::HostConfig ;
use crate::dependency::{ DependencyInstance, DependencyResolver };
use crate::diagnostic::Diagnostic ;
use crate::manifest::{ DependencyManifest, ManifestError };
use crate::store::{ StoreState, new_store };



#[derive( Debug, Error )]
pub enum LoadError {

	/// The boundary's base directory does not exist or is not a directory.
	#[error( "Base Directory Missing: {}", .0.display() )] BaseDirectoryMissing( PathBuf ),

	/// `deps.json` exists but could not be read or parsed.
	#[error( transparent )] Manifest( #[from] ManifestError ),

	/// Neither the manifest nor any reference provides the named import.
	#[error( "Unresolved Dependency: {0}" )] UnresolvedDependency( String ),

	/// Linking the named import led back to a dependency that was still being loaded.
	#[error( "Dependency Cycle: {0} depends on itself" )] DependencyCycle( String ),

	/// The manifest maps the import to a component that doesn't export it.
	#[error( "Missing Export: the component resolved for {0} does not export it" )] MissingExport( String ),

	/// The import is not an instance of functions, so it can't be forwarded.
	#[error( "Unsupported Import: {0}" )] UnsupportedImport( String ),

	/// The dependency at this path is not a valid component for the script's engine.
	#[error( "Invalid Dependency {}: {:#}", .0.display(), .1 )] InvalidDependency( PathBuf, wasmtime::Error ),

	/// The linker refused a function forwarded for the named import.
	#[error( "Failed To Link {0}: {1:#}" )] FailedToLink( String, wasmtime::Error ),

	/// The dependency providing the named import failed to instantiate.
	#[error( "Failed To Instantiate {0}: {1:#}" )] Instantiation( String, wasmtime::Error ),

}

/// Where a boundary is in its life.
#[derive( Copy, Clone, Debug, PartialEq, Eq, Hash )]
pub enum Lifecycle {
	/// Created, but nothing was loaded into it because compilation or linking failed.
	Created,
	/// A module is loaded and can be executed.
	Active,
	/// [`ScriptContext::unload`] was called. Waiting for the last handle to go.
	UnloadRequested,
}

struct Loaded {
	module: CompiledModule,
	linker: Linker<StoreState>,
	dependencies: Vec<Arc<Mutex<DependencyInstance>>>,
}

enum ContextState {
	Created,
	Active( Loaded ),
	UnloadRequested,
}

impl ContextState {
	fn lifecycle( &self ) -> Lifecycle {
		match self {
			Self::Created => Lifecycle::Created,
			Self::Active( _ ) => Lifecycle::Active,
			Self::UnloadRequested => Lifecycle::UnloadRequested,
		}
	}
}

type UnloadingCallback = Box<dyn FnOnce() + Send> ;

pub(crate) struct ContextInner {
	id: Uuid,
	base_dir: PathBuf,
	max_memory_bytes: Option<usize>,
	module: Weak<CompiledInner>,
	state: Mutex<ContextState>,
	on_unloading: Mutex<Option<UnloadingCallback>>,
}

impl ContextInner {

	#[inline] pub fn id( &self ) -> Uuid { self.id }

	fn lifecycle( &self ) -> Lifecycle {
		self.state.lock().unwrap_or_else( PoisonError::into_inner ).lifecycle()
	}

	pub fn is_active( &self ) -> bool { self.lifecycle() == Lifecycle::Active }

	/// Creates a fresh store and instantiates the loaded module in it.
	///
	/// Returns `None` once unloading has been requested.
	pub fn instantiate( &self ) -> Option<wasmtime::Result<( Store<StoreState>, Instance )>> {
		let state = self.state.lock().unwrap_or_else( PoisonError::into_inner );
		let ContextState::Active( loaded ) = &*state else { return None };
		let mut store = new_store( loaded.module.engine(), self.max_memory_bytes );
		Some( loaded.linker
			.instantiate( &mut store, loaded.module.component() )
			.map(| instance | ( store, instance )))
	}

	fn request_unload( &self ) {
		let previous = {
			let mut state = self.state.lock().unwrap_or_else( PoisonError::into_inner );
			std::mem::replace( &mut *state, ContextState::UnloadRequested )
		};
		if let ContextState::Active( loaded ) = &previous {
			debug!(
				boundary = %self.id,
				module = %loaded.module.id(),
				dependencies = loaded.dependencies.len(),
				"releasing loaded module",
			);
		}
		drop( previous );
		self.fire_unloading();
	}

	fn fire_unloading( &self ) {
		let callback = self.on_unloading.lock().unwrap_or_else( PoisonError::into_inner ).take();
		if let Some( callback ) = callback {
			debug!( boundary = %self.id, "unloading" );
			callback();
		}
	}

}

impl Drop for ContextInner {
	fn drop( &mut self ) {
		self.fire_unloading();
		debug!( boundary = %self.id, "boundary reclaimed" );
	}
}

/// Strong handle to a loading boundary.
pub struct ScriptContext {
	inner: Arc<ContextInner>,
}

/// What [`ScriptContext::load_and_compile`] produced.
///
/// The context is always returned, even when nothing could be loaded into it, so the caller
/// decides when to unload it.
#[derive( Debug )]
pub struct LoadOutcome {
	pub context: ScriptContext,
	/// The loaded module, if compilation and linking succeeded.
	pub module: Option<LoadedModule>,
	/// Every diagnostic, warnings included, in the order produced.
	pub diagnostics: Vec<Diagnostic>,
}

impl ScriptContext {

	/// Creates a boundary rooted at `base_dir`, compiles `source` into it and links its imports.
	///
	/// `base_dir` is also the runtime library directory for `additional_references`. References
	/// that don't resolve are reported as warnings and skipped. `on_unloading` runs once, when
	/// the boundary is unloaded or dropped, whichever comes first.
	///
	/// # Errors
	/// Only environmental failures are errors: a missing base directory or an unreadable
	/// manifest. Compilation and linking failures are reported as diagnostics with
	/// [`LoadOutcome::module`] left empty.
	pub fn load_and_compile<I, S>(
		base_dir: impl AsRef<Path>,
		source: &str,
		additional_references: I,
		on_unloading: impl FnOnce() + Send + 'static,
		optimization_level: OptimizationLevel,
	) -> Result<LoadOutcome, LoadError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let config = HostConfig::default().with_optimization_level( optimization_level );
		Self::load_and_compile_with( &config, base_dir, source, additional_references, on_unloading )
	}

	/// Like [`ScriptContext::load_and_compile`], with every setting taken from `config`.
	///
	/// # Errors
	/// See [`ScriptContext::load_and_compile`].
	pub fn load_and_compile_with<I, S>(
		config: &HostConfig,
		base_dir: impl AsRef<Path>,
		source: &str,
		additional_references: I,
		on_unloading: impl FnOnce() + Send + 'static,
	) -> Result<LoadOutcome, LoadError>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{

		let base_dir = base_dir.as_ref();
		if !base_dir.is_dir() { return Err( LoadError::BaseDirectoryMissing( base_dir.to_path_buf() )) }
		let base_dir = std::path::absolute( base_dir ).unwrap_or_else(|_| base_dir.to_path_buf() );
		let manifest = DependencyManifest::load( &base_dir )?;

		let id = Uuid::new_v4();
		debug!( boundary = %id, base_dir = %base_dir.display(), "creating boundary" );

		let mut compiler = ScriptCompiler::new( &base_dir ).with_warnings_as_errors( config.warnings_as_errors );
		let mut diagnostics = compiler.add_references( additional_references ).into_iter()
			.map(| name | Diagnostic::warning( format!( "reference `{}` could not be resolved", name )))
			.collect::<Vec<_>>();
		let rejected = config.warnings_as_errors && !diagnostics.is_empty();

		let loaded = match compiler.compile( source, config.optimization_level ) {
			Ok( module ) if rejected => {
				diagnostics.extend( module.warnings().iter().cloned() );
				info!( boundary = %id, warnings = diagnostics.len(), "script rejected: warnings are errors" );
				None
			}
			Err( err ) => {
				diagnostics.extend( err.into_diagnostics() );
				None
			}
			Ok( module ) => {
				diagnostics.extend( module.warnings().iter().cloned() );
				match link( module, &manifest, config.max_memory_bytes ) {
					Ok( loaded ) => Some( loaded ),
					Err( err ) => {
						warn!( boundary = %id, error = %err, "failed to link script" );
						diagnostics.push( Diagnostic::error( err.to_string() ));
						None
					}
				}
			}
		};

		let ( module, state ) = loaded.pipe(| loaded | match loaded {
			Some( loaded ) => ( Some( loaded.module.clone() ), ContextState::Active( loaded )),
			None => ( None, ContextState::Created ),
		});

		let inner = Arc::new( ContextInner {
			id,
			base_dir,
			max_memory_bytes: config.max_memory_bytes,
			module: module.as_ref().map_or_else( Weak::new, CompiledModule::downgrade ),
			state: Mutex::new( state ),
			on_unloading: Mutex::new( Some( Box::new( on_unloading ))),
		});

		info!( boundary = %id, loaded = module.is_some(), diagnostics = diagnostics.len(), "boundary created" );

		Ok( LoadOutcome {
			module: module.map(| module | LoadedModule { context: Arc::clone( &inner ), module }),
			context: ScriptContext { inner },
			diagnostics,
		})

	}

	#[inline] pub fn id( &self ) -> Uuid { self.inner.id }
	#[inline] pub fn base_dir( &self ) -> &Path { &self.inner.base_dir }
	#[inline] pub fn lifecycle( &self ) -> Lifecycle { self.inner.lifecycle() }

	/// A handle that observes this boundary without keeping it alive.
	pub fn observe( &self ) -> ObservationHandle {
		ObservationHandle {
			id: self.inner.id,
			inner: Arc::downgrade( &self.inner ),
			module: Weak::clone( &self.inner.module ),
		}
	}

	/// Requests unloading and gives up this handle.
	///
	/// The loaded module and its dependencies are released and the unloading callback runs.
	/// Modules, entry points and instances still held elsewhere fail with `Unloaded` from now
	/// on; the boundary itself is reclaimed when the last of them is dropped.
	pub fn unload( self ) -> ObservationHandle {
		info!( boundary = %self.inner.id, "unload requested" );
		let handle = self.observe();
		self.inner.request_unload();
		handle
	}

}

impl std::fmt::Debug for ScriptContext {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ScriptContext" )
			.field( "id", &self.inner.id )
			.field( "base_dir", &self.inner.base_dir )
			.field( "lifecycle", &self.inner.lifecycle() )
			.finish_non_exhaustive()
	}
}

fn link(
	module: CompiledModule,
	manifest: &DependencyManifest,
	max_memory_bytes: Option<usize>,
) -> Result<Loaded, LoadError> {
	let mut resolver = DependencyResolver::new( module.engine(), manifest, module.references(), max_memory_bytes );
	let mut linker = Linker::new( module.engine() );
	resolver.link( module.component(), &mut linker )?;
	let dependencies = resolver.into_dependencies();
	Ok( Loaded { module, linker, dependencies })
}

/// Weak handle used to tell whether a boundary has been reclaimed.
///
/// Watches the boundary and the module loaded into it, so a [`CompiledModule`] cloned out
/// of a [`LoadedModule`] keeps the boundary live.
#[derive( Clone, Debug )]
pub struct ObservationHandle {
	id: Uuid,
	inner: Weak<ContextInner>,
	module: Weak<CompiledInner>,
}

impl ObservationHandle {

	#[inline] pub fn id( &self ) -> Uuid { self.id }

	/// `true` while anything still holds the boundary or its compiled module.
	#[inline] pub fn is_live( &self ) -> bool { self.inner.strong_count() > 0 || self.module.strong_count() > 0 }

}

/// A compiled module loaded into a boundary. Keeps the boundary alive.
#[derive( Clone )]
pub struct LoadedModule {
	pub(crate) context: Arc<ContextInner>,
	module: CompiledModule,
}

impl LoadedModule {

	#[inline] pub fn id( &self ) -> Uuid { self.module.id() }
	#[inline] pub fn context_id( &self ) -> Uuid { self.context.id }
	#[inline] pub fn compiled( &self ) -> &CompiledModule { &self.module }

}

impl std::fmt::Debug for LoadedModule {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "LoadedModule" )
			.field( "context", &self.context.id )
			.field( "module", &self.module )
			.finish()
	}
}
