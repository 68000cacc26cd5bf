//! The compiler frontend.
//!
//! Scripts are WebAssembly components written in the text format. Compilation parses the
//! text, validates and compiles the component with wasmtime, and checks every import
//! against the registered references. Nothing is written to disk.

use std::path::PathBuf ;
use std::sync::{ Arc, Weak };
use itertools::Itertools ;
use serde::Deserialize ;
use thiserror::Error ;
use tracing::{ debug, info };
use uuid::Uuid ;
use wasmtime::{ Config, Engine, OptLevel };
use wasmtime::component::Component ;

use crate::diagnostic::{ Diagnostic, has_errors };
use crate::references::{ ReferenceError, ReferenceSet, ReferenceToken };



/// How aggressively the script is optimised by cranelift.
#[derive( Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize )]
#[serde( rename_all = "lowercase" )]
pub enum OptimizationLevel {
	/// No optimisation; fastest to compile.
	Debug,
	/// Optimise for speed.
	#[default] Release,
}

impl OptimizationLevel {

	/// Engine configuration used for every compile at this level.
	///
	/// Epoch interruption is always on so a running script can be cancelled.
	pub(crate) fn engine_config( self ) -> Config {
		let mut config = Config::new();
		config.cranelift_opt_level( match self {
			Self::Debug => OptLevel::None,
			Self::Release => OptLevel::Speed,
		});
		config.epoch_interruption( true );
		config
	}

}

/// A reference compiled alongside the script, together with the names it exports.
#[derive( Clone )]
pub(crate) struct ResolvedReference {
	token: ReferenceToken,
	component: Component,
	exports: Vec<String>,
}

impl ResolvedReference {

	fn new( engine: &Engine, token: ReferenceToken, component: Component ) -> Self {
		let exports = export_names( engine, &component );
		Self { token, component, exports }
	}

	#[inline] pub fn token( &self ) -> &ReferenceToken { &self.token }
	#[inline] pub fn component( &self ) -> &Component { &self.component }
	#[inline] pub fn exports( &self, name: &str ) -> bool { self.exports.iter().any(| export | export == name ) }

}

/// A successfully compiled script.
///
/// Each compile produces a fresh identity, so compiling the same source twice yields two
/// distinct modules that behave the same. The module carries the [`Engine`] it was
/// compiled on; everything later loaded for it lives on that engine.
///
/// Clones share the compiled code. A boundary counts as loaded while any clone of its
/// module is alive.
#[derive( Clone )]
pub struct CompiledModule {
	inner: Arc<CompiledInner>,
}

pub(crate) struct CompiledInner {
	id: Uuid,
	optimization_level: OptimizationLevel,
	engine: Engine,
	component: Component,
	binary: Box<[u8]>,
	references: Vec<ResolvedReference>,
	warnings: Vec<Diagnostic>,
}

impl CompiledModule {

	/// Unique identity of this compilation.
	#[inline] pub fn id( &self ) -> Uuid { self.inner.id }

	#[inline] pub fn optimization_level( &self ) -> OptimizationLevel { self.inner.optimization_level }

	/// The encoded component binary.
	#[inline] pub fn binary( &self ) -> &[u8] { &self.inner.binary }

	/// Warnings produced by a compile that otherwise succeeded.
	#[inline] pub fn warnings( &self ) -> &[Diagnostic] { &self.inner.warnings }

	/// Names of the interfaces the script imports.
	pub fn imports( &self ) -> Vec<String> { import_names( &self.inner.engine, &self.inner.component ) }

	#[inline] pub(crate) fn engine( &self ) -> &Engine { &self.inner.engine }
	#[inline] pub(crate) fn component( &self ) -> &Component { &self.inner.component }
	#[inline] pub(crate) fn references( &self ) -> &[ResolvedReference] { &self.inner.references }
	#[inline] pub(crate) fn downgrade( &self ) -> Weak<CompiledInner> { Arc::downgrade( &self.inner ) }

}

impl std::fmt::Debug for CompiledModule {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "CompiledModule" )
			.field( "id", &self.inner.id )
			.field( "optimization_level", &self.inner.optimization_level )
			.field( "component", &"<Component>" )
			.field( "binary_len", &self.inner.binary.len() )
			.field( "references", &self.inner.references.iter().map(| reference | reference.token.path() ).collect::<Vec<_>>() )
			.field( "warnings", &self.inner.warnings )
			.finish_non_exhaustive()
	}
}

/// A compile that produced no module. Holds every diagnostic, in the order produced.
#[derive( Debug, Error )]
#[error( "Compilation Failed: {}", .diagnostics.iter().join( "; " ))]
pub struct CompileError {
	diagnostics: Vec<Diagnostic>,
}

impl CompileError {

	fn single( diagnostic: Diagnostic ) -> Self { Self { diagnostics: vec![ diagnostic ] }}

	#[inline] pub fn diagnostics( &self ) -> &[Diagnostic] { &self.diagnostics }
	#[inline] pub fn into_diagnostics( self ) -> Vec<Diagnostic> { self.diagnostics }

}

/// Compiles script source against a set of references.
///
/// Reference mutation takes `&mut self`; share a compiler between threads only behind
/// external synchronisation, or give each caller its own.
#[derive( Debug, Clone )]
pub struct ScriptCompiler {
	references: ReferenceSet,
	warnings_as_errors: bool,
}

impl ScriptCompiler {

	/// Creates a compiler with no references. Bare reference names that don't exist as
	/// given are looked up in `runtime_library_dir`.
	pub fn new( runtime_library_dir: impl Into<PathBuf> ) -> Self {
		Self { references: ReferenceSet::new( runtime_library_dir ), warnings_as_errors: false }
	}

	/// Treat warnings as failures.
	pub fn with_warnings_as_errors( mut self, enabled: bool ) -> Self {
		self.warnings_as_errors = enabled ;
		self
	}

	/// Adds a reference, returning whether it resolved. Duplicates succeed.
	pub fn add_reference( &mut self, name: &str ) -> bool { self.references.add( name ) }

	/// Adds a reference, returning why it didn't resolve.
	///
	/// # Errors
	/// See [`ReferenceError`].
	pub fn try_add_reference( &mut self, name: &str ) -> Result<(), ReferenceError> { self.references.try_add( name ) }

	/// Adds every reference and returns the names that failed, in input order.
	pub fn add_references<I, S>( &mut self, names: I ) -> Vec<String>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		self.references.add_all( names )
	}

	#[inline] pub fn references( &self ) -> &ReferenceSet { &self.references }

	/// Compiles `source` into a [`CompiledModule`].
	///
	/// # Errors
	/// Returns every diagnostic if parsing, validation, reference loading or import
	/// checking produced an error (or, with warnings-as-errors, a warning).
	pub fn compile( &self, source: &str, optimization_level: OptimizationLevel ) -> Result<CompiledModule, CompileError> {

		let id = Uuid::new_v4();
		debug!( %id, ?optimization_level, references = self.references.len(), "compiling script" );

		let source = source.trim();
		if source.is_empty() {
			return Err( CompileError::single( Diagnostic::error( "script source is empty" )));
		}

		let engine = Engine::new( &optimization_level.engine_config() )
			.map_err(| err | CompileError::single( Diagnostic::error( format!( "failed to configure the compiler: {:#}", err ))))?;
		let binary = wat::parse_str( source )
			.map_err(| err | CompileError::single( Diagnostic::from_parse_error( &err )))?;
		let component = Component::from_binary( &engine, &binary )
			.map_err(| err | CompileError::single( Diagnostic::error( format!( "{:#}", err ))))?;

		let mut diagnostics = Vec::new();

		let references = self.references.iter()
			.filter_map(| token | match Component::from_file( &engine, token.path() ) {
				Ok( reference ) => Some( ResolvedReference::new( &engine, token.clone(), reference )),
				Err( err ) => {
					diagnostics.push( Diagnostic::error( format!(
						"reference `{}` could not be loaded: {:#}", token.path().display(), err )));
					None
				}
			})
			.collect::<Vec<_>>();

		let imports = import_names( &engine, &component );

		diagnostics.extend( imports.iter()
			.filter(| import | !references.iter().any(| reference | reference.exports( import )))
			.map(| import | Diagnostic::error( format!( "unresolved import `{}`: no reference exports it", import ))));

		diagnostics.extend( references.iter()
			.filter(| reference | !imports.iter().any(| import | reference.exports( import )))
			.map(| reference | Diagnostic::warning( format!(
				"reference `{}` is not used by the script", reference.token.path().display() ))));

		if has_errors( &diagnostics ) || ( self.warnings_as_errors && !diagnostics.is_empty() ) {
			info!( %id, diagnostics = diagnostics.len(), "script failed to compile" );
			return Err( CompileError { diagnostics });
		}

		info!( %id, warnings = diagnostics.len(), "script compiled" );
		Ok( CompiledModule { inner: Arc::new( CompiledInner {
			id,
			optimization_level,
			engine,
			component,
			binary: binary.into_boxed_slice(),
			references,
			warnings: diagnostics,
		})})

	}

}

pub(crate) fn import_names( engine: &Engine, component: &Component ) -> Vec<String> {
	component.component_type().imports( engine ).map(|( name, _ )| name.to_string() ).collect()
}

pub(crate) fn export_names( engine: &Engine, component: &Component ) -> Vec<String> {
	component.component_type().exports( engine ).map(|( name, _ )| name.to_string() ).collect()
}
