//! Dependency resolution for a loading boundary.
//!
//! Every import of a script names an interface. The component that provides it is found by
//! asking, in order:
//!
//! 1. the boundary's `deps.json` manifest,
//! 2. the references the script was compiled against.
//!
//! Resolved components are instantiated in their own store and linked into the importer by
//! forwarding each imported function to the dependency's export. Dependencies are resolved
//! the same way, recursively, and each is loaded at most once per boundary.

use std::collections::HashMap ;
use std::sync::{ Arc, Mutex };
use tokio_util::sync::CancellationToken ;
use tracing::debug ;
use wasmtime::{ Engine, Store };
use wasmtime::component::{ Component, Instance, Linker, Val };
use wasmtime::component::types::ComponentItem ;

use crate::compiler::{ ResolvedReference, export_names };
use crate::context::LoadError ;
use crate::manifest::DependencyManifest ;
use crate::store::{ StoreState, new_store };



/// A dependency loaded into a boundary. Shared by every importer linked against it.
pub(crate) struct DependencyInstance {
	name: String,
	store: Store<StoreState>,
	instance: Instance,
}

impl DependencyInstance {

	fn call(
		&mut self,
		function: &str,
		cancellation: Option<CancellationToken>,
		args: &[Val],
		results: &mut [Val],
	) -> wasmtime::Result<()> {

		let interface_index = self.instance
			.get_export_index( &mut self.store, None, &self.name )
			.ok_or_else(|| wasmtime::Error::msg( format!( "dependency does not export `{}`", self.name )))?;
		let func_index = self.instance
			.get_export_index( &mut self.store, Some( &interface_index ), function )
			.ok_or_else(|| wasmtime::Error::msg( format!( "`{}` does not export `{}`", self.name, function )))?;
		let func = self.instance
			.get_func( &mut self.store, func_index )
			.ok_or_else(|| wasmtime::Error::msg( format!( "`{}#{}` is not a function", self.name, function )))?;

		self.store.data_mut().set_cancellation( cancellation );
		self.store.set_epoch_deadline( 1 );
		let result = func.call( &mut self.store, args, results );
		self.store.data_mut().set_cancellation( None );
		result?;
		func.post_return( &mut self.store )

	}

}

impl std::fmt::Debug for DependencyInstance {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "DependencyInstance" )
			.field( "name", &self.name )
			.field( "store", &"<Store>" )
			.finish_non_exhaustive()
	}
}

enum Slot {
	Loading,
	Loaded( Arc<Mutex<DependencyInstance>> ),
}

/// Resolves and links the imports of one boundary.
pub(crate) struct DependencyResolver<'a> {
	engine: &'a Engine,
	manifest: &'a DependencyManifest,
	references: &'a [ResolvedReference],
	max_memory_bytes: Option<usize>,
	slots: HashMap<String, Slot>,
}

impl<'a> DependencyResolver<'a> {

	pub fn new(
		engine: &'a Engine,
		manifest: &'a DependencyManifest,
		references: &'a [ResolvedReference],
		max_memory_bytes: Option<usize>,
	) -> Self {
		Self { engine, manifest, references, max_memory_bytes, slots: HashMap::new() }
	}

	/// Defines every import of `component` in `linker`, loading providers as needed.
	pub fn link( &mut self, component: &Component, linker: &mut Linker<StoreState> ) -> Result<(), LoadError> {

		let engine = self.engine ;
		let component_type = component.component_type();

		for ( import, item ) in component_type.imports( engine ) {

			let ComponentItem::ComponentInstance( instance_type ) = item else {
				return Err( LoadError::UnsupportedImport( import.to_string() ));
			};

			let dependency = self.resolve( import )?;
			let mut linker_instance = linker.instance( import )
				.map_err(| err | LoadError::FailedToLink( import.to_string(), err ))?;

			for ( function, item ) in instance_type.exports( engine ) {

				let ComponentItem::ComponentFunc( _ ) = item else {
					return Err( LoadError::UnsupportedImport( format!( "{}#{}", import, function )));
				};

				let dependency = Arc::clone( &dependency );
				let function_name = function.to_string();
				linker_instance
					.func_new( function, move | ctx, _ty, args, results | {
						let cancellation = ctx.data().cancellation().cloned();
						let mut dependency = dependency.lock()
							.map_err(|_| wasmtime::Error::msg( "dependency lock poisoned" ))?;
						dependency.call( &function_name, cancellation, args, results )
					})
					.map_err(| err | LoadError::FailedToLink( format!( "{}#{}", import, function ), err ))?;

			}

		}

		Ok(())

	}

	fn resolve( &mut self, import: &str ) -> Result<Arc<Mutex<DependencyInstance>>, LoadError> {

		match self.slots.get( import ) {
			Some( Slot::Loaded( dependency )) => return Ok( Arc::clone( dependency )),
			Some( Slot::Loading ) => return Err( LoadError::DependencyCycle( import.to_string() )),
			None => {}
		}

		self.slots.insert( import.to_string(), Slot::Loading );

		let component = self.locate( import )?;
		if !export_names( self.engine, &component ).iter().any(| export | export == import ) {
			return Err( LoadError::MissingExport( import.to_string() ));
		}

		let mut linker = Linker::new( self.engine );
		self.link( &component, &mut linker )?;

		let mut store = new_store( self.engine, self.max_memory_bytes );
		let instance = linker.instantiate( &mut store, &component )
			.map_err(| err | LoadError::Instantiation( import.to_string(), err ))?;

		let dependency = Arc::new( Mutex::new( DependencyInstance { name: import.to_string(), store, instance }));
		self.slots.insert( import.to_string(), Slot::Loaded( Arc::clone( &dependency )));
		debug!( dependency = import, "dependency loaded" );
		Ok( dependency )

	}

	fn locate( &self, import: &str ) -> Result<Component, LoadError> {

		if let Some( path ) = self.manifest.resolve( import ) {
			debug!( dependency = import, path = %path.display(), "resolved from manifest" );
			return Component::from_file( self.engine, &path )
				.map_err(| err | LoadError::InvalidDependency( path, err ));
		}

		match self.references.iter().find(| reference | reference.exports( import )) {
			Some( reference ) => {
				debug!( dependency = import, path = %reference.token().path().display(), "resolved from references" );
				Ok( reference.component().clone() )
			}
			None => Err( LoadError::UnresolvedDependency( import.to_string() )),
		}

	}

	/// Every dependency loaded so far.
	pub fn into_dependencies( self ) -> Vec<Arc<Mutex<DependencyInstance>>> {
		self.slots.into_values()
			.filter_map(| slot | match slot {
				Slot::Loaded( dependency ) => Some( dependency ),
				Slot::Loading => None,
			})
			.collect()
	}

}
