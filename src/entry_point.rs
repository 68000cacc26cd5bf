//! Finding and invoking a script's entry point.
//!
//! A script implements a [`CapabilityContract`] by exporting an interface that contains a
//! function of that name taking one `string` and returning one `string`. The contract is
//! checked against the component's types, before anything is instantiated.

use std::sync::{ Arc, Mutex };
use std::time::Duration ;
use thiserror::Error ;
use tokio_util::sync::CancellationToken ;
use tracing::{ debug, warn };
use wasmtime::{ Engine, Store };
use wasmtime::component::{ Instance, Val };
use wasmtime::component::types::{ ComponentFunc, ComponentItem, Type };

use crate::context::{ ContextInner, LoadedModule };
use crate::store::StoreState ;



/// Name of the function the default contract looks for.
pub const DEFAULT_ENTRY_FUNCTION: &str = "execute" ;

// Interval at which a cancelled invocation is nudged until it yields.
const CANCEL_TICK: Duration = Duration::from_millis( 1 );

/// The shape of export a script must provide to be executed.
#[derive( Clone, Debug, PartialEq, Eq, Hash )]
pub struct CapabilityContract {
	function: String,
}

impl Default for CapabilityContract {
	fn default() -> Self { Self::new( DEFAULT_ENTRY_FUNCTION ) }
}

impl CapabilityContract {

	/// A contract requiring `function: func( string ) -> string` in some exported interface.
	pub fn new( function: impl Into<String> ) -> Self { Self { function: function.into() }}

	#[inline] pub fn function( &self ) -> &str { &self.function }

	fn is_satisfied_by( &self, engine: &Engine, item: &ComponentItem ) -> bool {
		let ComponentItem::ComponentInstance( instance ) = item else { return false };
		instance.exports( engine ).any(|( name, export )| name == self.function && match export {
			ComponentItem::ComponentFunc( func ) => is_string_to_string( &func ),
			_ => false,
		})
	}

}

fn is_string_to_string( func: &ComponentFunc ) -> bool {
	let params = func.params().map(|( _, ty )| ty ).collect::<Vec<_>>();
	let results = func.results().collect::<Vec<_>>();
	matches!( params.as_slice(), [ Type::String ]) && matches!( results.as_slice(), [ Type::String ])
}

#[derive( Debug, Error )]
pub enum EntryPointError {
	/// No exported interface has the contract's function.
	#[error( "No Implementation: no exported interface provides `{0}: func( string ) -> string`" )]
	NoImplementation( String ),
	/// More than one exported interface has it. Holds every candidate.
	#[error( "Ambiguous Implementation: provided by {}", .0.join( ", " ))]
	Ambiguous( Vec<String> ),
	/// The boundary was unloaded before resolution or instantiation.
	#[error( "Boundary Unloaded" )]
	Unloaded,
	/// Instantiating the script in a fresh store failed.
	#[error( "Failed To Instantiate: {0:#}" )]
	Instantiation( wasmtime::Error ),
}

#[derive( Debug, Error )]
pub enum InvocationError {

	/// The boundary was unloaded before the call started.
	#[error( "Boundary Unloaded" )] Unloaded,

	/// The instance's store lock was poisoned by an earlier panic.
	#[error( "Lock Rejected" )] LockRejected,

	/// The instance no longer exports the resolved interface.
	#[error( "Invalid Interface: {0}" )] InvalidInterface( String ),

	/// The interface doesn't export the function, or it isn't a function.
	#[error( "Invalid Function: {0}" )] InvalidFunction( String ),

	/// The script trapped or the call otherwise failed inside wasmtime.
	#[error( "Runtime Exception: {0:#}" )] Trap( wasmtime::Error ),

	/// The function returned something other than one string.
	#[error( "Unexpected Result: {0}" )] UnexpectedResult( String ),

	/// The cancellation token fired while the script was running.
	#[error( "Cancelled" )] Cancelled,

	/// The blocking task running the call panicked or was aborted.
	#[error( "Invocation Task Failed: {0}" )] Task( #[from] tokio::task::JoinError ),

}

impl LoadedModule {

	/// Resolves the default `execute` contract.
	///
	/// # Errors
	/// See [`LoadedModule::resolve_entry_point_with`].
	pub fn resolve_entry_point( &self ) -> Result<EntryPoint, EntryPointError> {
		self.resolve_entry_point_with( &CapabilityContract::default() )
	}

	/// Finds the single exported interface that satisfies `contract`.
	///
	/// # Errors
	/// [`EntryPointError::NoImplementation`] if no interface satisfies it,
	/// [`EntryPointError::Ambiguous`] if more than one does, and
	/// [`EntryPointError::Unloaded`] if the boundary was unloaded.
	pub fn resolve_entry_point_with( &self, contract: &CapabilityContract ) -> Result<EntryPoint, EntryPointError> {

		if !self.context.is_active() { return Err( EntryPointError::Unloaded ) }

		let engine = self.compiled().engine();
		let mut candidates = self.compiled().component().component_type()
			.exports( engine )
			.filter(|( _, item )| contract.is_satisfied_by( engine, item ))
			.map(|( name, _ )| name.to_string() )
			.collect::<Vec<_>>();

		match candidates.len() {
			0 => Err( EntryPointError::NoImplementation( contract.function.clone() )),
			1 => {
				let interface = candidates.remove( 0 );
				debug!( boundary = %self.context_id(), interface = %interface, function = %contract.function, "entry point resolved" );
				Ok( EntryPoint {
					context: Arc::clone( &self.context ),
					engine: engine.clone(),
					interface,
					function: contract.function.clone(),
				})
			}
			_ => Err( EntryPointError::Ambiguous( candidates )),
		}

	}

}

/// A resolved entry point. Keeps the boundary alive.
#[derive( Clone )]
pub struct EntryPoint {
	context: Arc<ContextInner>,
	engine: Engine,
	interface: String,
	function: String,
}

impl EntryPoint {

	/// Name of the exported interface that implements the contract.
	#[inline] pub fn interface( &self ) -> &str { &self.interface }
	#[inline] pub fn function( &self ) -> &str { &self.function }

	/// Creates a new instance of the script in a fresh store.
	///
	/// # Errors
	/// [`EntryPointError::Unloaded`] after unloading, [`EntryPointError::Instantiation`] if
	/// the script traps while starting.
	pub fn instantiate( &self ) -> Result<ScriptInstance, EntryPointError> {
		let ( store, instance ) = self.context.instantiate()
			.ok_or( EntryPointError::Unloaded )?
			.map_err( EntryPointError::Instantiation )?;
		Ok( ScriptInstance {
			context: Arc::clone( &self.context ),
			engine: self.engine.clone(),
			state: Arc::new( Mutex::new( InstanceState { store, instance })),
			interface: self.interface.clone(),
			function: self.function.clone(),
		})
	}

}

impl std::fmt::Debug for EntryPoint {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "EntryPoint" )
			.field( "context", &self.context.id() )
			.field( "interface", &self.interface )
			.field( "function", &self.function )
			.finish_non_exhaustive()
	}
}

struct InstanceState {
	store: Store<StoreState>,
	instance: Instance,
}

impl InstanceState {

	fn call(
		&mut self,
		interface: &str,
		function: &str,
		argument: String,
		cancellation: Option<CancellationToken>,
	) -> Result<String, InvocationError> {

		let interface_index = self.instance
			.get_export_index( &mut self.store, None, interface )
			.ok_or_else(|| InvocationError::InvalidInterface( interface.to_string() ))?;
		let func_index = self.instance
			.get_export_index( &mut self.store, Some( &interface_index ), function )
			.ok_or_else(|| InvocationError::InvalidFunction( format!( "{}#{}", interface, function )))?;
		let func = self.instance
			.get_func( &mut self.store, func_index )
			.ok_or_else(|| InvocationError::InvalidFunction( format!( "{}#{}", interface, function )))?;

		let mut results = [ Val::Bool( false )];
		self.store.data_mut().set_cancellation( cancellation );
		self.store.set_epoch_deadline( 1 );
		let call_result = func.call( &mut self.store, &[ Val::String( argument )], &mut results );
		self.store.data_mut().set_cancellation( None );
		call_result.map_err( InvocationError::Trap )?;
		func.post_return( &mut self.store ).map_err( InvocationError::Trap )?;

		let [ result ] = results ;
		match result {
			Val::String( value ) => Ok( value ),
			other => Err( InvocationError::UnexpectedResult( format!( "{:?}", other ))),
		}

	}

}

/// An instantiated script, ready to execute.
///
/// Calls are serialised; concurrent [`ScriptInstance::execute`] calls on the same instance
/// run one after another.
pub struct ScriptInstance {
	context: Arc<ContextInner>,
	engine: Engine,
	state: Arc<Mutex<InstanceState>>,
	interface: String,
	function: String,
}

impl ScriptInstance {

	#[inline] pub fn interface( &self ) -> &str { &self.interface }

	/// Invokes the entry point with `name` and returns its result.
	///
	/// The call runs on tokio's blocking pool and holds the boundary alive until it returns.
	/// Cancelling `cancellation` interrupts the script at its next epoch check, including
	/// while it is inside a dependency.
	///
	/// # Errors
	/// [`InvocationError::Cancelled`] if the call was interrupted, [`InvocationError::Trap`] if
	/// the script trapped, [`InvocationError::Unloaded`] if the boundary was unloaded first.
	pub async fn execute( &self, name: &str, cancellation: Option<&CancellationToken> ) -> Result<String, InvocationError> {

		if !self.context.is_active() { return Err( InvocationError::Unloaded ) }
		if cancellation.is_some_and( CancellationToken::is_cancelled ) { return Err( InvocationError::Cancelled ) }

		let context = Arc::clone( &self.context );
		let state = Arc::clone( &self.state );
		let interface = self.interface.clone();
		let function = self.function.clone();
		let argument = name.to_string();
		let token = cancellation.cloned();

		let mut call = tokio::task::spawn_blocking( move || {
			let _context = context ;
			let mut state = state.lock().map_err(|_| InvocationError::LockRejected )?;
			state.call( &interface, &function, argument, token )
		});

		let joined = match cancellation {
			None => ( &mut call ).await,
			Some( token ) => {
				let finished = tokio::select! {
					biased ;
					joined = &mut call => Some( joined ),
					() = token.cancelled() => None,
				};
				match finished {
					Some( joined ) => joined,
					None => self.interrupt( &mut call ).await,
				}
			}
		};

		match joined? {
			Err( InvocationError::Trap( _ )) if cancellation.is_some_and( CancellationToken::is_cancelled ) => {
				warn!( boundary = %self.context.id(), interface = %self.interface, "invocation cancelled" );
				Err( InvocationError::Cancelled )
			}
			result => result,
		}

	}

	// Advances the epoch until the running call notices its token and returns.
	async fn interrupt<T>( &self, call: &mut tokio::task::JoinHandle<T> ) -> Result<T, tokio::task::JoinError> {
		debug!( boundary = %self.context.id(), "interrupting invocation" );
		loop {
			self.engine.increment_epoch();
			tokio::select! {
				joined = &mut *call => return joined,
				() = tokio::time::sleep( CANCEL_TICK ) => {}
			}
		}
	}

}

impl std::fmt::Debug for ScriptInstance {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "ScriptInstance" )
			.field( "context", &self.context.id() )
			.field( "interface", &self.interface )
			.field( "function", &self.function )
			.field( "store", &"<Store>" )
			.finish_non_exhaustive()
	}
}
