use tokio_util::sync::CancellationToken ;
use wasmtime::{ Engine, Store, StoreLimits, StoreLimitsBuilder, UpdateDeadline };



/// Data kept in every wasmtime [`Store`] a boundary creates.
pub(crate) struct StoreState {
	limits: StoreLimits,
	cancellation: Option<CancellationToken>,
}

impl StoreState {

	fn new( max_memory_bytes: Option<usize> ) -> Self {
		let limits = match max_memory_bytes {
			Some( bytes ) => StoreLimitsBuilder::new().memory_size( bytes ).build(),
			None => StoreLimitsBuilder::new().build(),
		};
		Self { limits, cancellation: None }
	}

	#[inline] pub fn cancellation( &self ) -> Option<&CancellationToken> { self.cancellation.as_ref() }

	#[inline] pub fn set_cancellation( &mut self, cancellation: Option<CancellationToken> ) {
		self.cancellation = cancellation ;
	}

	fn is_cancelled( &self ) -> bool {
		self.cancellation.as_ref().is_some_and( CancellationToken::is_cancelled )
	}

}

/// Creates a store with the boundary's memory limit and the cancellation check installed.
///
/// Every epoch tick re-arms the deadline unless the store's current cancellation token has
/// fired, in which case the running call traps.
pub(crate) fn new_store( engine: &Engine, max_memory_bytes: Option<usize> ) -> Store<StoreState> {
	let mut store = Store::new( engine, StoreState::new( max_memory_bytes ));
	store.limiter(| state | &mut state.limits );
	store.epoch_deadline_callback(| ctx | match ctx.data().is_cancelled() {
		true => Err( wasmtime::Error::msg( "invocation cancelled" )),
		false => Ok( UpdateDeadline::Continue( 1 )),
	});
	store.set_epoch_deadline( 1 );
	store
}
