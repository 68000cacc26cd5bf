//! Observing whether an unloaded boundary has actually been reclaimed.
//!
//! Dropping the last strong handle to a boundary releases its stores, instances and
//! dependencies. Handles can outlive [`ScriptContext::unload`](crate::ScriptContext::unload)
//! though: a module or instance kept by the caller, or an invocation still running on the
//! blocking pool. [`UnloadMonitor`] polls the weak [`ObservationHandle`] until it goes dead
//! or the attempts run out.

use std::time::Duration ;
use thiserror::Error ;
use tokio_util::sync::CancellationToken ;
use tracing::{ debug, info, warn };
use uuid::Uuid ;

use crate::context::ObservationHandle ;



pub const DEFAULT_MAX_ATTEMPTS: u32 = 10 ;
pub const DEFAULT_DELAY: Duration = Duration::from_millis( 100 );

/// Result of waiting for a boundary to be reclaimed.
#[must_use]
#[derive( Copy, Clone, Debug, PartialEq, Eq )]
pub enum UnloadOutcome {
	/// The boundary was reclaimed after this many polling attempts.
	Reclaimed { attempts: u32 },
	/// The boundary was still live after every attempt. Something is holding on to it.
	Exhausted { attempts: u32 },
}

impl UnloadOutcome {

	#[inline] pub fn is_reclaimed( &self ) -> bool { matches!( self, Self::Reclaimed { .. }) }

	#[inline] pub fn attempts( &self ) -> u32 {
		match self { Self::Reclaimed { attempts } | Self::Exhausted { attempts } => *attempts }
	}

	/// Treats an exhausted wait as an error.
	///
	/// # Errors
	/// Returns [`UnloadError::Timeout`] if the boundary was never reclaimed.
	pub fn into_result( self ) -> Result<u32, UnloadError> {
		match self {
			Self::Reclaimed { attempts } => Ok( attempts ),
			Self::Exhausted { attempts } => Err( UnloadError::Timeout { attempts }),
		}
	}

}

#[derive( Debug, Error, PartialEq, Eq )]
pub enum UnloadError {
	/// The caller's token fired before the boundary was reclaimed.
	#[error( "Unload Cancelled: boundary {id} still live after {attempts} attempts" )]
	Cancelled { id: Uuid, attempts: u32 },
	/// Every attempt ran and the boundary is still live.
	#[error( "Unload Timed Out: boundary still live after {attempts} attempts" )]
	Timeout { attempts: u32 },
}

/// Polls an [`ObservationHandle`] until the boundary behind it is gone.
#[derive( Copy, Clone, Debug, PartialEq, Eq )]
pub struct UnloadMonitor {
	max_attempts: u32,
	delay: Duration,
}

impl Default for UnloadMonitor {
	fn default() -> Self { Self::new( DEFAULT_MAX_ATTEMPTS, DEFAULT_DELAY ) }
}

impl UnloadMonitor {

	pub const fn new( max_attempts: u32, delay: Duration ) -> Self { Self { max_attempts, delay }}

	#[inline] pub fn max_attempts( &self ) -> u32 { self.max_attempts }
	#[inline] pub fn delay( &self ) -> Duration { self.delay }

	/// Waits for the boundary to be reclaimed.
	///
	/// Each attempt sleeps for the configured delay, gives pending work a chance to release
	/// its handles, then checks again. A handle that is already dead returns immediately
	/// with zero attempts.
	///
	/// # Errors
	/// Returns [`UnloadError::Cancelled`] if `cancellation` fires while waiting. Running out
	/// of attempts is not an error; it is reported as [`UnloadOutcome::Exhausted`].
	pub async fn wait_for_unload(
		&self,
		handle: &ObservationHandle,
		cancellation: Option<&CancellationToken>,
	) -> Result<UnloadOutcome, UnloadError> {

		let mut attempts = 0 ;

		while handle.is_live() && attempts < self.max_attempts {

			match cancellation {
				Some( token ) => tokio::select! {
					() = token.cancelled() => {
						warn!( boundary = %handle.id(), attempts, "unload wait cancelled" );
						return Err( UnloadError::Cancelled { id: handle.id(), attempts });
					}
					() = tokio::time::sleep( self.delay ) => {}
				},
				None => tokio::time::sleep( self.delay ).await,
			}

			reclamation_cycle().await ;
			attempts += 1 ;
			debug!( boundary = %handle.id(), attempts, live = handle.is_live(), "unload attempt" );

		}

		match handle.is_live() {
			false => {
				info!( boundary = %handle.id(), attempts, "boundary reclaimed" );
				Ok( UnloadOutcome::Reclaimed { attempts })
			}
			true => {
				warn!( boundary = %handle.id(), attempts, "boundary still live after unload" );
				Ok( UnloadOutcome::Exhausted { attempts })
			}
		}

	}

}

// Lets tasks that finished on the blocking pool deliver their results and drop their handles.
async fn reclamation_cycle() {
	tokio::task::yield_now().await ;
}

#[cfg( test )]
mod tests {
	use super::*;

	#[test]
	fn exhausted_outcome_is_a_timeout() {
		assert_eq!( UnloadOutcome::Reclaimed { attempts: 3 }.into_result(), Ok( 3 ));
		assert_eq!( UnloadOutcome::Exhausted { attempts: 10 }.into_result(), Err( UnloadError::Timeout { attempts: 10 }));
	}

	#[test]
	fn default_monitor() {
		let monitor = UnloadMonitor::default();
		assert_eq!( monitor.max_attempts(), 10 );
		assert_eq!( monitor.delay(), Duration::from_millis( 100 ));
	}
}
