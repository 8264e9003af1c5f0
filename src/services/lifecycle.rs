//! Shutdown and output pacing shared by the record loops.
//!
//! Every await that may block on a transport is raced against the shutdown
//! future, so a stalled peer never keeps a loop alive after termination was
//! requested. Output written by a loop is pushed downstream once the input
//! has been quiet for [`IDLE_FLUSH`].

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::domain::error::TransportError;
use crate::domain::ports::Inbound;

/// Quiet period on the input after which buffered output is flushed
pub const IDLE_FLUSH: Duration = Duration::from_millis(50);

/// Bound on the final flush of a loop that was told to terminate
pub const INTERRUPTED_FLUSH_LIMIT: Duration = Duration::from_secs(1);

/// What woke a record loop up
#[derive(Debug)]
pub enum Wake {
    /// Termination was requested
    Shutdown,
    /// The source produced a message or an error
    Inbound(Result<Inbound, TransportError>),
    /// The input stayed quiet with output still buffered
    Idle,
}

/// Await `op` unless `shutdown` resolves first
///
/// Returns `None` when termination won. `op` is dropped in that case, so it
/// must be cancel-safe for the caller's purposes.
pub async fn until_shutdown<T, F>(op: impl Future<Output = T>, shutdown: Pin<&mut F>) -> Option<T>
where
    F: Future<Output = ()> + ?Sized,
{
    tokio::select! {
        biased;
        () = shutdown => None,
        out = op => Some(out),
    }
}

/// Flush at most for [`INTERRUPTED_FLUSH_LIMIT`] when `interrupted` is set
pub async fn final_flush(
    flush: impl Future<Output = Result<(), TransportError>>,
    interrupted: bool,
) -> Result<(), TransportError> {
    if interrupted {
        tokio::time::timeout(INTERRUPTED_FLUSH_LIMIT, flush)
            .await
            .map_err(|_| TransportError::Timeout)?
    } else {
        flush.await
    }
}
