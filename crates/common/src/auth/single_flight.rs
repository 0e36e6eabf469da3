//! At-most-one concurrent execution of an async operation
//!
//! Used for token refresh: the first caller spawns the work, everyone who
//! arrives while it is running awaits the same shared result, and the slot
//! is cleared once the result is in so the next call starts fresh. The work
//! runs as its own task, so it completes even if every caller gives up.

use std::future::Future;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use starlight_domain::{AuthStage, FetchError};
use thiserror::Error;
use tracing::{debug, warn};

type InFlight<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

/// The spawned operation panicked or was cancelled by runtime shutdown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("in-flight operation aborted: {0}")]
pub struct FlightAborted(pub String);

impl From<FlightAborted> for String {
    fn from(err: FlightAborted) -> Self {
        err.to_string()
    }
}

impl From<FlightAborted> for FetchError {
    fn from(err: FlightAborted) -> Self {
        Self::auth(AuthStage::Session, err.to_string())
    }
}

/// Mutex-guarded slot holding the in-flight operation, if any.
pub struct SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<FlightAborted> + 'static,
{
    slot: Mutex<Option<InFlight<T, E>>>,
}

impl<T, E> SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<FlightAborted> + 'static,
{
    pub fn new() -> Self {
        Self { slot: Mutex::new(None) }
    }

    /// Whether an operation is currently running.
    pub fn in_flight(&self) -> bool {
        self.slot.lock().as_ref().is_some_and(|fut| fut.peek().is_none())
    }

    /// Run `start()` unless an operation is already running, in which case
    /// join it. `start` is only invoked by the caller that wins the slot.
    ///
    /// Must be called within a Tokio runtime.
    pub async fn run<F, Fut>(&self, start: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let shared = {
            let mut slot = self.slot.lock();
            match slot.as_ref() {
                Some(existing) if existing.peek().is_none() => {
                    debug!("Joining in-flight operation");
                    existing.clone()
                }
                _ => {
                    let handle = tokio::spawn(start());
                    let fresh = async move {
                        match handle.await {
                            Ok(result) => result,
                            Err(e) => {
                                warn!(error = %e, "In-flight operation aborted");
                                Err(E::from(FlightAborted(e.to_string())))
                            }
                        }
                    }
                    .boxed()
                    .shared();
                    *slot = Some(fresh.clone());
                    fresh
                }
            }
        };

        let result = shared.await;

        let mut slot = self.slot.lock();
        if slot.as_ref().is_some_and(|fut| fut.peek().is_some()) {
            *slot = None;
        }
        result
    }
}

impl<T, E> Default for SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<FlightAborted> + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> std::fmt::Debug for SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<FlightAborted> + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight").field("in_flight", &self.in_flight()).finish()
    }
}
