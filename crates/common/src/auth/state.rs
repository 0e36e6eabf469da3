//! Observable holder for the process-wide [`AuthState`]
//!
//! Backed by a `tokio::sync::watch` channel: readers take cheap snapshots or
//! subscribe to transitions, and every write replaces the whole value in one
//! step so nobody can observe a token without its state tag.

use std::sync::Arc;
use std::time::Duration;

use starlight_domain::{AuthState, InvalidTransition};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Shared, subscribable [`AuthState`]. Clones observe the same state.
#[derive(Clone, Debug)]
pub struct AuthStateHolder {
    tx: Arc<watch::Sender<AuthState>>,
}

impl AuthStateHolder {
    pub fn new(initial: AuthState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Consistent copy of the current state.
    pub fn snapshot(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every transition. The current value counts as
    /// already seen.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.tx.subscribe()
    }

    /// Atomically move to `next` if the state machine allows it.
    ///
    /// # Errors
    /// Returns [`InvalidTransition`] and leaves the state untouched when the
    /// transition is not permitted from the current state.
    pub fn transition(&self, next: AuthState) -> Result<AuthState, InvalidTransition> {
        let mut outcome = None;
        self.tx.send_if_modified(|current| {
            if current.can_transition_to(&next) {
                let previous = std::mem::replace(current, next.clone());
                outcome = Some(Ok(previous));
                true
            } else {
                outcome = Some(Err(InvalidTransition { from: current.name(), to: next.name() }));
                false
            }
        });

        match outcome {
            Some(Ok(previous)) => {
                debug!(from = previous.name(), to = next.name(), "Auth state transition");
                Ok(previous)
            }
            Some(Err(err)) => {
                warn!(error = %err, "Rejected auth state transition");
                Err(err)
            }
            None => Err(InvalidTransition { from: "unknown", to: next.name() }),
        }
    }

    /// Unconditionally reset to `SignedOut`; returns the previous state.
    pub fn sign_out(&self) -> AuthState {
        let previous = self.tx.send_replace(AuthState::SignedOut);
        if previous != AuthState::SignedOut {
            debug!(from = previous.name(), to = "signed_out", "Auth state transition");
        }
        previous
    }

    /// Wait until the state is no longer `Refreshing`, up to `limit`.
    ///
    /// Returns the settled state, or `None` if the limit elapsed first.
    pub async fn wait_until_settled(&self, limit: Duration) -> Option<AuthState> {
        let mut rx = self.subscribe();
        let settled = tokio::time::timeout(limit, async {
            rx.wait_for(|state| !state.is_refreshing()).await.map(|state| (*state).clone())
        })
        .await;

        match settled {
            Ok(Ok(state)) => Some(state),
            // The sender lives as long as `self`, so a closed channel cannot
            // happen here; treat it like a timeout.
            Ok(Err(_)) | Err(_) => None,
        }
    }
}

impl Default for AuthStateHolder {
    fn default() -> Self {
        Self::new(AuthState::SignedOut)
    }
}
