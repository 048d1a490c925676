//! Claim registry: at most one in-flight fetch per key.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use super::Outcome;
use crate::error::{FetchFailure, ResolveError};

// == Fetch Claim ==
/// One in-flight fetch: its key and the channel its outcome is published on.
#[derive(Debug)]
pub struct FetchClaim {
    key: String,
    outcome: watch::Sender<Option<Outcome>>,
}

impl FetchClaim {
    fn new(key: String) -> Self {
        let (outcome, _) = watch::channel(None);
        Self { key, outcome }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Registers a new waiter.
    pub fn subscribe(&self) -> ClaimWaiter {
        ClaimWaiter {
            rx: self.outcome.subscribe(),
        }
    }

    /// Publishes the outcome to every current and future waiter.
    fn publish(&self, outcome: Outcome) {
        // send_replace never fails, even with no receivers left
        self.outcome.send_replace(Some(outcome));
    }
}

// == Claim Waiter ==
/// Receiving end of a claim.
#[derive(Debug)]
pub struct ClaimWaiter {
    rx: watch::Receiver<Option<Outcome>>,
}

impl ClaimWaiter {
    /// Waits for the claim's outcome.
    ///
    /// A claim dropped without publishing (its fetch task died) reads as a
    /// transient failure with nothing to fall back to.
    pub async fn wait(mut self) -> Outcome {
        match self.rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone().unwrap_or(Err(ResolveError::NoDataAvailable {
                cause: FetchFailure::Transient,
            })),
            Err(_) => Err(ResolveError::NoDataAvailable {
                cause: FetchFailure::Transient,
            }),
        }
    }
}

// == Claim ==
/// Result of trying to claim a key.
#[derive(Debug)]
pub enum Claim {
    /// This caller owns the fetch.
    Leader(ClaimGuard),
    /// Another caller owns it; wait for its outcome.
    Joined(ClaimWaiter),
}

// == Claim Guard ==
/// Ownership of a claim. Dropping it releases the key.
#[derive(Debug)]
pub struct ClaimGuard {
    registry: ClaimRegistry,
    claim: Arc<FetchClaim>,
}

impl ClaimGuard {
    pub fn key(&self) -> &str {
        self.claim.key()
    }

    pub fn subscribe(&self) -> ClaimWaiter {
        self.claim.subscribe()
    }

    /// Publishes the outcome, then releases the key.
    pub fn complete(self, outcome: Outcome) {
        self.claim.publish(outcome);
    }
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        self.registry.release(&self.claim);
    }
}

// == Claim Registry ==
/// Map of keys to their in-flight claims.
///
/// Claiming is an insert-if-absent under a single mutex, so two callers can
/// never both become leader for the same key.
#[derive(Debug, Clone, Default)]
pub struct ClaimRegistry {
    inflight: Arc<Mutex<HashMap<String, Arc<FetchClaim>>>>,
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `key`, or joins the claim that already holds it.
    pub fn claim(&self, key: &str) -> Claim {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = inflight.get(key) {
            return Claim::Joined(existing.subscribe());
        }

        let claim = Arc::new(FetchClaim::new(key.to_string()));
        inflight.insert(key.to_string(), Arc::clone(&claim));
        Claim::Leader(ClaimGuard {
            registry: self.clone(),
            claim,
        })
    }

    /// Number of keys currently being fetched.
    pub fn inflight_count(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_inflight(&self, key: &str) -> bool {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    fn release(&self, claim: &Arc<FetchClaim>) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if inflight
            .get(claim.key())
            .is_some_and(|current| Arc::ptr_eq(current, claim))
        {
            inflight.remove(claim.key());
        }
    }
}
