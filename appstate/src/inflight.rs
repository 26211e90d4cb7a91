//! Single-flight coordination per image fingerprint.
//!
//! The first caller for an uncached fingerprint becomes its leader and holds
//! a [`LeaderTicket`]; callers arriving while the ticket is live get a
//! [`Subscription`] to the same outcome instead of running the detector.
//!
//! The map lock is held only to look up, insert or remove a ticket. Nothing
//! awaits or runs the detector while holding it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;

use common::{FeatureResult, ImageFingerprint, ProcessError, ProcessResult};

/// What every waiter of one computation receives.
pub type SharedOutcome = ProcessResult<Arc<FeatureResult>>;

type Slot = Option<SharedOutcome>;

struct Ticket {
    id: u64,
    outcome: watch::Receiver<Slot>,
}

type TicketMap = Mutex<HashMap<ImageFingerprint, Ticket>>;

#[derive(Default)]
pub struct InFlightCoordinator {
    tickets: Arc<TicketMap>,
    next_id: AtomicU64,
}

pub enum Claim {
    Leader(LeaderTicket),
    Follower(Subscription),
}

impl InFlightCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically join the live computation for `fingerprint` or start one.
    pub fn claim(&self, fingerprint: &ImageFingerprint) -> Claim {
        let mut tickets = self.tickets.lock();

        if let Some(ticket) = tickets.get(fingerprint) {
            return Claim::Follower(Subscription {
                outcome: ticket.outcome.clone(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = watch::channel(None);
        tickets.insert(
            fingerprint.clone(),
            Ticket {
                id,
                outcome: receiver,
            },
        );

        Claim::Leader(LeaderTicket {
            fingerprint: fingerprint.clone(),
            id,
            sender,
            tickets: Arc::clone(&self.tickets),
            resolved: false,
        })
    }

    /// Number of fingerprints currently being computed
    pub fn in_flight(&self) -> usize {
        self.tickets.lock().len()
    }
}

/// Exclusive right to compute one fingerprint.
///
/// Dropping an unresolved ticket removes it and closes the channel, so
/// followers fail instead of waiting forever.
pub struct LeaderTicket {
    fingerprint: ImageFingerprint,
    id: u64,
    sender: watch::Sender<Slot>,
    tickets: Arc<TicketMap>,
    resolved: bool,
}

impl LeaderTicket {
    pub fn fingerprint(&self) -> &ImageFingerprint {
        &self.fingerprint
    }

    /// Publish the outcome to every follower, then retire the ticket.
    ///
    /// Callers store a successful result in the cache before resolving, so a
    /// request arriving after removal finds it there.
    pub fn resolve(mut self, outcome: SharedOutcome) {
        self.sender.send_replace(Some(outcome));
        self.retire();
        self.resolved = true;
    }

    fn retire(&self) {
        let mut tickets = self.tickets.lock();
        if tickets.get(&self.fingerprint).is_some_and(|t| t.id == self.id) {
            tickets.remove(&self.fingerprint);
        }
    }
}

impl Drop for LeaderTicket {
    fn drop(&mut self) {
        if !self.resolved {
            tracing::warn!(fingerprint = %self.fingerprint, "In-flight computation abandoned");
            self.retire();
        }
    }
}

/// A follower's view of someone else's computation.
///
/// Dropping it (e.g. on client disconnect) unsubscribes without affecting
/// the leader or other followers.
pub struct Subscription {
    outcome: watch::Receiver<Slot>,
}

impl Subscription {
    pub async fn wait(mut self, timeout: Duration) -> SharedOutcome {
        let waited = tokio::time::timeout(timeout, self.outcome.wait_for(Option::is_some)).await;

        match waited {
            Ok(Ok(slot)) => match slot.as_ref() {
                Some(outcome) => outcome.clone(),
                None => Err(abandoned()),
            },
            Ok(Err(_closed)) => Err(abandoned()),
            Err(_elapsed) => Err(ProcessError::Timeout),
        }
    }
}

fn abandoned() -> ProcessError {
    ProcessError::DetectionFailure("in-flight computation was abandoned".to_string())
}
