//! Reconciles this process's own writes with the snapshots the store pushes back.
//!
//! Every outbound write is recorded before it is sent. When the store later
//! pushes a value, it is either one of our echoes (drain up to it) or a value
//! from another writer. While an echo is still outstanding, anything older than
//! it must not overwrite the local cache, otherwise a stale echo would roll the
//! board back between two quick commands.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use crate::{dao::board_store::Collection, state::board::CollectionSnapshot};

/// How long a committed write may go unechoed before foreign values win again.
pub const ECHO_GRACE: Duration = Duration::from_secs(2);
const MAX_PENDING: usize = 64;

/// Handle to one recorded outbound write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoTicket(u64);

/// What to do with an inbound snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// Replace the cached collection with the inbound value.
    Apply,
    /// A newer local write is still outstanding; keep the cache as is.
    Hold,
}

#[derive(Debug)]
struct PendingEcho {
    ticket: u64,
    snapshot: CollectionSnapshot,
    settled_at: Option<Instant>,
}

impl PendingEcho {
    fn collection(&self) -> Collection {
        self.snapshot.collection()
    }
}

/// Pending writes per collection, matched against store pushes.
#[derive(Debug)]
pub struct EchoTracker {
    next_ticket: u64,
    pending: VecDeque<PendingEcho>,
    grace: Duration,
}

impl Default for EchoTracker {
    fn default() -> Self {
        Self::new(ECHO_GRACE)
    }
}

impl EchoTracker {
    /// Tracker that lets settled echoes block foreign values for `grace`.
    pub fn new(grace: Duration) -> Self {
        Self {
            next_ticket: 0,
            pending: VecDeque::new(),
            grace,
        }
    }

    /// Record a write that is about to be sent.
    pub fn expect(&mut self, snapshot: CollectionSnapshot) -> EchoTicket {
        if self.pending.len() >= MAX_PENDING {
            self.pending.pop_front();
        }
        let ticket = self.next_ticket;
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.pending.push_back(PendingEcho {
            ticket,
            snapshot,
            settled_at: None,
        });
        EchoTicket(ticket)
    }

    /// Mark a write as committed by the store.
    ///
    /// Returns `true` when its echo has not been seen yet, in which case the
    /// caller's value is the newest known and should go into the cache.
    pub fn settle(&mut self, ticket: EchoTicket, now: Instant) -> bool {
        match self.pending.iter_mut().find(|entry| entry.ticket == ticket.0) {
            Some(entry) => {
                entry.settled_at = Some(now);
                true
            }
            None => false,
        }
    }

    /// Drop a write that failed; no echo will come for it.
    pub fn forget(&mut self, ticket: EchoTicket) {
        self.pending.retain(|entry| entry.ticket != ticket.0);
    }

    /// Drop every outstanding echo of `collection`, e.g. after resubscribing.
    pub fn reset(&mut self, collection: Collection) {
        self.pending.retain(|entry| entry.collection() != collection);
    }

    /// Writes still waiting for their echo.
    pub fn pending(&self, collection: Collection) -> usize {
        self.pending
            .iter()
            .filter(|entry| entry.collection() == collection)
            .count()
    }

    /// Decide whether an inbound snapshot may replace the cached collection.
    pub fn observe(&mut self, inbound: &CollectionSnapshot, now: Instant) -> Reconcile {
        let collection = inbound.collection();

        if let Some(position) = self
            .pending
            .iter()
            .position(|entry| entry.snapshot == *inbound)
        {
            let mut index = 0;
            self.pending.retain(|entry| {
                let keep = index > position || entry.collection() != collection;
                index += 1;
                keep
            });
            return self.apply_if_idle(collection);
        }

        if self.pending(collection) > 0 && self.all_expired(collection, now) {
            self.reset(collection);
        }
        self.apply_if_idle(collection)
    }

    fn apply_if_idle(&self, collection: Collection) -> Reconcile {
        if self.pending(collection) == 0 {
            Reconcile::Apply
        } else {
            Reconcile::Hold
        }
    }

    /// Committed writes whose echo never arrived (the store coalesced it away).
    fn all_expired(&self, collection: Collection, now: Instant) -> bool {
        self.pending
            .iter()
            .filter(|entry| entry.collection() == collection)
            .all(|entry| {
                entry
                    .settled_at
                    .is_some_and(|settled| now.saturating_duration_since(settled) >= self.grace)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::board::{WaitingQueue, WaitingQueues};

    fn queues(ids: &[u64]) -> CollectionSnapshot {
        CollectionSnapshot::WaitingQueues(WaitingQueues::new(vec![WaitingQueue::new(
            ids.to_vec(),
        )]))
    }

    #[test]
    fn foreign_values_apply_when_nothing_is_pending() {
        let mut tracker = EchoTracker::default();
        assert_eq!(tracker.observe(&queues(&[1]), Instant::now()), Reconcile::Apply);
    }

    #[test]
    fn stale_echo_is_held_until_the_latest_arrives() {
        let now = Instant::now();
        let mut tracker = EchoTracker::default();
        let first = tracker.expect(queues(&[1]));
        let second = tracker.expect(queues(&[1, 2]));
        assert!(tracker.settle(first, now));
        assert!(tracker.settle(second, now));

        assert_eq!(tracker.observe(&queues(&[1]), now), Reconcile::Hold);
        assert_eq!(tracker.observe(&queues(&[9]), now), Reconcile::Hold);
        assert_eq!(tracker.observe(&queues(&[1, 2]), now), Reconcile::Apply);
        assert_eq!(tracker.pending(Collection::WaitingQueues), 0);
    }

    #[test]
    fn settle_reports_whether_the_echo_is_still_outstanding() {
        let now = Instant::now();
        let mut tracker = EchoTracker::default();
        let ticket = tracker.expect(queues(&[1]));
        assert_eq!(tracker.observe(&queues(&[1]), now), Reconcile::Apply);
        assert!(!tracker.settle(ticket, now));
    }

    #[test]
    fn failed_writes_are_forgotten() {
        let mut tracker = EchoTracker::default();
        let ticket = tracker.expect(queues(&[1]));
        tracker.forget(ticket);
        assert_eq!(tracker.observe(&queues(&[2]), Instant::now()), Reconcile::Apply);
    }

    #[test]
    fn unechoed_writes_expire_after_the_grace_period() {
        let now = Instant::now();
        let mut tracker = EchoTracker::new(Duration::from_millis(10));
        let ticket = tracker.expect(queues(&[1]));
        tracker.settle(ticket, now);

        assert_eq!(tracker.observe(&queues(&[5]), now), Reconcile::Hold);
        let later = now + Duration::from_millis(10);
        assert_eq!(tracker.observe(&queues(&[5]), later), Reconcile::Apply);
    }

    #[test]
    fn collections_are_tracked_separately() {
        let mut tracker = EchoTracker::default();
        tracker.expect(CollectionSnapshot::Players(Vec::new()));
        assert_eq!(tracker.observe(&queues(&[3]), Instant::now()), Reconcile::Apply);
        assert_eq!(tracker.pending(Collection::Players), 1);
    }
}
