use boxoffice_core::Clock;
use boxoffice_shared::{HoldId, SeatHold};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

type ExpiryKey = (DateTime<Utc>, u64, HoldId);

/// Both indexes live behind the same mutex so a hold is always present in
/// both or in neither.
#[derive(Debug, Default)]
struct HoldIndex {
    by_id: HashMap<HoldId, SeatHold>,
    by_expiry: BTreeMap<ExpiryKey, HoldId>,
}

impl HoldIndex {
    fn insert(&mut self, hold: SeatHold) -> bool {
        if self.by_id.contains_key(&hold.id) {
            return false;
        }
        self.by_expiry.insert(hold.expiry_key(), hold.id);
        self.by_id.insert(hold.id, hold);
        true
    }

    fn remove(&mut self, hold_id: HoldId) -> Option<SeatHold> {
        let hold = self.by_id.remove(&hold_id)?;
        self.by_expiry.remove(&hold.expiry_key());
        Some(hold)
    }

    /// Takes the earliest-expiring hold out if it is already stale.
    fn pop_due(&mut self, now: DateTime<Utc>) -> Option<SeatHold> {
        let (&(expires_at, _, _), &hold_id) = self.by_expiry.first_key_value()?;
        if now <= expires_at {
            return None;
        }
        self.remove(hold_id)
    }

    fn clear(&mut self) {
        self.by_id.clear();
        self.by_expiry.clear();
    }
}

/// Active seat holds, indexed by id and by expiry time.
///
/// `get` is O(1); finding the next hold to expire is O(log n). Staleness is
/// judged by the caller: `get` hands back a hold even if it is past due and the
/// sweeper has not reached it yet.
pub struct HoldCache {
    clock: Arc<dyn Clock>,
    index: Mutex<HoldIndex>,
    halt_tx: watch::Sender<bool>,
}

impl HoldCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let (halt_tx, _) = watch::channel(false);
        Self {
            clock,
            index: Mutex::new(HoldIndex::default()),
            halt_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HoldIndex> {
        self.index.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a hold. A hold whose id is already cached is ignored and
    /// `false` is returned.
    pub fn add(&self, hold: SeatHold) -> bool {
        self.lock().insert(hold)
    }

    pub fn remove(&self, hold_id: HoldId) -> Option<SeatHold> {
        self.lock().remove(hold_id)
    }

    pub fn get(&self, hold_id: HoldId) -> Option<SeatHold> {
        self.lock().by_id.get(&hold_id).cloned()
    }

    pub fn contains(&self, hold_id: HoldId) -> bool {
        self.lock().by_id.contains_key(&hold_id)
    }

    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expiry timestamp of the hold that will go stale first
    pub fn next_expiry(&self) -> Option<DateTime<Utc>> {
        self.lock().by_expiry.keys().next().map(|&(expires_at, _, _)| expires_at)
    }

    /// Evicts every hold whose expiry has passed, soonest first, handing each
    /// to `release`. A failing release is logged and the sweep moves on.
    ///
    /// The index lock is dropped before `release` runs, so `release` may take
    /// other locks as long as callers never hold them while waiting on this
    /// cache's lock.
    pub fn expire_due<F, E>(&self, mut release: F) -> usize
    where
        F: FnMut(&SeatHold) -> Result<(), E>,
        E: fmt::Display,
    {
        let mut evicted = 0;
        loop {
            let now = self.clock.now();
            let due = self.lock().pop_due(now);
            let Some(hold) = due else {
                break;
            };

            evicted += 1;
            if let Err(err) = release(&hold) {
                tracing::warn!("Failed to release seats of expired hold {}: {}", hold.id, err);
            }
        }
        evicted
    }

    /// Drops every hold and tells the sweeper to stop. Safe to call twice.
    pub fn halt(&self) {
        self.lock().clear();
        if !self.halt_tx.send_replace(true) {
            tracing::info!("Hold cache halted");
        }
    }

    pub fn is_halted(&self) -> bool {
        *self.halt_tx.borrow()
    }

    /// Receiver that flips to `true` once `halt` has been called
    pub fn subscribe_halt(&self) -> watch::Receiver<bool> {
        self.halt_tx.subscribe()
    }
}

impl fmt::Debug for HoldCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HoldCache")
            .field("clock", &self.clock)
            .field("holds", &self.len())
            .field("halted", &self.is_halted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxoffice_core::ManualClock;
    use boxoffice_shared::SeatCoord;
    use chrono::Duration;

    fn hold(id: HoldId, sequence: u64, created_at: DateTime<Utc>, ttl_secs: i64) -> SeatHold {
        SeatHold {
            id,
            customer_id: "fan@example.com".to_string(),
            level_id: 1,
            created_at,
            expires_at: created_at + Duration::seconds(ttl_secs),
            sequence,
            seats: vec![SeatCoord::new(1, 0, id as usize)],
        }
    }

    fn setup() -> (Arc<ManualClock>, HoldCache) {
        let clock = Arc::new(ManualClock::default());
        let cache = HoldCache::new(clock.clone());
        (clock, cache)
    }

    #[test]
    fn test_add_get_remove() {
        let (clock, cache) = setup();
        let now = clock.now();

        assert!(cache.add(hold(1, 1, now, 120)));
        assert_eq!(cache.get(1).unwrap().id, 1);
        assert!(cache.contains(1));

        // Duplicate id is ignored, the first one stays
        assert!(!cache.add(hold(1, 2, now, 5)));
        assert_eq!(cache.get(1).unwrap().sequence, 1);
        assert_eq!(cache.len(), 1);

        assert!(cache.remove(1).is_some());
        assert!(cache.remove(1).is_none());
        assert!(cache.get(1).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.next_expiry(), None);
    }

    #[test]
    fn test_get_does_not_judge_staleness() {
        let (clock, cache) = setup();
        cache.add(hold(1, 1, clock.now(), 10));
        clock.advance(Duration::seconds(60));

        assert!(cache.get(1).is_some());
    }

    #[test]
    fn test_expire_due_evicts_only_stale_holds_in_order() {
        let (clock, cache) = setup();
        let now = clock.now();
        cache.add(hold(3, 3, now, 30));
        cache.add(hold(1, 1, now, 10));
        cache.add(hold(2, 2, now, 20));
        assert_eq!(cache.next_expiry(), Some(now + Duration::seconds(10)));

        // Exactly at the expiry instant nothing is due yet
        clock.advance(Duration::seconds(10));
        assert_eq!(cache.expire_due(|_| Ok::<(), String>(())), 0);

        clock.advance(Duration::seconds(11));
        let mut released = Vec::new();
        let evicted = cache.expire_due(|h| {
            released.push(h.id);
            Ok::<(), String>(())
        });

        assert_eq!(evicted, 2);
        assert_eq!(released, vec![1, 2]);
        assert!(cache.contains(3));
        assert!(!cache.contains(1));
    }

    #[test]
    fn test_equal_expiry_breaks_ties_by_sequence() {
        let (clock, cache) = setup();
        let now = clock.now();
        cache.add(hold(10, 7, now, 5));
        cache.add(hold(20, 2, now, 5));
        cache.add(hold(30, 4, now, 5));

        clock.advance(Duration::seconds(6));
        let mut released = Vec::new();
        cache.expire_due(|h| {
            released.push(h.id);
            Ok::<(), String>(())
        });

        assert_eq!(released, vec![20, 30, 10]);
    }

    #[test]
    fn test_holds_sharing_expiry_and_sequence_both_expire() {
        let (clock, cache) = setup();
        let now = clock.now();
        assert!(cache.add(hold(1, 7, now, 5)));
        assert!(cache.add(hold(2, 7, now, 5)));
        assert_eq!(cache.len(), 2);

        assert!(cache.remove(2).is_some());
        assert_eq!(cache.next_expiry(), Some(now + Duration::seconds(5)));

        cache.add(hold(2, 7, now, 5));
        clock.advance(Duration::seconds(6));
        let mut released = Vec::new();
        let evicted = cache.expire_due(|h| {
            released.push(h.id);
            Ok::<(), String>(())
        });

        assert_eq!(evicted, 2);
        assert_eq!(released, vec![1, 2]);
        assert!(cache.is_empty());
        assert_eq!(cache.next_expiry(), None);
    }

    #[test]
    fn test_release_failure_does_not_stop_sweep() {
        let (clock, cache) = setup();
        let now = clock.now();
        cache.add(hold(1, 1, now, 1));
        cache.add(hold(2, 2, now, 1));
        cache.add(hold(3, 3, now, 1));

        clock.advance(Duration::seconds(2));
        let mut attempts = 0;
        let evicted = cache.expire_due(|h| {
            attempts += 1;
            if h.id == 1 {
                Err("seat already gone".to_string())
            } else {
                Ok(())
            }
        });

        assert_eq!(evicted, 3);
        assert_eq!(attempts, 3);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_halt_clears_and_is_idempotent() {
        let (clock, cache) = setup();
        cache.add(hold(1, 1, clock.now(), 120));
        let rx = cache.subscribe_halt();
        assert!(!*rx.borrow());

        cache.halt();
        cache.halt();

        assert!(cache.is_empty());
        assert!(cache.is_halted());
        assert!(*rx.borrow());
    }
}
