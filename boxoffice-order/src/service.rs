use crate::models::{HoldOutcome, RejectReason};
use boxoffice_catalog::{LevelTally, SeatArena, VenueCatalog};
use boxoffice_core::app_config::{Config, HoldSettings};
use boxoffice_core::{Clock, SystemClock, TicketError, TicketResult};
use boxoffice_hold::{HoldCache, Sweep, Sweeper};
use boxoffice_shared::{
    HoldExpiredEvent, HoldId, LevelId, Masked, Reservation, SeatHold, SeatsHeldEvent,
    SeatsReservedEvent, TicketEvent,
};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

const EVENT_CAPACITY: usize = 256;

/// Finds, holds and reserves seats.
///
/// Lock order is always the arena lock first, then the hold cache's own lock.
/// Holding, reserving and expiring all take the arena write lock for their
/// whole check-and-mutate sequence, which also makes commit and expiry of the
/// same hold mutually exclusive.
pub struct ReservationService {
    catalog: VenueCatalog,
    arena: RwLock<SeatArena>,
    holds: HoldCache,
    clock: Arc<dyn Clock>,
    settings: HoldSettings,
    next_hold_id: AtomicU32,
    next_sequence: AtomicU64,
    events: broadcast::Sender<TicketEvent>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl ReservationService {
    /// Builds a service without a background sweeper. Expired holds are only
    /// cleaned up through `expire_due_holds`.
    pub fn new(catalog: VenueCatalog, settings: HoldSettings, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            arena: RwLock::new(SeatArena::new(&catalog)),
            holds: HoldCache::new(clock.clone()),
            catalog,
            clock,
            settings,
            next_hold_id: AtomicU32::new(1),
            next_sequence: AtomicU64::new(1),
            events,
            sweeper: Mutex::new(None),
        }
    }

    /// Builds the service and starts its sweeper. Needs a tokio runtime.
    pub fn start(catalog: VenueCatalog, settings: HoldSettings, clock: Arc<dyn Clock>) -> Arc<Self> {
        let interval = settings.sweep_interval();
        let service = Arc::new(Self::new(catalog, settings, clock));
        let sweeper = Sweeper::spawn(Arc::downgrade(&service), interval, service.holds.subscribe_halt());
        *service.sweeper.lock().unwrap_or_else(PoisonError::into_inner) = Some(sweeper);

        info!(
            "Reservation service started: {} levels, {} seats, hold TTL {}s",
            service.catalog.levels().len(),
            service.catalog.total_capacity(),
            service.settings.ttl_seconds
        );
        service
    }

    pub fn from_config(config: &Config) -> Arc<Self> {
        Self::start(
            VenueCatalog::new(config.levels.clone()),
            config.holds.clone(),
            Arc::new(SystemClock),
        )
    }

    fn read_arena(&self) -> RwLockReadGuard<'_, SeatArena> {
        self.arena.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_arena(&self) -> RwLockWriteGuard<'_, SeatArena> {
        self.arena.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn catalog(&self) -> &VenueCatalog {
        &self.catalog
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TicketEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: TicketEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Seats that are neither held nor reserved, on one level or across the venue
    pub fn num_seats_available(&self, level_id: Option<LevelId>) -> TicketResult<usize> {
        let arena = self.read_arena();
        match level_id {
            Some(level_id) => arena
                .available(level_id)
                .map_err(|_| TicketError::InvalidLevel(level_id)),
            None => self
                .catalog
                .levels()
                .iter()
                .map(|level| {
                    arena
                        .available(level.id)
                        .map_err(|_| TicketError::InvalidLevel(level.id))
                })
                .sum(),
        }
    }

    /// Holds `num_seats` seats on the lowest-id level in `[min_level, max_level]`
    /// that can take the whole block. Never splits a hold across levels.
    pub fn find_and_hold_seats(
        &self,
        num_seats: usize,
        min_level: Option<LevelId>,
        max_level: Option<LevelId>,
        customer_id: &str,
    ) -> HoldOutcome {
        if num_seats == 0 {
            debug!("Rejected hold request for zero seats");
            return HoldOutcome::rejected(RejectReason::InvalidSeatCount);
        }
        if customer_id.trim().is_empty() {
            debug!("Rejected hold request without a customer id");
            return HoldOutcome::rejected(RejectReason::MissingCustomer);
        }

        let mut arena = self.write_arena();
        if self.holds.is_halted() {
            debug!("Rejected hold request after halt");
            return HoldOutcome::rejected(RejectReason::Halted);
        }
        for level in self.catalog.levels_between(min_level, max_level) {
            if arena.available(level.id).unwrap_or(0) < num_seats {
                continue;
            }

            let seats = match arena.allocate(level.id, num_seats) {
                Ok(seats) => seats,
                Err(err) => {
                    warn!("Allocation on level {} failed after availability check: {}", level.id, err);
                    continue;
                }
            };

            let now = self.clock.now();
            let hold = SeatHold {
                id: self.next_hold_id(),
                customer_id: customer_id.to_string(),
                level_id: level.id,
                created_at: now,
                expires_at: now + self.settings.ttl(),
                sequence: self.next_sequence.fetch_add(1, Ordering::Relaxed),
                seats,
            };
            self.holds.add(hold.clone());

            info!(
                "Hold {} created: {} seats on {} for {}",
                hold.id,
                num_seats,
                level.name,
                Masked::from(customer_id)
            );
            self.publish(TicketEvent::SeatsHeld(SeatsHeldEvent {
                hold_id: hold.id,
                customer_id: Masked::from(customer_id),
                level_id: hold.level_id,
                seat_count: hold.seat_count(),
                expires_at: hold.expires_at.timestamp(),
            }));
            return HoldOutcome::Held(hold);
        }

        debug!("No single level can hold {} seats", num_seats);
        HoldOutcome::rejected(RejectReason::NoCapacity)
    }

    /// Next free hold id. Caller must hold the arena write lock so the id cannot
    /// be taken between the check and the insert.
    fn next_hold_id(&self) -> HoldId {
        loop {
            let id = self.next_hold_id.fetch_add(1, Ordering::Relaxed);
            if id != 0 && !self.holds.contains(id) {
                return id;
            }
        }
    }

    /// Turns a live hold into a reservation and returns its confirmation code.
    ///
    /// Fails with `HoldNotFound` when the hold is unknown, belongs to someone
    /// else or has already expired.
    pub fn reserve_seats(&self, hold_id: HoldId, customer_id: &str) -> TicketResult<String> {
        let mut arena = self.write_arena();
        let now = self.clock.now();

        let hold = self
            .holds
            .get(hold_id)
            .filter(|hold| hold.belongs_to(customer_id) && !hold.is_expired_at(now))
            .ok_or_else(|| TicketError::hold_not_found(hold_id, customer_id))?;

        let reservation = Arc::new(Reservation {
            id: Uuid::new_v4().to_string(),
            customer_id: hold.customer_id.clone(),
            reserved_at: now,
            level_id: hold.level_id,
            seat_count: hold.seat_count(),
        });

        if let Err(err) = arena.commit(&hold.seats, Arc::clone(&reservation)) {
            warn!("Hold {} could not be committed: {}", hold_id, err);
            return Err(TicketError::hold_not_found(hold_id, customer_id));
        }
        self.holds.remove(hold_id);

        info!(
            "Hold {} reserved as {} ({} seats)",
            hold_id,
            reservation.id,
            reservation.seat_count
        );
        self.publish(TicketEvent::SeatsReserved(SeatsReservedEvent {
            hold_id,
            reservation_id: reservation.id.clone(),
            customer_id: Masked::from(customer_id),
            level_id: reservation.level_id,
            seat_count: reservation.seat_count,
            timestamp: now.timestamp(),
        }));
        Ok(reservation.id.clone())
    }

    /// Releases every hold past its expiry. This is what the sweeper runs.
    pub fn expire_due_holds(&self) -> usize {
        let mut arena = self.write_arena();
        let mut expired = Vec::new();

        let evicted = self.holds.expire_due(|hold| {
            expired.push((hold.id, hold.level_id, hold.seat_count()));
            arena.release(&hold.seats)
        });
        drop(arena);

        let now = self.clock.now().timestamp();
        for (hold_id, level_id, seat_count) in expired {
            debug!("Hold {} expired, {} seats released", hold_id, seat_count);
            self.publish(TicketEvent::HoldExpired(HoldExpiredEvent {
                hold_id,
                level_id,
                seat_count,
                expired_at: now,
            }));
        }
        evicted
    }

    /// Per-level seat counts, taken under one read lock
    pub fn level_tallies(&self) -> Vec<LevelTally> {
        let arena = self.read_arena();
        self.catalog
            .levels()
            .iter()
            .filter_map(|level| arena.tally(level.id).ok())
            .collect()
    }

    pub fn active_holds(&self) -> usize {
        self.holds.len()
    }

    /// Looks up a live hold without judging its expiry
    pub fn hold(&self, hold_id: HoldId) -> Option<SeatHold> {
        self.holds.get(hold_id)
    }

    /// Stops the sweeper and drops every cached hold. Idempotent.
    ///
    /// Seats held at that point stay Held, and later hold requests are
    /// rejected with `RejectReason::Halted` since nothing would expire them.
    pub fn halt(&self) {
        // Taken so no hold can slip in between the cache clear and the flag
        let _arena = self.write_arena();
        self.holds.halt();
    }

    pub fn is_halted(&self) -> bool {
        self.holds.is_halted()
    }

    /// Halts and waits for the sweeper task to exit.
    pub async fn shutdown(&self) {
        self.halt();
        let sweeper = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(sweeper) = sweeper {
            sweeper.join().await;
        }
    }
}

impl Sweep for ReservationService {
    fn sweep(&self) -> usize {
        self.expire_due_holds()
    }
}
