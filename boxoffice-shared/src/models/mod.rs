pub mod events;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Numeric venue level identifier. Signed so out-of-range input such as `-1`
/// can be reported back to the caller verbatim.
pub type LevelId = i32;

/// Seat hold identifier, assigned from a wrapping counter.
pub type HoldId = u32;

/// A priced seating section with a fixed row/seat grid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VenueLevel {
    pub id: LevelId,
    pub name: String,
    pub price: f64,
    pub rows: usize,
    pub seats_per_row: usize,
}

impl VenueLevel {
    pub fn new(id: LevelId, name: impl Into<String>, price: f64, rows: usize, seats_per_row: usize) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            rows,
            seats_per_row,
        }
    }

    pub fn capacity(&self) -> usize {
        self.rows * self.seats_per_row
    }
}

/// Position of a seat inside the venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeatCoord {
    pub level_id: LevelId,
    pub row: usize,
    pub column: usize,
}

impl SeatCoord {
    pub fn new(level_id: LevelId, row: usize, column: usize) -> Self {
        Self { level_id, row, column }
    }
}

/// A time-limited claim on a block of seats within one level
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeatHold {
    pub id: HoldId,
    pub customer_id: String,
    pub level_id: LevelId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Creation order, breaks ties between holds expiring at the same instant.
    pub sequence: u64,
    pub seats: Vec<SeatCoord>,
}

impl SeatHold {
    /// A hold is stale once `now` is strictly past its expiry timestamp.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Customer identifiers are compared case-insensitively.
    pub fn belongs_to(&self, customer_id: &str) -> bool {
        self.customer_id.to_lowercase() == customer_id.to_lowercase()
    }

    pub fn seat_count(&self) -> usize {
        self.seats.len()
    }

    /// Sort key used by the expiry index. The id keeps the key unique even if
    /// two holds share a timestamp and sequence number.
    pub fn expiry_key(&self) -> (DateTime<Utc>, u64, HoldId) {
        (self.expires_at, self.sequence, self.id)
    }
}

/// A permanent claim on seats, created by confirming a hold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub id: String,
    pub customer_id: String,
    pub reserved_at: DateTime<Utc>,
    pub level_id: LevelId,
    pub seat_count: usize,
}
