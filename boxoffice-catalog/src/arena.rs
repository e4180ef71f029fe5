use crate::venue::VenueCatalog;
use boxoffice_shared::{LevelId, Reservation, SeatCoord};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Status of a single seat. `Reserved` is terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum SeatStatus {
    Free,
    Held,
    Reserved(Arc<Reservation>),
}

impl SeatStatus {
    pub fn is_free(&self) -> bool {
        matches!(self, SeatStatus::Free)
    }

    pub fn is_held(&self) -> bool {
        matches!(self, SeatStatus::Held)
    }
}

/// A materialized seat. Seats nobody has touched yet stay unmaterialized and
/// count as free.
#[derive(Debug, Clone)]
pub struct Seat {
    pub coord: SeatCoord,
    pub status: SeatStatus,
}

impl Seat {
    fn new(coord: SeatCoord) -> Self {
        Self {
            coord,
            status: SeatStatus::Free,
        }
    }
}

/// Seat counts for one level, by status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelTally {
    pub level_id: LevelId,
    pub capacity: usize,
    pub free: usize,
    pub held: usize,
    pub reserved: usize,
}

/// Row-major grid for one level
#[derive(Debug)]
struct LevelGrid {
    level_id: LevelId,
    rows: usize,
    seats_per_row: usize,
    seats: Vec<Option<Seat>>,
    held: usize,
    reserved: usize,
}

impl LevelGrid {
    fn new(level_id: LevelId, rows: usize, seats_per_row: usize) -> Self {
        let mut seats = Vec::with_capacity(rows * seats_per_row);
        seats.resize_with(rows * seats_per_row, || None);
        Self {
            level_id,
            rows,
            seats_per_row,
            seats,
            held: 0,
            reserved: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.seats.len()
    }

    fn available(&self) -> usize {
        self.capacity() - self.held - self.reserved
    }

    fn index_of(&self, coord: &SeatCoord) -> Result<usize, ArenaError> {
        if coord.row >= self.rows || coord.column >= self.seats_per_row {
            return Err(ArenaError::SeatOutOfRange(*coord));
        }
        Ok(coord.row * self.seats_per_row + coord.column)
    }

    fn coord_at(&self, index: usize) -> SeatCoord {
        SeatCoord::new(self.level_id, index / self.seats_per_row, index % self.seats_per_row)
    }

    fn status(&self, coord: &SeatCoord) -> Result<SeatStatus, ArenaError> {
        let index = self.index_of(coord)?;
        Ok(self.seats[index]
            .as_ref()
            .map(|seat| seat.status.clone())
            .unwrap_or(SeatStatus::Free))
    }

    fn release(&mut self, coord: &SeatCoord) -> Result<(), ArenaError> {
        let index = self.index_of(coord)?;
        match self.seats[index].as_mut() {
            Some(seat) if seat.status.is_held() => {
                seat.status = SeatStatus::Free;
                self.held -= 1;
                Ok(())
            }
            _ => Err(ArenaError::NotHeld(*coord)),
        }
    }
}

/// Owns every level's seat grid and answers availability and allocation queries.
///
/// Not synchronized itself; the reservation service guards it with one lock.
#[derive(Debug)]
pub struct SeatArena {
    grids: BTreeMap<LevelId, LevelGrid>,
}

impl SeatArena {
    pub fn new(catalog: &VenueCatalog) -> Self {
        let grids = catalog
            .levels()
            .iter()
            .map(|level| (level.id, LevelGrid::new(level.id, level.rows, level.seats_per_row)))
            .collect();
        Self { grids }
    }

    fn grid(&self, level_id: LevelId) -> Result<&LevelGrid, ArenaError> {
        self.grids.get(&level_id).ok_or(ArenaError::UnknownLevel(level_id))
    }

    fn grid_mut(&mut self, level_id: LevelId) -> Result<&mut LevelGrid, ArenaError> {
        self.grids.get_mut(&level_id).ok_or(ArenaError::UnknownLevel(level_id))
    }

    /// Seats that are neither held nor reserved, untouched seats included
    pub fn available(&self, level_id: LevelId) -> Result<usize, ArenaError> {
        Ok(self.grid(level_id)?.available())
    }

    /// First-fit scan in row-major order, marking the first `count` free seats
    /// as held. Touches nothing when the level has fewer than `count` free.
    pub fn allocate(&mut self, level_id: LevelId, count: usize) -> Result<Vec<SeatCoord>, ArenaError> {
        let grid = self.grid_mut(level_id)?;
        let available = grid.available();
        if available < count {
            return Err(ArenaError::InsufficientSeats {
                level_id,
                requested: count,
                available,
            });
        }

        let mut allocated = Vec::with_capacity(count);
        for index in 0..grid.capacity() {
            if allocated.len() == count {
                break;
            }
            let coord = grid.coord_at(index);
            let seat = grid.seats[index].get_or_insert_with(|| Seat::new(coord));
            if seat.status.is_free() {
                seat.status = SeatStatus::Held;
                allocated.push(coord);
            }
        }

        grid.held += allocated.len();
        Ok(allocated)
    }

    /// Returns held seats to the pool. Keeps going past a bad seat and reports
    /// the first fault once every seat has been tried.
    pub fn release(&mut self, seats: &[SeatCoord]) -> Result<(), ArenaError> {
        let mut first_fault = None;
        for coord in seats {
            let outcome = self
                .grid_mut(coord.level_id)
                .and_then(|grid| grid.release(coord));
            if let Err(err) = outcome {
                tracing::warn!("Seat release skipped: {}", err);
                first_fault.get_or_insert(err);
            }
        }
        match first_fault {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Moves held seats to `Reserved`. All-or-nothing: every seat is checked
    /// before any is changed.
    pub fn commit(&mut self, seats: &[SeatCoord], reservation: Arc<Reservation>) -> Result<(), ArenaError> {
        for coord in seats {
            if !self.grid(coord.level_id)?.status(coord)?.is_held() {
                return Err(ArenaError::NotHeld(*coord));
            }
        }

        for coord in seats {
            let grid = self.grid_mut(coord.level_id)?;
            let index = grid.index_of(coord)?;
            if let Some(seat) = grid.seats[index].as_mut() {
                seat.status = SeatStatus::Reserved(Arc::clone(&reservation));
                grid.held -= 1;
                grid.reserved += 1;
            }
        }
        Ok(())
    }

    pub fn seat_status(&self, coord: &SeatCoord) -> Result<SeatStatus, ArenaError> {
        self.grid(coord.level_id)?.status(coord)
    }

    pub fn tally(&self, level_id: LevelId) -> Result<LevelTally, ArenaError> {
        let grid = self.grid(level_id)?;
        Ok(LevelTally {
            level_id,
            capacity: grid.capacity(),
            free: grid.available(),
            held: grid.held,
            reserved: grid.reserved,
        })
    }

    /// Number of seats that have been materialized so far
    pub fn materialized(&self, level_id: LevelId) -> Result<usize, ArenaError> {
        Ok(self.grid(level_id)?.seats.iter().filter(|slot| slot.is_some()).count())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArenaError {
    #[error("Unknown venue level: {0}")]
    UnknownLevel(LevelId),

    #[error("Insufficient seats on level {level_id}: requested {requested}, available {available}")]
    InsufficientSeats {
        level_id: LevelId,
        requested: usize,
        available: usize,
    },

    #[error("Seat {0:?} is outside its level's grid")]
    SeatOutOfRange(SeatCoord),

    #[error("Seat {0:?} is not held")]
    NotHeld(SeatCoord),
}
