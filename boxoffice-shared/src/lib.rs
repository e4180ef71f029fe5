pub mod models;
pub mod pii;

pub use models::events::{HoldExpiredEvent, SeatsHeldEvent, SeatsReservedEvent, TicketEvent};
pub use models::{HoldId, LevelId, Reservation, SeatCoord, SeatHold, VenueLevel};
pub use pii::Masked;
