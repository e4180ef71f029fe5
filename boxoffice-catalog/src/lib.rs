pub mod venue;
pub mod arena;

pub use venue::VenueCatalog;
pub use arena::{ArenaError, LevelTally, Seat, SeatArena, SeatStatus};
