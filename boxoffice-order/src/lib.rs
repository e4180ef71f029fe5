pub mod models;
pub mod service;

pub use models::{HoldOutcome, RejectReason};
pub use service::ReservationService;
