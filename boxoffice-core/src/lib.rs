pub mod app_config;
pub mod clock;

use boxoffice_shared::{HoldId, LevelId, Masked};

pub use clock::{Clock, ManualClock, SystemClock};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TicketError {
    #[error("Invalid venue level: {0}")]
    InvalidLevel(LevelId),
    /// Unknown id, customer mismatch and expired hold all surface as this one variant.
    #[error("Seat hold {hold_id} not found for customer {customer_id}")]
    HoldNotFound {
        hold_id: HoldId,
        customer_id: Masked<String>,
    },
}

impl TicketError {
    pub fn hold_not_found(hold_id: HoldId, customer_id: &str) -> Self {
        TicketError::HoldNotFound {
            hold_id,
            customer_id: Masked::from(customer_id),
        }
    }
}

pub type TicketResult<T> = Result<T, TicketError>;
