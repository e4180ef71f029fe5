use boxoffice_shared::SeatHold;
use serde::Serialize;

/// Why a hold request was turned away without an error
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectReason {
    /// Zero seats requested
    InvalidSeatCount,
    /// Blank customer identifier
    MissingCustomer,
    /// No single level in range has enough free seats
    NoCapacity,
    /// The service has been halted
    Halted,
}

/// Result of `find_and_hold_seats`.
///
/// Bad input is not an error here: the request is simply rejected and the
/// caller must check for it.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HoldOutcome {
    Held(SeatHold),
    Rejected { reason: RejectReason },
}

impl HoldOutcome {
    pub fn rejected(reason: RejectReason) -> Self {
        HoldOutcome::Rejected { reason }
    }

    /// The plain "hold or nothing" view
    pub fn into_hold(self) -> Option<SeatHold> {
        match self {
            HoldOutcome::Held(hold) => Some(hold),
            HoldOutcome::Rejected { .. } => None,
        }
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            HoldOutcome::Held(_) => None,
            HoldOutcome::Rejected { reason } => Some(*reason),
        }
    }
}
