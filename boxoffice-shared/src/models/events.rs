use crate::models::{HoldId, LevelId};
use crate::pii::Masked;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SeatsHeldEvent {
    pub hold_id: HoldId,
    pub customer_id: Masked<String>,
    pub level_id: LevelId,
    pub seat_count: usize,
    pub expires_at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct HoldExpiredEvent {
    pub hold_id: HoldId,
    pub level_id: LevelId,
    pub seat_count: usize,
    pub expired_at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SeatsReservedEvent {
    pub hold_id: HoldId,
    pub reservation_id: String,
    pub customer_id: Masked<String>,
    pub level_id: LevelId,
    pub seat_count: usize,
    pub timestamp: i64,
}

/// Lifecycle notifications fanned out to in-process subscribers
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketEvent {
    SeatsHeld(SeatsHeldEvent),
    HoldExpired(HoldExpiredEvent),
    SeatsReserved(SeatsReservedEvent),
}

impl TicketEvent {
    pub fn hold_id(&self) -> HoldId {
        match self {
            TicketEvent::SeatsHeld(e) => e.hold_id,
            TicketEvent::HoldExpired(e) => e.hold_id,
            TicketEvent::SeatsReserved(e) => e.hold_id,
        }
    }
}
