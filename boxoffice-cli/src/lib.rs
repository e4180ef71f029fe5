pub mod commands;
pub mod error;

pub use commands::{execute, handle_line, Command};
pub use error::AppError;

use boxoffice_order::ReservationService;
use tokio::sync::broadcast::error::RecvError;

/// Logs every lifecycle event until the service goes away
pub async fn log_events(service: &ReservationService) {
    let mut rx = service.subscribe();
    loop {
        match rx.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(payload) => tracing::debug!("event {}", payload),
                Err(e) => tracing::warn!("Could not encode event for hold {}: {}", event.hold_id(), e),
            },
            Err(RecvError::Lagged(skipped)) => tracing::warn!("Event log fell behind, skipped {}", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}
