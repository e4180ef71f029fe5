use boxoffice_core::TicketError;
use serde_json::{json, Value};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Ticket(#[from] TicketError),
    #[error("Failed to encode response: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl AppError {
    pub fn usage(msg: impl Into<String>) -> Self {
        AppError::Usage(msg.into())
    }

    /// JSON line sent back to the console in place of a normal response
    pub fn into_response(self) -> Value {
        let code = match &self {
            AppError::Usage(_) => "USAGE",
            AppError::Ticket(TicketError::InvalidLevel(_)) => "INVALID_LEVEL",
            AppError::Ticket(TicketError::HoldNotFound { .. }) => "HOLD_NOT_FOUND",
            AppError::Encoding(err) => {
                tracing::error!("Response encoding failed: {}", err);
                "INTERNAL"
            }
        };

        json!({
            "error": code,
            "message": self.to_string(),
        })
    }
}
