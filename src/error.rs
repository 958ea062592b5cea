use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

/// Failures reported by the document store itself.
///
/// `Conflict` is special: the transaction runner treats it as retryable,
/// everything else is surfaced to the caller as-is.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("write conflict on key {key}")]
    Conflict { key: String },

    #[error("storage backend failure: {message}")]
    Backend { message: String },
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

/// Unified error types for the raid system.
///
/// `BossAlreadyDefeated` and `DailyCapReached` are ordinary business
/// outcomes, not faults: they are returned synchronously and never retried.
#[derive(Error, Debug)]
pub enum RaidError {
    #[error("boss is already defeated")]
    BossAlreadyDefeated,

    #[error("daily damage cap reached")]
    DailyCapReached,

    #[error("transaction retries exhausted under contention")]
    Contention,

    #[error("boss {0} not found")]
    BossNotFound(Uuid),

    #[error("boss {0} is still active")]
    BossStillActive(Uuid),

    #[error("store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("JSON serialization/deserialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for raid operations
pub type RaidResult<T> = Result<T, RaidError>;

impl RaidError {
    fn code(&self) -> &'static str {
        match self {
            Self::BossAlreadyDefeated => "boss_already_defeated",
            Self::DailyCapReached => "daily_cap_reached",
            Self::Contention => "contention",
            Self::BossNotFound(_) => "boss_not_found",
            Self::BossStillActive(_) => "boss_still_active",
            Self::Store(_) => "store_failure",
            Self::Serialization(_) => "serialization_failure",
        }
    }
}

impl ResponseError for RaidError {
    // Business outcomes map to client-side statuses; only infrastructure
    // faults become 5xx.
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BossAlreadyDefeated => StatusCode::CONFLICT,
            Self::DailyCapReached => StatusCode::TOO_MANY_REQUESTS,
            Self::Contention => StatusCode::SERVICE_UNAVAILABLE,
            Self::BossNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_outcomes_are_not_server_faults() {
        assert_eq!(
            RaidError::BossAlreadyDefeated.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            RaidError::DailyCapReached.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            RaidError::Contention.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            RaidError::Store(StoreError::backend("down")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
