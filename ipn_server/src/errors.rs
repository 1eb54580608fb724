use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use ipn_engine::{IpnError, ReconciliationError};
use thiserror::Error;

/// Response bodies the processor sees on failure. They are part of the contract and must not change.
pub const INVALID_CONFIRMATION: &str = "Invalid confirmation";
pub const CONTRIBUTION_NOT_FOUND: &str = "Contribution not found";
pub const UNKNOWN_ERROR: &str = "Unknown error.";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("Could not process notification. {0}")]
    NotificationError(#[from] IpnError),
}

impl ServerError {
    fn public_message(&self) -> &'static str {
        match self {
            Self::NotificationError(IpnError::Unverified(_)) => INVALID_CONFIRMATION,
            Self::NotificationError(IpnError::Reconciliation(ReconciliationError::ContributionNotFound(_))) => {
                CONTRIBUTION_NOT_FOUND
            },
            _ => UNKNOWN_ERROR,
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotificationError(IpnError::Unverified(_)) => StatusCode::FORBIDDEN,
            Self::NotificationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    // Internal details are logged by the handler and never echoed back to the caller.
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).insert_header(ContentType::plaintext()).body(self.public_message())
    }
}
