use thiserror::Error;

use crate::RejectionReason;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Exchange API error: {0}")]
    Exchange(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Order rejected: {reason}")]
    OrderRejected { reason: RejectionReason },
}

impl Error {
    /// Transport and response-body failures. Callers that fail open treat
    /// these as "no data" rather than aborting.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Exchange(_) | Error::Json(_) | Error::Parse(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signing_and_config_errors_are_not_recoverable() {
        assert!(Error::Http("timeout".into()).is_recoverable());
        assert!(Error::Parse("bad close".into()).is_recoverable());
        assert!(!Error::Signing("bad key".into()).is_recoverable());
        assert!(!Error::Config("missing".into()).is_recoverable());
    }

    #[test]
    fn rejection_displays_reason() {
        let e = Error::OrderRejected {
            reason: RejectionReason::Declined("INSUFFICIENT_FUND".into()),
        };
        assert_eq!(e.to_string(), "Order rejected: declined by venue: INSUFFICIENT_FUND");
    }
}
