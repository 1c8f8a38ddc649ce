//! Vision Risk Classifier
//!
//! Sends one still frame to a remote vision-language model and turns the
//! reply into a validated [`RiskVerdict`]. Schema problems in the reply never
//! escape as errors; they become an UNKNOWN verdict.

mod gemini;
mod prompt;
mod verdict;

pub use gemini::{ClassifierConfig, Credential, GeminiClient, API_KEY_ENV};
pub use prompt::{SYSTEM_INSTRUCTION, USER_INSTRUCTION};
pub use verdict::{parse_verdict, strip_code_fence, RiskKind, RiskVerdict};

use async_trait::async_trait;
use frame_capture::EncodedFrame;
use thiserror::Error;

/// Errors surfaced by a classifier
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Credential absent or blank; fatal until restart
    #[error("API key not configured: set the {0} environment variable")]
    MissingCredential(&'static str),
    #[error("Invalid classifier configuration: {0}")]
    InvalidConfig(String),
    #[error("Request to classifier failed: {0}")]
    Transport(String),
    #[error("Classifier returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Classifier response envelope unreadable: {0}")]
    Envelope(String),
}

impl ClassifierError {
    /// Configuration errors are sticky; everything else is per-call.
    /// A credential the service rejects counts as configuration.
    pub fn is_configuration(&self) -> bool {
        match self {
            ClassifierError::MissingCredential(_) | ClassifierError::InvalidConfig(_) => true,
            ClassifierError::Status { status, body } => {
                matches!(status, 401 | 403) || (*status == 400 && body.contains("API_KEY_INVALID"))
            }
            _ => false,
        }
    }
}

/// A remote image classifier. One call per frame, no retries.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, frame: &EncodedFrame) -> Result<RiskVerdict, ClassifierError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors() {
        assert!(ClassifierError::MissingCredential(API_KEY_ENV).is_configuration());
        assert!(ClassifierError::InvalidConfig("bad url".into()).is_configuration());
        assert!(!ClassifierError::Transport("reset".into()).is_configuration());
        assert!(!ClassifierError::Status { status: 500, body: String::new() }.is_configuration());
        assert!(ClassifierError::Status { status: 403, body: String::new() }.is_configuration());
        assert!(ClassifierError::Status {
            status: 400,
            body: r#"{"error":{"details":[{"reason":"API_KEY_INVALID"}]}}"#.into(),
        }
        .is_configuration());
    }
}
