use thiserror::Error;

use crate::{image_model::FailureReason, token::InvalidReason};

const GENERATION_TIMED_OUT: &str = "Request timed out. Please try again.";

/// Everything a user can be told went wrong. None of these are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("Token should start with 'hf_'. Please check your token.")]
    InvalidCredentialFormat,

    #[error("Validation failed with status code: {0}")]
    CredentialRejectedByService(u16),

    #[error("Connection timed out. Please try again.")]
    NetworkTimeout,

    #[error("Connection error: {0}")]
    TransportFailure(String),

    #[error("Model is loading... This might take a minute or two. Please wait.")]
    ModelWarmingUp,

    #[error("Error generating image: {0}")]
    GenerationFailed(String),

    #[error("Please provide an image description.")]
    EmptyPromptInput,

    /// Generation was requested without a token that passed validation
    #[error("Please input a valid Hugging Face API token.")]
    InvalidCredential,

    #[error("An image is already being generated. Please wait.")]
    Busy,
}

impl From<InvalidReason> for AppError {
    fn from(reason: InvalidReason) -> Self {
        match reason {
            InvalidReason::BadFormat => Self::InvalidCredentialFormat,
            InvalidReason::Rejected(status) => Self::CredentialRejectedByService(status),
            InvalidReason::Timeout => Self::NetworkTimeout,
            InvalidReason::Transport(e) => Self::TransportFailure(e),
        }
    }
}

/// Generation failures keep their own wording, distinct from token check failures.
impl From<FailureReason> for AppError {
    fn from(reason: FailureReason) -> Self {
        match reason {
            FailureReason::Timeout => Self::GenerationFailed(GENERATION_TIMED_OUT.into()),
            other => Self::GenerationFailed(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_distinct() {
        let all = [
            AppError::InvalidCredentialFormat,
            AppError::CredentialRejectedByService(401),
            AppError::NetworkTimeout,
            AppError::TransportFailure("dns".into()),
            AppError::ModelWarmingUp,
            AppError::GenerationFailed("overloaded".into()),
            AppError::EmptyPromptInput,
            AppError::InvalidCredential,
            AppError::Busy,
        ];
        let mut messages: Vec<String> = all.iter().map(ToString::to_string).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), all.len());
    }

    #[test]
    fn generation_failures_keep_service_reason() {
        assert_eq!(
            AppError::from(FailureReason::Service("overloaded".into())).to_string(),
            "Error generating image: overloaded"
        );
        assert_eq!(
            AppError::from(InvalidReason::Timeout),
            AppError::NetworkTimeout
        );
        assert_eq!(
            AppError::from(InvalidReason::Rejected(401)),
            AppError::CredentialRejectedByService(401)
        );
    }

    #[test]
    fn generation_faults_read_differently_from_token_check_faults() {
        let generation_timeout = AppError::from(FailureReason::Timeout);
        assert_eq!(
            generation_timeout.to_string(),
            "Error generating image: Request timed out. Please try again."
        );
        assert_ne!(generation_timeout, AppError::from(InvalidReason::Timeout));

        assert_eq!(
            AppError::from(FailureReason::Transport("connection reset".into())),
            AppError::GenerationFailed("connection reset".into())
        );
        assert_eq!(
            AppError::from(InvalidReason::Transport("connection reset".into())),
            AppError::TransportFailure("connection reset".into())
        );
    }
}
