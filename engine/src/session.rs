//! In-memory state of one interactive session.
//!
//! The session owns the token the user typed and what is known about it. Every
//! edit bumps an epoch, and validation results carry the epoch they were started
//! for, so a result that arrives after the token changed is dropped instead of
//! being attached to the new value.

use std::fmt;

use log::debug;

use crate::{
    AppError,
    image_model::GenerationResult,
    token::{Validity, redact_token},
};

#[derive(Debug, Default)]
pub struct Session {
    credential: Credential,
    epoch: u64,
    validating: Option<u64>,
    generating: bool,
    last_outcome: Option<Outcome>,
}

#[derive(Default, Clone, PartialEq, Eq)]
pub struct Credential {
    pub value: String,
    pub validity: Validity,
}

/// Handed out when a token needs checking. Give the epoch back with the result.
#[derive(Clone, PartialEq, Eq)]
pub struct ValidationTicket {
    pub epoch: u64,
    pub token: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct GenerationTicket {
    pub token: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub prompt: String,
    pub result: GenerationResult,
}

// tokens only ever show up redacted in debug output

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("value", &redact_token(&self.value))
            .field("validity", &self.validity)
            .finish()
    }
}

impl fmt::Debug for ValidationTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationTicket")
            .field("epoch", &self.epoch)
            .field("token", &redact_token(&self.token))
            .finish()
    }
}

impl fmt::Debug for GenerationTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationTicket")
            .field("token", &redact_token(&self.token))
            .field("prompt", &self.prompt)
            .finish()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn credential(&self) -> &str {
        &self.credential.value
    }

    pub fn validity(&self) -> &Validity {
        &self.credential.validity
    }

    /// Bumped on every edit of the token
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn is_validating(&self) -> bool {
        self.validating == Some(self.epoch)
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn last_outcome(&self) -> Option<&Outcome> {
        self.last_outcome.as_ref()
    }

    /// Returns true if the stored token changed, which forgets its validity.
    pub fn edit_credential(&mut self, value: impl Into<String>) -> bool {
        let value = value.into();
        if value == self.credential.value {
            return false;
        }
        self.credential = Credential {
            value,
            validity: Validity::Unknown,
        };
        self.epoch += 1;
        true
    }

    /// Starts a check of the stored token unless one is running or the answer is known.
    pub fn commit_credential(&mut self) -> Option<ValidationTicket> {
        if self.credential.value.is_empty()
            || self.credential.validity.is_settled()
            || self.is_validating()
        {
            return None;
        }
        self.validating = Some(self.epoch);
        Some(ValidationTicket {
            epoch: self.epoch,
            token: self.credential.value.clone(),
        })
    }

    /// Returns false if the token changed since the check was started.
    pub fn apply_validation(&mut self, epoch: u64, validity: Validity) -> bool {
        if epoch != self.epoch {
            debug!(
                "Dropping validation result for epoch {epoch}, now at {}",
                self.epoch
            );
            return false;
        }
        self.validating = None;
        self.credential.validity = validity;
        true
    }

    pub fn begin_generation(&mut self, prompt: &str) -> Result<GenerationTicket, AppError> {
        if self.credential.value.is_empty() || self.credential.validity != Validity::Valid {
            return Err(AppError::InvalidCredential);
        }
        if prompt.trim().is_empty() {
            return Err(AppError::EmptyPromptInput);
        }
        if self.generating {
            return Err(AppError::Busy);
        }
        self.generating = true;
        Ok(GenerationTicket {
            token: self.credential.value.clone(),
            prompt: prompt.into(),
        })
    }

    pub fn finish_generation(&mut self, prompt: String, result: GenerationResult) {
        self.generating = false;
        self.last_outcome = Some(Outcome { prompt, result });
    }
}
