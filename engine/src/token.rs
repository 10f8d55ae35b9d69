use std::time::Duration;

use log::{debug, info};

use crate::http::{SharedBackend, TransportError};

pub const TOKEN_PREFIX: &str = "hf_";
pub const WHOAMI_URL: &str = "https://huggingface.co/api/whoami";
pub const DEFAULT_VALIDATE_TIMEOUT: Duration = Duration::from_secs(10);

/// prefix plus the first four characters of the secret part
const REDACTED_VISIBLE_CHARS: usize = TOKEN_PREFIX.len() + 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Validity {
    #[default]
    Unknown,
    Valid,
    Invalid(InvalidReason),
}

impl Validity {
    /// Whether checking the same token again could give a different answer.
    pub fn is_settled(&self) -> bool {
        match self {
            Validity::Unknown => false,
            Validity::Valid => true,
            Validity::Invalid(reason) => !reason.is_transient(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    BadFormat,
    Rejected(u16),
    Timeout,
    Transport(String),
}

impl InvalidReason {
    pub fn is_transient(&self) -> bool {
        matches!(self, InvalidReason::Timeout | InvalidReason::Transport(_))
    }
}

/// What an operator may see about a check. Never holds the full token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenDiagnostics {
    pub length: usize,
    pub redacted: String,
    pub status: Option<u16>,
}

impl TokenDiagnostics {
    fn of(token: &str) -> Self {
        Self {
            length: token.chars().count(),
            redacted: redact_token(token),
            status: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenCheck {
    pub validity: Validity,
    pub diagnostics: TokenDiagnostics,
}

/// Shortens a token for logs. At most half of the token is ever shown.
pub fn redact_token(token: &str) -> String {
    let visible = REDACTED_VISIBLE_CHARS.min(token.chars().count() / 2);
    let shown: String = token.chars().take(visible).collect();
    format!("{shown}...")
}

#[derive(Clone)]
pub struct TokenValidator {
    backend: SharedBackend,
    whoami_url: String,
    timeout: Duration,
}

impl TokenValidator {
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            whoami_url: WHOAMI_URL.into(),
            timeout: DEFAULT_VALIDATE_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, whoami_url: impl Into<String>) -> Self {
        self.whoami_url = whoami_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn validate(&self, token: &str) -> Validity {
        self.check(token).await.validity
    }

    pub async fn check(&self, token: &str) -> TokenCheck {
        let mut diagnostics = TokenDiagnostics::of(token);

        if !token.starts_with(TOKEN_PREFIX) {
            debug!(
                "Rejecting token {} without a request: missing '{TOKEN_PREFIX}' prefix",
                diagnostics.redacted
            );
            return TokenCheck {
                validity: Validity::Invalid(InvalidReason::BadFormat),
                diagnostics,
            };
        }

        debug!(
            "Validating token {} ({} chars)",
            diagnostics.redacted, diagnostics.length
        );
        let validity = match self
            .backend
            .get(&self.whoami_url, token, self.timeout)
            .await
        {
            Ok(resp) => {
                info!("Token validation response status: {}", resp.status);
                diagnostics.status = Some(resp.status);
                if resp.is_ok() {
                    Validity::Valid
                } else {
                    Validity::Invalid(InvalidReason::Rejected(resp.status))
                }
            }
            Err(TransportError::Timeout) => Validity::Invalid(InvalidReason::Timeout),
            Err(TransportError::Other(e)) => Validity::Invalid(InvalidReason::Transport(e)),
        };

        TokenCheck {
            validity,
            diagnostics,
        }
    }
}
