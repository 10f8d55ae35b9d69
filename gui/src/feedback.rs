use engine::{
    AppError,
    image_model::GenerationResult,
    session::Session,
    token::{TokenDiagnostics, Validity},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub level: Level,
    pub text: String,
}

impl Feedback {
    fn new(level: Level, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

pub const GENERATING: &str = "🎨 Generating your masterpiece... Please wait...";
pub const VALIDATING: &str = "Validating token...";

pub fn validating() -> Feedback {
    Feedback::new(Level::Info, VALIDATING)
}

/// Corrective message for a generate click that was refused before any request.
pub fn for_gate(err: &AppError) -> Feedback {
    Feedback::new(Level::Warning, format!("⚠️ {err}"))
}

pub fn for_outcome(result: &GenerationResult) -> Vec<Feedback> {
    match result {
        GenerationResult::Image(_) => {
            vec![Feedback::new(Level::Success, "✨ Image generated successfully!")]
        }
        GenerationResult::Pending => vec![
            Feedback::new(Level::Info, format!("⏳ {}", AppError::ModelWarmingUp)),
            Feedback::new(
                Level::Warning,
                "If this takes too long, try generating again.",
            ),
        ],
        GenerationResult::Failure(reason) => {
            let lowered = reason.to_string().to_lowercase();
            let mut out = vec![Feedback::new(
                Level::Error,
                format!("❌ {}", AppError::from(reason.clone())),
            )];
            if lowered.contains("loading") {
                out.push(Feedback::new(
                    Level::Info,
                    "⏳ The model is still loading. Please wait a minute and try again.",
                ));
            } else if lowered.contains("rate limit") {
                out.push(Feedback::new(
                    Level::Warning,
                    "⚠️ Rate limit reached. Please wait a minute before trying again.",
                ));
            }
            out
        }
    }
}

/// Status line shown under the token input
pub fn for_token(session: &Session) -> Option<Feedback> {
    if session.credential().is_empty() {
        return None;
    }
    if session.is_validating() {
        return Some(Feedback::new(Level::Info, VALIDATING));
    }
    Some(match session.validity() {
        Validity::Unknown => Feedback::new(Level::Info, "Press Enter to validate your token."),
        Validity::Valid => Feedback::new(Level::Success, "Token is valid"),
        Validity::Invalid(reason) => {
            Feedback::new(Level::Error, AppError::from(reason.clone()).to_string())
        }
    })
}

pub fn diagnostics_lines(diag: &TokenDiagnostics) -> Vec<String> {
    let mut lines = vec![
        format!("Token length: {}", diag.length),
        format!("Token starts with: {}", diag.redacted),
    ];
    if let Some(status) = diag.status {
        lines.push(format!("Response status: {status}"));
    }
    lines
}
