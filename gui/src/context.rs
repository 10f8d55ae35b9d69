use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use color_eyre::{
    Result,
    eyre::{WrapErr as _, ensure},
};
use engine::{
    AppError,
    http::{ReqwestBackend, SharedBackend},
    image_model::{GenerationResult, INFERENCE_BASE_URL, InferenceSettings, Model},
    session::{GenerationTicket, Session, ValidationTicket},
    token::{TokenDiagnostics, TokenValidator, Validity, WHOAMI_URL},
};
use iced::{Task, widget::image::Handle as ImgHandle};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    feedback::{self, Feedback},
    message::{ContextMessage, Message},
};

pub const BACKGROUND_MISSING: &str = "Background image not found. The app will continue without it.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model: Model,
    pub whoami_url: String,
    pub inference_base_url: String,
    pub validate_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub generate_timeout_secs: u64,
    pub background_image: Option<PathBuf>,
    pub show_diagnostics: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: Model::default(),
            whoami_url: WHOAMI_URL.into(),
            inference_base_url: INFERENCE_BASE_URL.into(),
            validate_timeout_secs: 10,
            probe_timeout_secs: 10,
            generate_timeout_secs: 30,
            background_image: Some("background.jpg".into()),
            show_diagnostics: false,
        }
    }
}

impl Config {
    pub fn validator(&self, backend: SharedBackend) -> TokenValidator {
        TokenValidator::new(backend)
            .with_endpoint(&self.whoami_url)
            .with_timeout(Duration::from_secs(self.validate_timeout_secs))
    }

    pub fn inference_settings(&self) -> InferenceSettings {
        InferenceSettings {
            base_url: self.inference_base_url.clone(),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            generate_timeout: Duration::from_secs(self.generate_timeout_secs),
        }
    }
}

/// Everything that lives as long as the window does.
pub struct Context {
    pub session: Session,
    pub config: Config,
    backend: SharedBackend,
    pub image: Option<ImgHandle>,
    pub background: Option<ImgHandle>,
    pub banner: Option<&'static str>,
    pub token_diagnostics: Option<TokenDiagnostics>,
    pub feedback: Vec<Feedback>,
    /// Prompt submitted while the token was still unchecked
    queued_prompt: Option<String>,
}

impl Context {
    pub fn from_config(config: Config) -> Self {
        Self::with_backend(config, ReqwestBackend::shared())
    }

    pub fn with_backend(config: Config, backend: SharedBackend) -> Self {
        let (background, banner) = match &config.background_image {
            Some(path) => match load_background(path) {
                Ok(handle) => (Some(handle), None),
                Err(e) => {
                    warn!("{e:#}");
                    (None, Some(BACKGROUND_MISSING))
                }
            },
            None => (None, None),
        };

        Self {
            session: Session::new(),
            config,
            backend,
            image: None,
            background,
            banner,
            token_diagnostics: None,
            feedback: vec![],
            queued_prompt: None,
        }
    }

    pub fn update(&mut self, message: ContextMessage) -> Result<Task<Message>> {
        use ContextMessage::*;
        match message {
            TokenChecked { epoch, check } => {
                if !self.session.apply_validation(epoch, check.validity) {
                    return Ok(Task::none());
                }
                self.token_diagnostics = Some(check.diagnostics);
                Ok(match self.queued_prompt.take() {
                    Some(prompt) if *self.session.validity() == Validity::Valid => {
                        self.generate(prompt)
                    }
                    Some(_) => {
                        self.feedback = vec![feedback::for_gate(&AppError::InvalidCredential)];
                        Task::none()
                    }
                    None => Task::none(),
                })
            }

            ImageGenerated { prompt, result } => {
                ensure!(
                    self.session.is_generating(),
                    "Received an image for '{prompt}' without a running generation"
                );
                self.feedback = feedback::for_outcome(&result);
                self.image = match &result {
                    GenerationResult::Image(img) => Some(ImgHandle::from_bytes(img.bytes.clone())),
                    _ => None,
                };
                self.session.finish_generation(prompt, result);
                Ok(Task::none())
            }
        }
    }

    pub fn edit_token(&mut self, value: String) {
        if self.session.edit_credential(value) {
            self.token_diagnostics = None;
            if self.queued_prompt.take().is_some() {
                self.feedback.clear();
            }
        }
    }

    pub fn submit_token(&mut self) -> Task<Message> {
        let Some(ValidationTicket { epoch, token }) = self.session.commit_credential() else {
            return Task::none();
        };
        let validator = self.config.validator(self.backend.clone());
        Task::perform(
            async move { validator.check(&token).await },
            move |check| ContextMessage::TokenChecked { epoch, check }.into(),
        )
    }

    /// An unchecked token is validated first, the prompt runs once the answer is in.
    pub fn generate(&mut self, prompt: String) -> Task<Message> {
        if !self.session.credential().is_empty() && !self.session.validity().is_settled() {
            debug!("Token not checked yet, validating before generating");
            self.queued_prompt = Some(prompt);
            self.feedback = vec![feedback::validating()];
            self.image = None;
            return self.submit_token();
        }

        let GenerationTicket { token, prompt } = match self.session.begin_generation(&prompt) {
            Ok(ticket) => ticket,
            Err(e) => {
                debug!("Not generating: {e}");
                self.feedback = vec![feedback::for_gate(&e)];
                return Task::none();
            }
        };

        self.feedback.clear();
        self.image = None;
        let model = self.config.model.make(
            token,
            self.backend.clone(),
            &self.config.inference_settings(),
        );
        Task::perform(
            async move {
                let result = model.generate(&prompt).await;
                (prompt, result)
            },
            |(prompt, result)| ContextMessage::ImageGenerated { prompt, result }.into(),
        )
    }
}

fn load_background(path: &Path) -> Result<ImgHandle> {
    let bytes = fs::read(path)
        .wrap_err_with(|| format!("Couldn't read background image {}", path.display()))?;
    Ok(ImgHandle::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use engine::{
        http::{HttpBackend, HttpFuture, TransportError},
        image_model::FailureReason,
        token::{InvalidReason, TokenCheck},
    };
    use serde_json::Value;

    use super::*;
    use crate::feedback::Level;

    /// Counts requests and fails every one of them.
    #[derive(Default)]
    struct CountingBackend {
        calls: AtomicUsize,
    }

    impl CountingBackend {
        fn fail(&self) -> HttpFuture<'static> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Err(TransportError::Other("offline".into())) })
        }
    }

    impl HttpBackend for CountingBackend {
        fn get<'a>(&'a self, _: &'a str, _: &'a str, _: Duration) -> HttpFuture<'a> {
            self.fail()
        }

        fn post_json<'a>(
            &'a self,
            _: &'a str,
            _: &'a str,
            _: &'a Value,
            _: Duration,
        ) -> HttpFuture<'a> {
            self.fail()
        }
    }

    fn context() -> (Context, Arc<CountingBackend>) {
        let backend = Arc::new(CountingBackend::default());
        let config = Config {
            background_image: None,
            ..Config::default()
        };
        (Context::with_backend(config, backend.clone()), backend)
    }

    fn validate(ctx: &mut Context, token: &str) {
        ctx.edit_token(token.into());
        let ticket = ctx.session.commit_credential().unwrap();
        let check = TokenCheck {
            validity: Validity::Valid,
            diagnostics: TokenDiagnostics {
                length: token.len(),
                redacted: engine::token::redact_token(token),
                status: Some(200),
            },
        };
        ctx.update(ContextMessage::TokenChecked {
            epoch: ticket.epoch,
            check,
        })
        .unwrap();
    }

    #[test]
    fn empty_prompt_warns_without_request() {
        let (mut ctx, backend) = context();
        validate(&mut ctx, "hf_abcdefgh");

        let _task = ctx.generate(String::new());

        assert!(!ctx.session.is_generating());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.feedback.len(), 1);
        assert_eq!(ctx.feedback[0].level, Level::Warning);
        assert!(ctx.feedback[0].text.contains("image description"));
    }

    #[test]
    fn missing_token_warns() {
        let (mut ctx, _) = context();

        let _task = ctx.generate("a red fox".into());

        assert_eq!(
            ctx.feedback,
            vec![feedback::for_gate(&AppError::InvalidCredential)]
        );
    }

    fn checked(ctx: &Context, validity: Validity) -> ContextMessage {
        ContextMessage::TokenChecked {
            epoch: ctx.session.epoch(),
            check: TokenCheck {
                validity,
                diagnostics: TokenDiagnostics {
                    length: 11,
                    redacted: "hf_a...".into(),
                    status: None,
                },
            },
        }
    }

    #[test]
    fn unchecked_token_is_validated_before_generating() {
        let (mut ctx, _) = context();
        ctx.edit_token("hf_realtoken123".into());

        let _task = ctx.generate("a cat".into());

        assert!(ctx.session.is_validating());
        assert!(!ctx.session.is_generating());
        assert_eq!(ctx.feedback, vec![feedback::validating()]);

        let _task = ctx.update(checked(&ctx, Validity::Valid)).unwrap();

        assert!(ctx.session.is_generating());
        assert!(ctx.feedback.is_empty());
    }

    #[test]
    fn rejected_token_refuses_the_queued_prompt() {
        let (mut ctx, _) = context();
        ctx.edit_token("hf_realtoken123".into());
        let _task = ctx.generate("a cat".into());

        let _task = ctx
            .update(checked(
                &ctx,
                Validity::Invalid(InvalidReason::Rejected(401)),
            ))
            .unwrap();

        assert!(!ctx.session.is_generating());
        assert_eq!(
            ctx.feedback,
            vec![feedback::for_gate(&AppError::InvalidCredential)]
        );
    }

    #[test]
    fn timed_out_check_does_not_retry_on_its_own() {
        let (mut ctx, _) = context();
        ctx.edit_token("hf_realtoken123".into());
        let _task = ctx.generate("a cat".into());

        let _task = ctx
            .update(checked(&ctx, Validity::Invalid(InvalidReason::Timeout)))
            .unwrap();

        assert!(!ctx.session.is_validating());
        assert!(!ctx.session.is_generating());
        assert_eq!(ctx.feedback[0].level, Level::Warning);

        // a second click checks the token again
        let _task = ctx.generate("a cat".into());
        assert!(ctx.session.is_validating());
    }

    #[test]
    fn editing_the_token_drops_the_queued_prompt() {
        let (mut ctx, _) = context();
        ctx.edit_token("hf_realtoken123".into());
        let _task = ctx.generate("a cat".into());
        let stale = checked(&ctx, Validity::Valid);

        ctx.edit_token("hf_othertoken".into());
        let _task = ctx.update(stale).unwrap();
        assert!(ctx.feedback.is_empty());

        let _task = ctx.update(checked(&ctx, Validity::Valid)).unwrap();
        assert!(!ctx.session.is_generating());
    }

    #[test]
    fn generated_image_replaces_feedback() {
        let (mut ctx, _) = context();
        validate(&mut ctx, "hf_abcdefgh");
        let _task = ctx.generate("a red fox".into());
        assert!(ctx.session.is_generating());

        ctx.update(ContextMessage::ImageGenerated {
            prompt: "a red fox".into(),
            result: GenerationResult::Failure(FailureReason::Service(
                "Rate limit reached".into(),
            )),
        })
        .unwrap();

        assert!(!ctx.session.is_generating());
        assert!(ctx.image.is_none());
        assert!(ctx.feedback.iter().any(|f| f.level == Level::Error));
    }

    #[test]
    fn result_without_generation_is_an_error() {
        let (mut ctx, _) = context();
        let res = ctx.update(ContextMessage::ImageGenerated {
            prompt: "x".into(),
            result: GenerationResult::Pending,
        });
        assert!(res.is_err());
    }

    #[test]
    fn editing_drops_diagnostics() {
        let (mut ctx, _) = context();
        validate(&mut ctx, "hf_abcdefgh");
        assert!(ctx.token_diagnostics.is_some());

        ctx.edit_token("hf_abcdefghi".into());
        assert!(ctx.token_diagnostics.is_none());
        assert_eq!(ctx.session.validity(), &Validity::Unknown);
    }

    #[test]
    fn missing_background_is_not_fatal() {
        let config = Config {
            background_image: Some("/definitely/not/here.jpg".into()),
            ..Config::default()
        };
        let ctx = Context::with_backend(config, Arc::new(CountingBackend::default()));
        assert!(ctx.background.is_none());
        assert_eq!(ctx.banner, Some(BACKGROUND_MISSING));
    }
}
