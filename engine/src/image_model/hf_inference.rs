use std::{pin::Pin, time::Duration};

use bytes::Bytes;
use image::GenericImageView;
use log::{debug, info, warn};
use serde_json::{Value, json};

use crate::{
    ImgModBox,
    http::{HttpResponse, SharedBackend, TransportError},
    image_model::{
        FailureReason, GeneratedImage, GenerationRequest, GenerationResult, ImageModel,
        InferenceSettings, Model,
    },
};

/// Status the inference API answers with while a model is being loaded
pub const MODEL_LOADING_STATUS: u16 = 503;
const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// Text-to-image through the Hugging Face serverless inference API.
///
/// Every call first probes the endpoint with an empty input. A cold model answers
/// the probe with 503, in which case [`GenerationResult::Pending`] is returned and
/// the (expensive) generation request is never sent.
#[derive(Clone)]
pub struct HfInference {
    model: Model,
    backend: SharedBackend,
    api_key: String,
    url: String,
    probe_timeout: Duration,
    generate_timeout: Duration,
}

impl HfInference {
    pub fn new(
        model: Model,
        api_key: String,
        backend: SharedBackend,
        settings: &InferenceSettings,
    ) -> Self {
        Self {
            model,
            backend,
            api_key,
            url: format!(
                "{}/{}",
                settings.base_url.trim_end_matches('/'),
                model.repo_id()
            ),
            probe_timeout: settings.probe_timeout,
            generate_timeout: settings.generate_timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Ok(false) means the model is still loading
    async fn probe(&self) -> Result<bool, FailureReason> {
        let body = json!({ "inputs": "" });
        let resp = self
            .backend
            .post_json(&self.url, &self.api_key, &body, self.probe_timeout)
            .await
            .map_err(failure_from_transport)?;
        debug!("Probe of {} answered {}", self.model, resp.status);
        Ok(resp.status != MODEL_LOADING_STATUS)
    }

    async fn run(&self, prompt: &str) -> GenerationResult {
        match self.probe().await {
            Ok(true) => {}
            Ok(false) => {
                info!("{} is still loading, not sending the generation request", self.model);
                return GenerationResult::Pending;
            }
            Err(reason) => return GenerationResult::Failure(reason),
        }

        let body = match serde_json::to_value(GenerationRequest::new(prompt)) {
            Ok(body) => body,
            Err(e) => return GenerationResult::Failure(FailureReason::Transport(e.to_string())),
        };
        let resp = match self
            .backend
            .post_json(&self.url, &self.api_key, &body, self.generate_timeout)
            .await
        {
            Ok(resp) => resp,
            Err(e) => return GenerationResult::Failure(failure_from_transport(e)),
        };

        if resp.is_ok() {
            decode_image(resp.body, prompt)
        } else {
            let message = service_error_message(&resp);
            warn!("Generation failed with status {}: {message}", resp.status);
            GenerationResult::Failure(FailureReason::Service(message))
        }
    }
}

impl ImageModel for HfInference {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = GenerationResult> + Send + 'a>> {
        Box::pin(self.run(prompt))
    }

    fn model(&self) -> Model {
        self.model
    }
}

fn failure_from_transport(e: TransportError) -> FailureReason {
    match e {
        TransportError::Timeout => FailureReason::Timeout,
        TransportError::Other(msg) => FailureReason::Transport(msg),
    }
}

fn decode_image(bytes: Bytes, prompt: &str) -> GenerationResult {
    match image::load_from_memory(&bytes) {
        Ok(img) => {
            let (width, height) = img.dimensions();
            GenerationResult::Image(GeneratedImage {
                format: image::guess_format(&bytes).ok(),
                bytes,
                caption: prompt.into(),
                width,
                height,
            })
        }
        Err(e) => GenerationResult::Failure(FailureReason::Decode(e.to_string())),
    }
}

/// The `error` field is either a string or a list of strings
fn service_error_message(resp: &HttpResponse) -> String {
    let Ok(value) = serde_json::from_slice::<Value>(&resp.body) else {
        return UNKNOWN_ERROR.into();
    };
    match &value["error"] {
        Value::String(msg) => msg.clone(),
        Value::Array(items) => {
            let msgs: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            if msgs.is_empty() {
                UNKNOWN_ERROR.into()
            } else {
                msgs.join("; ")
            }
        }
        _ => UNKNOWN_ERROR.into(),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb, RgbImage};

    use super::*;
    use crate::http::fake::{ScriptedBackend, respond};

    const PROMPT: &str = "A serene lake at sunset";

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([20, 120, 40]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn client(backend: SharedBackend) -> ImgModBox {
        Model::default().make("hf_token".into(), backend, &InferenceSettings::default())
    }

    #[tokio::test]
    async fn loading_model_is_pending_after_one_call() {
        let backend = ScriptedBackend::new([respond(
            MODEL_LOADING_STATUS,
            r#"{"error":"Model is currently loading","estimated_time":20.0}"#,
        )]);

        let result = client(backend.clone()).generate(PROMPT).await;

        assert_eq!(result, GenerationResult::Pending);
        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].body, Some(json!({ "inputs": "" })));
        assert_eq!(calls[0].timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn ready_model_returns_image_with_prompt_caption() {
        let backend = ScriptedBackend::new([respond(200, ""), respond(200, png_bytes(4, 3))]);

        let result = client(backend.clone()).generate(PROMPT).await;

        let GenerationResult::Image(img) = result else {
            panic!("expected an image, got {result:?}");
        };
        assert_eq!(img.caption, PROMPT);
        assert_eq!((img.width, img.height), (4, 3));
        assert_eq!(img.format, Some(ImageFormat::Png));

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        let body = calls[1].body.as_ref().unwrap();
        assert_eq!(body["inputs"], PROMPT);
        assert_eq!(body["parameters"]["num_inference_steps"], 30);
        assert_eq!(body["parameters"]["guidance_scale"], 7.5);
        assert_eq!(calls[1].timeout, Duration::from_secs(30));
        assert_eq!(calls[1].bearer, "hf_token");
    }

    #[tokio::test]
    async fn service_error_field_becomes_reason() {
        let backend = ScriptedBackend::new([
            respond(200, ""),
            respond(500, r#"{"error": "overloaded"}"#),
        ]);

        let result = client(backend).generate(PROMPT).await;

        let GenerationResult::Failure(reason) = result else {
            panic!("expected a failure, got {result:?}");
        };
        assert_eq!(reason, FailureReason::Service("overloaded".into()));
        assert_eq!(reason.to_string(), "overloaded");
    }

    #[tokio::test]
    async fn unparseable_error_body_uses_fallback() {
        let backend = ScriptedBackend::new([
            respond(200, ""),
            respond(502, "<html>Bad Gateway</html>"),
            respond(200, ""),
            respond(400, r#"{"error": ["bad input", "too long"]}"#),
        ]);
        let model = client(backend);

        assert_eq!(
            model.generate(PROMPT).await,
            GenerationResult::Failure(FailureReason::Service(UNKNOWN_ERROR.into()))
        );
        assert_eq!(
            model.generate(PROMPT).await,
            GenerationResult::Failure(FailureReason::Service("bad input; too long".into()))
        );
    }

    #[tokio::test]
    async fn garbage_image_is_a_decode_failure() {
        let backend = ScriptedBackend::new([respond(200, ""), respond(200, "not an image")]);

        let result = client(backend).generate(PROMPT).await;

        assert!(matches!(
            result,
            GenerationResult::Failure(FailureReason::Decode(_))
        ));
    }

    #[tokio::test]
    async fn probe_timeout_skips_generation() {
        let backend = ScriptedBackend::new([Err(TransportError::Timeout)]);

        let result = client(backend.clone()).generate(PROMPT).await;

        assert_eq!(result, GenerationResult::Failure(FailureReason::Timeout));
        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].body, Some(json!({ "inputs": "" })));
    }

    #[tokio::test]
    async fn timeouts_and_transport_faults() {
        let backend = ScriptedBackend::new([
            respond(200, ""),
            Err(TransportError::Timeout),
            Err(TransportError::Other("connection reset".into())),
        ]);
        let model = client(backend.clone());

        let timed_out = model.generate(PROMPT).await;
        assert_eq!(timed_out, GenerationResult::Failure(FailureReason::Timeout));
        assert_eq!(
            model.generate(PROMPT).await,
            GenerationResult::Failure(FailureReason::Transport("connection reset".into()))
        );
        // the failing probe stops the second attempt before generation
        assert_eq!(backend.calls().len(), 3);
    }
}
