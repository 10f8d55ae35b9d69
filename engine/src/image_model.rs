use std::{pin::Pin, time::Duration};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use thiserror::Error;

pub mod hf_inference;
pub use hf_inference::HfInference;

use crate::{ImgModBox, http::SharedBackend};

pub const NEGATIVE_PROMPT: &str = "blurry, bad quality, distorted, ugly, bad anatomy";
pub const INFERENCE_BASE_URL: &str = "https://api-inference.huggingface.co/models";

#[derive(
    Debug,
    Clone,
    Copy,
    Display,
    clap::ValueEnum,
    Serialize,
    Deserialize,
    Hash,
    PartialEq,
    Eq,
    EnumIter,
    Default,
)]
pub enum Model {
    #[default]
    #[strum(to_string = "Stable Diffusion 1.5")]
    #[value(name = "sd15")]
    StableDiffusion15,
    #[strum(to_string = "Stable Diffusion 2.1")]
    #[value(name = "sd21")]
    StableDiffusion21,
    #[strum(to_string = "Stable Diffusion XL")]
    #[value(name = "sdxl")]
    StableDiffusionXl,
}

impl Model {
    pub fn repo_id(&self) -> &'static str {
        match self {
            Model::StableDiffusion15 => "runwayml/stable-diffusion-v1-5",
            Model::StableDiffusion21 => "stabilityai/stable-diffusion-2-1",
            Model::StableDiffusionXl => "stabilityai/stable-diffusion-xl-base-1.0",
        }
    }

    pub fn make(
        &self,
        key: String,
        backend: SharedBackend,
        settings: &InferenceSettings,
    ) -> ImgModBox {
        Box::new(HfInference::new(*self, key, backend, settings))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceSettings {
    pub base_url: String,
    pub probe_timeout: Duration,
    pub generate_timeout: Duration,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            base_url: INFERENCE_BASE_URL.into(),
            probe_timeout: Duration::from_secs(10),
            generate_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub inputs: String,
    pub parameters: InferenceParameters,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            inputs: prompt.into(),
            parameters: InferenceParameters::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InferenceParameters {
    pub num_inference_steps: u32,
    pub guidance_scale: f32,
    pub negative_prompt: String,
}

impl Default for InferenceParameters {
    fn default() -> Self {
        Self {
            num_inference_steps: 30,
            guidance_scale: 7.5,
            negative_prompt: NEGATIVE_PROMPT.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Image(GeneratedImage),
    /// The model is still warming up, nothing was generated
    Pending,
    Failure(FailureReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Bytes,
    pub caption: String,
    pub width: u32,
    pub height: u32,
    pub format: Option<image::ImageFormat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    /// The message the service put in the `error` field of its response
    #[error("{0}")]
    Service(String),

    #[error("timed out")]
    Timeout,

    #[error("{0}")]
    Transport(String),

    #[error("could not decode image: {0}")]
    Decode(String),
}

pub trait ImageModel {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = GenerationResult> + Send + 'a>>;

    fn model(&self) -> Model;
}
