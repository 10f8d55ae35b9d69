use std::{fs, path::PathBuf};

use clap::Parser;
use color_eyre::{Result, eyre::bail};
use engine::{
    AppError,
    http::ReqwestBackend,
    image_model::{GenerationResult, InferenceSettings, Model},
    token::{TokenValidator, Validity},
};

/// Generate a single image from the command line
#[derive(clap::Parser)]
struct Arg {
    /// Hugging Face API token (starts with hf_)
    token: String,
    prompt: String,
    #[arg(short, long, value_enum, default_value_t)]
    model: Model,
    #[arg(short, long, default_value = "output.png")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    pretty_env_logger::init();
    let Arg {
        token,
        prompt,
        model,
        out,
    } = Arg::parse();

    let backend = ReqwestBackend::shared();
    let validity = TokenValidator::new(backend.clone()).validate(&token).await;
    if let Validity::Invalid(reason) = validity {
        bail!(AppError::from(reason));
    }

    let client = model.make(token, backend, &InferenceSettings::default());
    match client.generate(&prompt).await {
        GenerationResult::Image(img) => {
            fs::write(&out, &img.bytes)?;
            println!(
                "Saved {}x{} image from {} to {}",
                img.width,
                img.height,
                client.model(),
                out.display()
            );
        }
        GenerationResult::Pending => println!("{}", AppError::ModelWarmingUp),
        GenerationResult::Failure(reason) => bail!(AppError::from(reason)),
    }

    Ok(())
}
