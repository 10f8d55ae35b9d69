use std::path::PathBuf;

use engine::image_model::Model;

use crate::context::Config;

/// Turn text descriptions into images with the Hugging Face inference API
#[derive(Debug, Default, clap::Parser)]
#[command(version)]
pub struct Cli {
    /// Text-to-image model to use
    #[arg(short, long, value_enum)]
    pub model: Option<Model>,

    /// Image shown behind the window content
    #[arg(short, long)]
    pub background: Option<PathBuf>,

    /// Read the configuration from this file instead of the default location
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show token diagnostics in the sidebar
    #[arg(long)]
    pub diagnostics: bool,
}

impl Cli {
    /// Flags win over the config file
    pub fn apply(&self, mut cfg: Config) -> Config {
        if let Some(model) = self.model {
            cfg.model = model;
        }
        if let Some(bg) = &self.background {
            cfg.background_image = Some(bg.clone());
        }
        cfg.show_diagnostics |= self.diagnostics;
        cfg
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from(["imagicraft", "--model", "sdxl", "-b", "bg.png"]).unwrap();
        let cfg = cli.apply(Config::default());
        assert_eq!(cfg.model, Model::StableDiffusionXl);
        assert_eq!(cfg.background_image, Some(PathBuf::from("bg.png")));
        assert!(!cfg.show_diagnostics);
    }

    #[test]
    fn no_flags_keep_config() {
        let file_cfg = Config {
            model: Model::StableDiffusion21,
            show_diagnostics: true,
            ..Config::default()
        };
        let cfg = Cli::default().apply(file_cfg.clone());
        assert_eq!(cfg, file_cfg);
    }
}
