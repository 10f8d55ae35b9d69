use clap::Parser;
use color_eyre::Result;
use imagicraft::{APP_NAME, Gui, cli::Cli, load_config};

pub fn main() -> Result<()> {
    color_eyre::install()?;
    pretty_env_logger::init();
    let cli = Cli::parse();
    let cfg = cli.apply(load_config(cli.config.as_deref())?);
    iced::application(move || Gui::new(cfg.clone()), Gui::update, Gui::view)
        .title(APP_NAME)
        .run()?;
    Ok(())
}
