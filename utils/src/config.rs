use std::path::PathBuf;

use anyhow::Context;
use mixtrain::TrainConfig;
use structopt::StructOpt;

/// Checks a config file, or prints the default config when none is given.
#[derive(StructOpt)]
pub struct ConfigOptions {
    #[structopt(short, long)]
    input: Option<PathBuf>,
}

impl ConfigOptions {
    pub fn run(&self) -> anyhow::Result<()> {
        match &self.input {
            Some(path) => {
                let config = TrainConfig::load(path)
                    .with_context(|| format!("Invalid config: {}", path.display()))?;

                mixtrain::logger::set_colour(config.colour);
                config.display();
                println!("Config is valid.");
            }
            None => {
                let text = toml::to_string_pretty(&TrainConfig::default())
                    .with_context(|| "Failed to serialise default config.")?;
                print!("{text}");
            }
        }

        Ok(())
    }
}
