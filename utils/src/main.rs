mod config;
mod synthetic;

use structopt::StructOpt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(StructOpt)]
pub enum Options {
    Synthetic(synthetic::SyntheticOptions),
    Config(config::ConfigOptions),
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).try_init()?;

    match Options::from_args() {
        Options::Synthetic(options) => options.run(),
        Options::Config(options) => options.run(),
    }
}
