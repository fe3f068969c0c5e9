mod config;
mod platform;

use clap::Parser;

use config::{api_key_from_env, AppConfig, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli)?;
    let api_key = api_key_from_env()?;
    platform::run_app(config, api_key, cli.topic)
}
