//! Configuration commands.

use clap::Args;

use super::get_config;
use crate::Cli;

/// Prints the effective configuration as YAML.
#[derive(Args)]
pub struct ConfigCommand {}

impl ConfigCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let cfg = get_config(cli)?;
        print!("{}", cfg.to_yaml()?);
        Ok(())
    }
}
