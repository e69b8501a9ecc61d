//! Utility functions for CLI commands.

use std::time::Duration;

use vfifo::{Config, Device};

use crate::Cli;

/// Loads the config file, if any, and applies flag overrides.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut cfg = match cli.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(capacity) = cli.capacity {
        cfg = cfg.with_capacity(capacity);
    }
    if let Some(interval_ms) = cli.interval_ms {
        cfg = cfg.with_interval(Duration::from_millis(interval_ms));
    }
    if let Some(payload) = &cli.payload {
        cfg = cfg.with_payload(payload.as_str());
    }

    cfg.validate()?;
    Ok(cfg)
}

/// Creates a device from the effective configuration.
pub fn create_device(cli: &Cli) -> anyhow::Result<Device> {
    let cfg = get_config(cli)?;
    print_verbose(
        cli,
        &format!(
            "Device: capacity={} interval={}ms payload={:?}",
            cfg.capacity, cfg.interval_ms, cfg.payload
        ),
    );
    Ok(Device::new(cfg)?)
}

/// Prints verbose output.
pub fn print_verbose(cli: &Cli, msg: &str) {
    if cli.verbose {
        eprintln!("[verbose] {}", msg);
    }
}
