//! Device configuration.
//!
//! Configuration is plain YAML:
//!
//! ```yaml
//! capacity: 1024
//! interval_ms: 1000
//! payload: "AUTO "
//! ```
//!
//! Every field is optional and falls back to its default.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VfifoError};

/// Default queue capacity in bytes.
pub const DEFAULT_CAPACITY: usize = 1024;
/// Default producer period in milliseconds.
pub const DEFAULT_INTERVAL_MS: u64 = 1000;
/// Default producer payload.
pub const DEFAULT_PAYLOAD: &str = "AUTO ";

/// Device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Queue capacity in bytes. Fixed for the device's lifetime.
    pub capacity: usize,

    /// Period between producer firings, in milliseconds.
    pub interval_ms: u64,

    /// Bytes appended on each producer firing.
    pub payload: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            capacity: DEFAULT_CAPACITY,
            interval_ms: DEFAULT_INTERVAL_MS,
            payload: DEFAULT_PAYLOAD.to_string(),
        }
    }
}

impl Config {
    /// Parses and validates a YAML document.
    pub fn from_yaml(s: &str) -> Result<Self> {
        let cfg: Config = serde_yaml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads and validates a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Serializes the configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Checks that the configuration describes a usable device.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(VfifoError::InvalidConfig("capacity must be greater than 0".into()));
        }
        if self.interval_ms == 0 {
            return Err(VfifoError::InvalidConfig("interval_ms must be greater than 0".into()));
        }
        if self.payload.is_empty() {
            return Err(VfifoError::InvalidConfig("payload must not be empty".into()));
        }
        Ok(())
    }

    /// Returns the producer period.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the producer interval, rounded up to whole milliseconds.
    ///
    /// Only `Duration::ZERO` maps to `0` and fails validation.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        let ms = interval.as_nanos().div_ceil(1_000_000);
        self.interval_ms = u64::try_from(ms).unwrap_or(u64::MAX);
        self
    }

    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.capacity, 1024);
        assert_eq!(cfg.interval(), Duration::from_secs(1));
        assert_eq!(cfg.payload, "AUTO ");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let cfg = Config::from_yaml("capacity: 8\n").unwrap();
        assert_eq!(cfg.capacity, 8);
        assert_eq!(cfg.interval_ms, DEFAULT_INTERVAL_MS);
        assert_eq!(cfg.payload, DEFAULT_PAYLOAD);
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(matches!(
            Config::from_yaml("capacity: 0\n"),
            Err(VfifoError::InvalidConfig(_))
        ));
        assert!(matches!(
            Config::from_yaml("payload: \"\"\n"),
            Err(VfifoError::InvalidConfig(_))
        ));
        assert!(matches!(
            Config::from_yaml("interval_ms: 0\n"),
            Err(VfifoError::InvalidConfig(_))
        ));
        assert!(matches!(
            Config::from_yaml("capacity: [1]\n"),
            Err(VfifoError::Yaml(_))
        ));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "capacity: 4096\ninterval_ms: 250\npayload: TICK").unwrap();

        let cfg = Config::load(file.path()).unwrap();
        assert_eq!(
            cfg,
            Config::default()
                .with_capacity(4096)
                .with_interval(Duration::from_millis(250))
                .with_payload("TICK")
        );
    }

    #[test]
    fn test_interval_rounds_up_to_millis() {
        let cfg = Config::default().with_interval(Duration::from_micros(300));
        assert_eq!(cfg.interval_ms, 1);
        assert!(cfg.validate().is_ok());

        let cfg = Config::default().with_interval(Duration::from_micros(1500));
        assert_eq!(cfg.interval_ms, 2);

        let cfg = Config::default().with_interval(Duration::from_millis(250));
        assert_eq!(cfg.interval_ms, 250);

        let cfg = Config::default().with_interval(Duration::ZERO);
        assert!(matches!(cfg.validate(), Err(VfifoError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::load("/nonexistent/vfifo.yaml"),
            Err(VfifoError::Io(_))
        ));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let cfg = Config::default().with_capacity(16);
        let yaml = cfg.to_yaml().unwrap();
        assert_eq!(Config::from_yaml(&yaml).unwrap(), cfg);
    }
}
