//! # Runtime Configuration Module
//!
//! Settings for the transport and coroutine runtime, loaded from a YAML file
//! and/or environment variables (environment wins).
//!
//! ## Environment Variables
//!
//! - `SPRIG_HOST` - bind address (default `127.0.0.1`)
//! - `SPRIG_PORT` - bind port (default `3000`)
//! - `SPRIG_STACK_SIZE` - coroutine stack size, decimal (`65536`) or hex
//!   (`0x10000`); default `0x10000`
//! - `SPRIG_STATIC_DIR` - directory served for unmatched `GET` requests
//! - `SPRIG_SPA` - serve `index.html` for unknown static paths
//!
//! ## Usage
//!
//! ```rust
//! use sprig::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Listening on {}", config.addr());
//! ```
//!
//! Stack size trades memory for call depth: total memory is roughly
//! `stack_size × concurrent coroutines`. Too small overflows on deep
//! handlers.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

/// Runtime configuration for the transport and coroutine scheduler
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub host: String,
    pub port: u16,
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
    pub static_dir: Option<PathBuf>,
    pub spa: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            stack_size: DEFAULT_STACK_SIZE,
            static_dir: None,
            spa: false,
        }
    }
}

/// Parse `16384` or `0x4000`
#[must_use]
pub fn parse_stack_size(raw: &str) -> Option<usize> {
    let raw = raw.trim();
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

impl RuntimeConfig {
    /// Defaults overridden by environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load a YAML file; missing keys keep their defaults
    ///
    /// # Errors
    ///
    /// When the file cannot be read or is not valid YAML for this shape.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// # Errors
    ///
    /// When `text` is not valid YAML for this shape.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Override fields from `SPRIG_*` variables. Unparseable values are
    /// ignored.
    pub fn apply_env(&mut self) {
        self.apply_vars(|name| env::var(name).ok());
    }

    fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("SPRIG_HOST").filter(|h| !h.is_empty()) {
            self.host = host;
        }
        if let Some(port) = var("SPRIG_PORT").and_then(|p| p.trim().parse().ok()) {
            self.port = port;
        }
        if let Some(size) = var("SPRIG_STACK_SIZE").and_then(|s| parse_stack_size(&s)) {
            self.stack_size = size;
        }
        if let Some(dir) = var("SPRIG_STATIC_DIR").filter(|d| !d.is_empty()) {
            self.static_dir = Some(PathBuf::from(dir));
        }
        if let Some(spa) = var("SPRIG_SPA") {
            self.spa = matches!(spa.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
    }

    /// `host:port`
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_parse_stack_size() {
        assert_eq!(parse_stack_size("16384"), Some(16384));
        assert_eq!(parse_stack_size("0x4000"), Some(0x4000));
        assert_eq!(parse_stack_size(" 0X10 "), Some(16));
        assert_eq!(parse_stack_size("lots"), None);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("SPRIG_PORT", "8080"),
            ("SPRIG_STACK_SIZE", "0x8000"),
            ("SPRIG_STATIC_DIR", "public"),
            ("SPRIG_SPA", "true"),
            ("SPRIG_HOST", ""),
        ]);
        let mut config = RuntimeConfig::default();
        config.apply_vars(|name| vars.get(name).map(ToString::to_string));

        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, 8080);
        assert_eq!(config.stack_size, 0x8000);
        assert_eq!(config.static_dir, Some(PathBuf::from("public")));
        assert!(config.spa);
    }

    #[test]
    fn test_invalid_env_values_are_ignored() {
        let mut config = RuntimeConfig::default();
        config.apply_vars(|name| (name == "SPRIG_PORT").then(|| "http".to_string()));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_yaml_file_with_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port: 9090\nstatic_dir: ./assets").unwrap();

        let config = RuntimeConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.stack_size, DEFAULT_STACK_SIZE);
        assert_eq!(config.static_dir, Some(PathBuf::from("./assets")));
        assert_eq!(config.addr(), "127.0.0.1:9090");
    }

    #[test]
    fn test_bad_yaml_is_an_error() {
        assert!(RuntimeConfig::from_yaml_str("port: [not a port]").is_err());
        assert_eq!(RuntimeConfig::from_yaml_str("").unwrap(), RuntimeConfig::default());
    }
}
