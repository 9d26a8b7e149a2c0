//! # Runtime Configuration Module
//!
//! Environment-driven settings for the listener and the coroutine runtime.
//!
//! ## Environment Variables
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `FUNCTIONS_CUSTOMHANDLER_PORT` | `9081` | listen port |
//! | `RESTROUTE_BIND_HOST` | `0.0.0.0` | listen host |
//! | `RESTROUTE_STACK_SIZE` | `0x10000` | coroutine stack size, decimal or `0x` hex |
//! | `RESTROUTE_MAX_FORM_MEMORY` | `262144` | bound on non-file multipart fields |
//! | `RESTROUTE_CORS` | `true` | wrap the service in the allow-all CORS policy |
//!
//! Unparseable values fall back to the default and are logged at `warn`.
//!
//! ```rust
//! use restroute::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_lookup(|key| match key {
//!     "FUNCTIONS_CUSTOMHANDLER_PORT" => Some("8080".to_string()),
//!     "RESTROUTE_STACK_SIZE" => Some("0x8000".to_string()),
//!     _ => None,
//! });
//! assert_eq!(config.listen_addr(), "0.0.0.0:8080");
//! assert_eq!(config.stack_size, 0x8000);
//! ```

use crate::server::request::{NormalizeConfig, DEFAULT_MAX_FORM_MEMORY};
use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 9081;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_STACK_SIZE: usize = 0x10000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub host: String,
    pub port: u16,
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
    pub max_form_memory: usize,
    pub cors: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            stack_size: DEFAULT_STACK_SIZE,
            max_form_memory: DEFAULT_MAX_FORM_MEMORY,
            cors: true,
        }
    }
}

/// Parse a size given in decimal or `0x`-prefixed hex.
#[must_use]
pub fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

fn parsed<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };
    raw.trim().parse().unwrap_or_else(|_| {
        warn!(variable = key, value = %raw, "Ignoring unparseable setting");
        default
    })
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let stack_size = match lookup("RESTROUTE_STACK_SIZE") {
            Some(raw) => parse_size(&raw).unwrap_or_else(|| {
                warn!(
                    variable = "RESTROUTE_STACK_SIZE",
                    value = %raw,
                    "Ignoring unparseable setting"
                );
                defaults.stack_size
            }),
            None => defaults.stack_size,
        };

        Self {
            host: lookup("RESTROUTE_BIND_HOST")
                .filter(|h| !h.trim().is_empty())
                .unwrap_or(defaults.host),
            port: parsed(
                "FUNCTIONS_CUSTOMHANDLER_PORT",
                lookup("FUNCTIONS_CUSTOMHANDLER_PORT"),
                defaults.port,
            ),
            stack_size,
            max_form_memory: parsed(
                "RESTROUTE_MAX_FORM_MEMORY",
                lookup("RESTROUTE_MAX_FORM_MEMORY"),
                defaults.max_form_memory,
            ),
            cors: parsed("RESTROUTE_CORS", lookup("RESTROUTE_CORS"), defaults.cors),
        }
    }

    /// `host:port` to bind.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    #[must_use]
    pub fn normalize_config(&self) -> NormalizeConfig {
        NormalizeConfig {
            max_form_memory: self.max_form_memory,
        }
    }
}
