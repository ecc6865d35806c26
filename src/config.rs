//! Configuration management for readmark

use serde::Deserialize;
use std::env;

use crate::error::{ReaderError, Result};

/// Default number of context characters captured on each side of a quote
pub const DEFAULT_CONTEXT_CHARS: usize = 32;

/// Default highlight color
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "yellow";

#[derive(Debug, Clone, Deserialize)]
pub struct ReaderConfig {
    pub remote: RemoteConfig,
    pub anchor: AnchorConfig,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// GraphQL endpoint of the remote store
    pub endpoint: String,
    /// Opaque value passed through as the `Authorization` header
    pub api_token: Option<String>,
    pub timeout_secs: u64,
    /// Number of articles kept by the cache-first article cache
    pub cache_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnchorConfig {
    /// Maximum characters of prefix/suffix context
    pub context_chars: usize,
    pub default_color: String,
}

/// Display options owned by the settings provider.
///
/// Opaque to the anchoring core; carried so the renderer can be configured
/// from the same place.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplaySettings {
    pub font_size: u8,
    pub columns: u8,
    pub padding: String,
    pub justify: bool,
}

impl Default for AnchorConfig {
    fn default() -> Self {
        AnchorConfig {
            context_chars: DEFAULT_CONTEXT_CHARS,
            default_color: DEFAULT_HIGHLIGHT_COLOR.to_string(),
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        DisplaySettings {
            font_size: 1,
            columns: 1,
            padding: "p-2".to_string(),
            justify: false,
        }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            remote: RemoteConfig {
                endpoint: "http://localhost:4000/api/graphql".to_string(),
                api_token: None,
                timeout_secs: 30,
                cache_capacity: 32,
            },
            anchor: AnchorConfig::default(),
            display: DisplaySettings::default(),
        }
    }
}

impl ReaderConfig {
    /// Load configuration from `READMARK_*` environment variables.
    ///
    /// The endpoint is required; everything else falls back to defaults.
    pub fn from_env() -> Result<Self> {
        let defaults = ReaderConfig::default();

        Ok(ReaderConfig {
            remote: RemoteConfig {
                endpoint: env::var("READMARK_ENDPOINT")
                    .map_err(|e| ReaderError::Config(format!("READMARK_ENDPOINT: {}", e)))?,
                api_token: env::var("READMARK_API_TOKEN").ok(),
                timeout_secs: parse_var("READMARK_TIMEOUT_SECS", defaults.remote.timeout_secs)?,
                cache_capacity: parse_var("READMARK_CACHE_CAPACITY", defaults.remote.cache_capacity)?,
            },
            anchor: AnchorConfig {
                context_chars: parse_var("READMARK_CONTEXT_CHARS", defaults.anchor.context_chars)?,
                default_color: env::var("READMARK_HIGHLIGHT_COLOR")
                    .unwrap_or(defaults.anchor.default_color),
            },
            display: DisplaySettings {
                font_size: parse_var("READMARK_FONT_SIZE", defaults.display.font_size)?,
                columns: parse_var("READMARK_COLUMNS", defaults.display.columns)?,
                padding: env::var("READMARK_PADDING").unwrap_or(defaults.display.padding),
                justify: parse_var("READMARK_JUSTIFY", defaults.display.justify)?,
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ReaderError::Config(format!("{} has invalid value {:?}", name, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReaderConfig::default();
        assert_eq!(config.anchor.context_chars, 32);
        assert_eq!(config.anchor.default_color, "yellow");
        assert_eq!(config.display.columns, 1);
        assert!(config.remote.api_token.is_none());
    }

    #[test]
    fn test_parse_var_falls_back_when_unset() {
        let value: usize = parse_var("READMARK_TEST_SURELY_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }
}
