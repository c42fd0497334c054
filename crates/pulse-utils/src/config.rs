//! Logging configuration

use serde::{Deserialize, Serialize};

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable single-line output
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

/// Logging configuration shared by the workspace binaries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub default_filter: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_filter: "warn,pulse_data=info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl LogConfig {
    /// Replace the fallback filter directive
    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    /// Switch to JSON output
    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.default_filter, "warn,pulse_data=info");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_builder_methods() {
        let config = LogConfig::default().with_default_filter("debug").json();
        assert_eq!(config.default_filter, "debug");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn test_format_serde() {
        let json = serde_json::to_string(&LogFormat::Json).unwrap();
        assert_eq!(json, "\"json\"");
    }
}
