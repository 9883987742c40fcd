use std::path::PathBuf;

use shadematch_client::api::DEFAULT_API_BASE_URL;
use shadematch_core::preprocess::{PreprocessConfig, DEFAULT_MAX_DIMENSION, DEFAULT_QUALITY};

/// Default directory for local state such as the manager unlock record.
pub const DEFAULT_STATE_DIR: &str = ".shadematch";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// CLI configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Backend base URL (default: `http://localhost:8000`).
    pub api_base_url: String,
    /// Password that unlocks the manager commands. Unset means the
    /// manager cannot be unlocked.
    pub manager_password: Option<String>,
    /// Directory holding local state (default: `.shadematch`).
    pub state_dir: PathBuf,
    /// Client-side downscaling applied before analysis uploads.
    pub preprocess: PreprocessConfig,
}

impl CliConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                 |
    /// |----------------------------|-------------------------|
    /// | `API_BASE_URL`             | `http://localhost:8000` |
    /// | `MANAGER_PASSWORD`         | unset                   |
    /// | `SHADEMATCH_STATE_DIR`     | `.shadematch`           |
    /// | `PREPROCESS_MAX_DIMENSION` | `1024`                  |
    /// | `PREPROCESS_QUALITY`       | `0.7`                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = lookup("API_BASE_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let manager_password = lookup("MANAGER_PASSWORD")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let state_dir = lookup("SHADEMATCH_STATE_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));

        let max_dimension: u32 = match lookup("PREPROCESS_MAX_DIMENSION") {
            Some(raw) => raw
                .trim()
                .parse()
                .ok()
                .filter(|v: &u32| *v > 0)
                .ok_or(ConfigError::Invalid {
                    var: "PREPROCESS_MAX_DIMENSION",
                    value: raw,
                    expected: "a positive integer",
                })?,
            None => DEFAULT_MAX_DIMENSION,
        };

        let quality: f32 = match lookup("PREPROCESS_QUALITY") {
            Some(raw) => raw
                .trim()
                .parse()
                .ok()
                .filter(|v: &f32| *v > 0.0 && *v <= 1.0)
                .ok_or(ConfigError::Invalid {
                    var: "PREPROCESS_QUALITY",
                    value: raw,
                    expected: "a number in (0, 1]",
                })?,
            None => DEFAULT_QUALITY,
        };

        Ok(Self {
            api_base_url,
            manager_password,
            state_dir,
            preprocess: PreprocessConfig {
                max_dimension,
                quality,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<CliConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CliConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8000");
        assert!(config.manager_password.is_none());
        assert_eq!(config.state_dir, PathBuf::from(".shadematch"));
        assert_eq!(config.preprocess, PreprocessConfig::default());
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("API_BASE_URL", "http://analysis:9000/"),
            ("MANAGER_PASSWORD", " s3cret "),
            ("SHADEMATCH_STATE_DIR", "/tmp/shade"),
            ("PREPROCESS_MAX_DIMENSION", "512"),
            ("PREPROCESS_QUALITY", "0.9"),
        ])
        .unwrap();
        assert_eq!(config.api_base_url, "http://analysis:9000/");
        assert_eq!(config.manager_password.as_deref(), Some("s3cret"));
        assert_eq!(config.state_dir, PathBuf::from("/tmp/shade"));
        assert_eq!(config.preprocess.max_dimension, 512);
        assert_eq!(config.preprocess.quality, 0.9);
    }

    #[test]
    fn blank_password_is_unset() {
        let config = load(&[("MANAGER_PASSWORD", "   ")]).unwrap();
        assert!(config.manager_password.is_none());
    }

    #[test]
    fn malformed_numbers_rejected() {
        assert_matches!(
            load(&[("PREPROCESS_MAX_DIMENSION", "big")]),
            Err(ConfigError::Invalid { var: "PREPROCESS_MAX_DIMENSION", .. })
        );
        assert_matches!(
            load(&[("PREPROCESS_MAX_DIMENSION", "0")]),
            Err(ConfigError::Invalid { var: "PREPROCESS_MAX_DIMENSION", .. })
        );
        assert_matches!(
            load(&[("PREPROCESS_QUALITY", "1.5")]),
            Err(ConfigError::Invalid { var: "PREPROCESS_QUALITY", .. })
        );
    }
}
