//! Configuration loading for the devolution engine.
//!
//! Configuration lives at `~/.probate/config.toml` and is entirely
//! optional: a missing or unparseable file degrades to defaults with a
//! warning, never an error. Values may embed `${ENV_VAR}` placeholders,
//! which is the supported way to reference API keys without writing
//! them to disk:
//!
//! ```toml
//! [oracle]
//! endpoint = "https://api.openai.com/v1/chat/completions"
//! model = "chatgpt-4o-latest"
//! api_key = "${OPENAI_API_KEY}"
//! quorum = 5
//!
//! [devolution]
//! checksum = "enforce"
//! region = "AZ"
//! ```

use std::{env, path::PathBuf};

use serde::Deserialize;

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "chatgpt-4o-latest";
pub const DEFAULT_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const DEFAULT_QUORUM: usize = 5;
pub const DEFAULT_PARSE_RETRIES: u32 = 3;
pub const DEFAULT_REGION: &str = "AZ";

#[derive(Debug, Default, Deserialize)]
pub struct ProbateConfig {
    pub oracle: Option<OracleConfig>,
    pub devolution: Option<DevolutionConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OracleConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub quorum: Option<usize>,
    pub parse_retries: Option<u32>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DevolutionConfig {
    /// "warn" (default) logs a checksum mismatch; "enforce" aborts.
    pub checksum: Option<String>,
    pub testator_alive_check: Option<bool>,
    /// Governing region for default-law division.
    pub region: Option<String>,
}

impl ProbateConfig {
    pub fn load() -> Option<Self> {
        let path = config_path()?;
        if !path.exists() {
            return None;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return None;
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                None
            }
        }
    }

    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        self.oracle
            .as_ref()
            .and_then(|o| o.endpoint.as_deref())
            .map(expand_env_vars)
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned())
    }

    #[must_use]
    pub fn model(&self) -> String {
        self.oracle
            .as_ref()
            .and_then(|o| o.model.clone())
            .unwrap_or_else(|| DEFAULT_MODEL.to_owned())
    }

    /// API key after `${VAR}` expansion, falling back to the
    /// conventional environment variable. Empty expansions read as
    /// absent.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        self.oracle
            .as_ref()
            .and_then(|o| o.api_key.as_deref())
            .map(expand_env_vars)
            .filter(|key| !key.is_empty())
            .or_else(|| env::var(DEFAULT_API_KEY_VAR).ok().filter(|key| !key.is_empty()))
    }

    #[must_use]
    pub fn quorum(&self) -> usize {
        self.oracle
            .as_ref()
            .and_then(|o| o.quorum)
            .filter(|&q| q > 0)
            .unwrap_or(DEFAULT_QUORUM)
    }

    #[must_use]
    pub fn parse_retries(&self) -> u32 {
        self.oracle
            .as_ref()
            .and_then(|o| o.parse_retries)
            .unwrap_or(DEFAULT_PARSE_RETRIES)
    }

    #[must_use]
    pub fn max_retries(&self) -> Option<u32> {
        self.oracle.as_ref().and_then(|o| o.max_retries)
    }

    #[must_use]
    pub fn enforce_checksum(&self) -> bool {
        self.devolution
            .as_ref()
            .and_then(|d| d.checksum.as_deref())
            .is_some_and(|mode| mode.eq_ignore_ascii_case("enforce"))
    }

    #[must_use]
    pub fn testator_alive_check(&self) -> bool {
        self.devolution
            .as_ref()
            .and_then(|d| d.testator_alive_check)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn region(&self) -> String {
        self.devolution
            .as_ref()
            .and_then(|d| d.region.clone())
            .unwrap_or_else(|| DEFAULT_REGION.to_owned())
    }
}

pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut i = 0;

    while i < value.len() {
        if value[i..].starts_with("${") {
            let start = i + 2;
            if let Some(end_rel) = value[start..].find('}') {
                let end = start + end_rel;
                let var = &value[start..end];
                if !var.is_empty() {
                    let replacement = env::var(var).unwrap_or_default();
                    out.push_str(&replacement);
                }
                i = end + 1;
                continue;
            }
        }

        let ch = value[i..].chars().next().unwrap_or_default();
        out.push(ch);
        i += ch.len_utf8();
    }

    out
}

fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".probate").join("config.toml"))
}
