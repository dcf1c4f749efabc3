use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HippoConfig {
    pub service: ServiceConfig,
    pub model: ModelConfig,
    pub search: SearchDefaults,
    pub curate: CurateDefaults,
    pub demo: DemoConfig,
    pub embedding: EmbeddingConfig,
    pub logging: LoggingConfig,
}

/// Where the Hippocampus memory service lives and whose memories we touch.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    /// Overrides every scenario's own agent id when set.
    pub agent_id: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    /// `"bedrock"` or `"anthropic"`.
    pub provider: String,
    pub model_id: String,
    pub region: String,
    pub api_key: Option<String>,
    /// Overrides the provider's default endpoint.
    pub api_url: Option<String>,
    pub max_tokens: u32,
    pub max_tool_rounds: usize,
}

/// Controls filled in when the model omits them from a search call.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct SearchDefaults {
    pub epsilon: f64,
    pub threshold: f64,
    pub top_k: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CurateDefaults {
    pub model_id: String,
    pub bedrock_region: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DemoConfig {
    pub session_pause_secs: u64,
    pub populate_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".into(),
            agent_id: None,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "bedrock".into(),
            model_id: "us.amazon.nova-lite-v1:0".into(),
            region: "us-east-1".into(),
            api_key: None,
            api_url: None,
            max_tokens: 1024,
            max_tool_rounds: 16,
        }
    }
}

impl Default for SearchDefaults {
    fn default() -> Self {
        Self {
            epsilon: 0.3,
            threshold: 0.5,
            top_k: 5,
        }
    }
}

impl Default for CurateDefaults {
    fn default() -> Self {
        Self {
            model_id: "us.amazon.nova-lite-v1:0".into(),
            bedrock_region: "us-east-1".into(),
            timeout_ms: 50,
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            session_pause_secs: 10,
            populate_delay_ms: 200,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_hippo_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "all-MiniLM-L6-v2".into(),
            cache_dir,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl ServiceConfig {
    /// The configured agent id, or `fallback` when none is configured.
    pub fn agent_id_or(&self, fallback: &str) -> String {
        self.agent_id.clone().unwrap_or_else(|| fallback.to_string())
    }
}

/// Returns `~/.hippo/`
pub fn default_hippo_dir() -> PathBuf {
    dirs::home_dir()
        .expect("home directory must exist")
        .join(".hippo")
}

/// Returns the default config file path: `~/.hippo/config.toml`
pub fn default_config_path() -> PathBuf {
    default_hippo_dir().join("config.toml")
}

impl HippoConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            HippoConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides. The provider's own API key
    /// variable is only consulted when no key was configured explicitly.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("HIPPO_API") {
            self.service.base_url = val;
        }
        if let Ok(val) = std::env::var("HIPPO_AGENT_ID") {
            self.service.agent_id = Some(val);
        }
        if let Ok(val) = std::env::var("HIPPO_LOG_LEVEL") {
            self.logging.log_level = val;
        }
        if let Ok(val) = std::env::var("HIPPO_MODEL_PROVIDER") {
            self.model.provider = val;
        }
        if let Ok(val) = std::env::var("HIPPO_MODEL_ID") {
            self.model.model_id = val;
        }

        if self.model.api_key.is_none() {
            let key_var = match self.model.provider.as_str() {
                "anthropic" => Some("ANTHROPIC_API_KEY"),
                "bedrock" => Some("AWS_BEARER_TOKEN_BEDROCK"),
                _ => None,
            };
            if let Some(var) = key_var {
                self.model.api_key = std::env::var(var).ok();
            }
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .expect("home directory must exist")
            .join(rest)
    } else {
        PathBuf::from(path)
    }
}
