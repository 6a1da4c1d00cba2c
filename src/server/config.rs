//! Configuration loading for readaloudd.
//!
//! Configuration is loaded from TOML with the following resolution order:
//! 1. `--config <path>` (CLI flag; must exist)
//! 2. `~/.readaloud/config.toml` (user)
//! 3. `/etc/readaloud/config.toml` (system)
//! 4. built-in defaults
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.readaloud/secrets.toml` (user, must be 0600)
//! 2. `/etc/readaloud/secrets.toml` (system, must be 0600)
//!
//! Each secret falls back to its environment variable.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::auth::{AuthRole, TokenTable};
use crate::batch::DEFAULT_ITEM_DELAY;
use crate::gateway::AiConfig;
use crate::gateway::config::ENV_API_KEY;
use crate::{ReadaloudError, Result};

#[cfg(feature = "supabase")]
use crate::store::SupabaseConfig;

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ai: AiSection,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:8787).
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:8787".to_string()
}

/// Overrides for the chat-completion provider. Unset fields come from the
/// environment, then from the built-in defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AiSection {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub text_model: Option<String>,
    #[serde(default)]
    pub vision_model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BatchConfig {
    /// Pause between model calls in a batch run (default: 2000).
    #[serde(default = "default_item_delay_ms")]
    pub item_delay_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            item_delay_ms: default_item_delay_ms(),
        }
    }
}

impl BatchConfig {
    pub fn item_delay(&self) -> Duration {
        Duration::from_millis(self.item_delay_ms)
    }
}

fn default_item_delay_ms() -> u64 {
    DEFAULT_ITEM_DELAY.as_millis() as u64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Supabase,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Project URL; falls back to `SUPABASE_URL`.
    #[serde(default)]
    pub url: Option<String>,
    /// Bucket for page images; falls back to `SUPABASE_BUCKET`.
    #[serde(default)]
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub token: String,
    #[serde(default)]
    pub role: AuthRole,
}

/// Secrets (API keys).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub openai: Option<ApiKeySecret>,
    #[serde(default)]
    pub supabase: Option<ServiceKeySecret>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceKeySecret {
    pub service_key: String,
}

const ENV_SUPABASE_SERVICE_KEY: &str = "SUPABASE_SERVICE_KEY";

impl Config {
    /// Load configuration from the standard locations, or defaults when no
    /// file exists.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ReadaloudError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            ReadaloudError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(ReadaloudError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".readaloud").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = PathBuf::from("/etc/readaloud/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Provider settings: this file, then the environment, then defaults.
    pub fn ai_config(&self, secrets: &Secrets) -> AiConfig {
        self.ai_config_with(secrets, |name| std::env::var(name).ok())
    }

    /// Same as [`ai_config`](Self::ai_config) with an injectable env lookup.
    pub fn ai_config_with(
        &self,
        secrets: &Secrets,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> AiConfig {
        let env = AiConfig::from_lookup(&lookup);
        AiConfig {
            api_key: secrets.openai_api_key_with(&lookup),
            base_url: self.ai.base_url.clone().unwrap_or(env.base_url),
            text_model: self.ai.text_model.clone().unwrap_or(env.text_model),
            vision_model: self.ai.vision_model.clone().unwrap_or(env.vision_model),
        }
    }

    pub fn token_table(&self) -> TokenTable {
        TokenTable::new(
            self.auth
                .tokens
                .iter()
                .map(|t| (t.token.clone(), t.role)),
        )
    }

    /// Supabase connection settings, or an error naming what is missing.
    #[cfg(feature = "supabase")]
    pub fn supabase_config(&self, secrets: &Secrets) -> Result<SupabaseConfig> {
        use crate::store::supabase::{DEFAULT_BUCKET, ENV_BUCKET, ENV_URL};

        let env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        let url = self.storage.url.clone().or_else(|| env(ENV_URL)).ok_or_else(|| {
            ReadaloudError::Configuration(format!(
                "storage.backend is \"supabase\" but neither storage.url nor {ENV_URL} is set"
            ))
        })?;
        let service_key = secrets.supabase_service_key().ok_or_else(|| {
            ReadaloudError::Configuration(format!(
                "storage.backend is \"supabase\" but no service key; set {ENV_SUPABASE_SERVICE_KEY}"
            ))
        })?;
        let bucket = self
            .storage
            .bucket
            .clone()
            .or_else(|| env(ENV_BUCKET))
            .unwrap_or_else(|| DEFAULT_BUCKET.to_string());
        Ok(SupabaseConfig {
            url,
            service_key,
            bucket,
        })
    }
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists (keys may come from env vars).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".readaloud").join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/readaloud/secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load one secrets file after checking its permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            ReadaloudError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            ReadaloudError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Reject secrets files readable by group or others.
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            ReadaloudError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        if mode & 0o077 != 0 {
            return Err(ReadaloudError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// OpenAI key from the secrets file, else `OPENAI_API_KEY`.
    pub fn openai_api_key(&self) -> Option<String> {
        self.openai_api_key_with(|name| std::env::var(name).ok())
    }

    /// Same as [`openai_api_key`](Self::openai_api_key) with an injectable env lookup.
    pub fn openai_api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        self.openai
            .as_ref()
            .map(|s| s.api_key.clone())
            .or_else(|| lookup(ENV_API_KEY))
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    /// Supabase service key from the secrets file, else `SUPABASE_SERVICE_KEY`.
    pub fn supabase_service_key(&self) -> Option<String> {
        self.supabase
            .as_ref()
            .map(|s| s.service_key.clone())
            .or_else(|| std::env::var(ENV_SUPABASE_SERVICE_KEY).ok())
    }
}
