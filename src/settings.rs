//! Provider configuration resolution.
//!
//! Handles:
//! - Active provider selection
//! - API key lookup (env var → settings file → OS keychain via keyring)
//! - Model / prompt defaults per provider
//! - Writing settings and keys back for the CLI
//!
//! The pipeline only sees the resolved, read-only [`ProviderConfig`].

use crate::error::{OcrError, Result};
use crate::llm::ProviderKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const KEYRING_SERVICE: &str = "glass-ocr";

pub const PROVIDER_ENV: &str = "OCR_PROVIDER";
pub const MODEL_ENV: &str = "OCR_MODEL";
pub const PROMPT_ENV: &str = "OCR_PROMPT";

/// Fully-resolved configuration for one capture session.
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    pub provider: ProviderKind,
    pub api_key: String,
    pub model: String,
    pub prompt: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("prompt_chars", &self.prompt.len())
            .finish()
    }
}

/// Settings file contents. Every field is optional; `apiKey` is the legacy
/// Gemini key from before a second provider existed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qwen_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl StoredSettings {
    fn stored_key(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::Gemini => non_empty(self.api_key.as_deref())
                .or_else(|| non_empty(self.gemini_api_key.as_deref())),
            ProviderKind::Qwen => non_empty(self.qwen_api_key.as_deref()),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Where the pipeline gets its configuration from.
pub trait ConfigSource: Send + Sync {
    fn load(&self) -> Result<ProviderConfig>;
}

/// A fixed configuration, for embedding and tests.
impl ConfigSource for ProviderConfig {
    fn load(&self) -> Result<ProviderConfig> {
        if self.api_key.trim().is_empty() {
            return Err(OcrError::ConfigMissing {
                key_name: self.provider.key_name(),
            });
        }
        Ok(self.clone())
    }
}

/// Resolve a session config from stored settings plus lookups.
///
/// Priority per field: environment, then settings file, then (keys only)
/// the keychain, then the provider default.
pub fn resolve_config(
    stored: &StoredSettings,
    env: impl Fn(&str) -> Option<String>,
    keychain: impl Fn(ProviderKind) -> Option<String>,
) -> Result<ProviderConfig> {
    let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());

    let provider_id = env(PROVIDER_ENV).or_else(|| stored.provider.clone());
    let provider = match provider_id {
        Some(id) => id.parse::<ProviderKind>().unwrap_or_else(|e| {
            log::warn!("[SETTINGS] {}, using gemini", e);
            ProviderKind::Gemini
        }),
        None => ProviderKind::Gemini,
    };

    let api_key = env(provider.env_key())
        .or_else(|| stored.stored_key(provider).map(str::to_string))
        .or_else(|| keychain(provider).filter(|k| !k.trim().is_empty()))
        .ok_or(OcrError::ConfigMissing {
            key_name: provider.key_name(),
        })?;

    let model = env(MODEL_ENV)
        .or_else(|| non_empty(stored.model.as_deref()).map(str::to_string))
        .unwrap_or_else(|| provider.default_model().to_string());

    let prompt = env(PROMPT_ENV)
        .or_else(|| non_empty(stored.prompt.as_deref()).map(str::to_string))
        .unwrap_or_else(|| provider.default_prompt().to_string());

    Ok(ProviderConfig {
        provider,
        api_key: api_key.trim().to_string(),
        model,
        prompt,
    })
}

/// Settings backed by a JSON file, the process environment and the OS keychain.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    use_env: bool,
    use_keychain: bool,
}

impl SettingsStore {
    /// `<config_dir>/glass-ocr/settings.json` with env + keychain lookups.
    pub fn default_location() -> Self {
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("glass-ocr")
            .join("settings.json");
        Self {
            path,
            use_env: true,
            use_keychain: true,
        }
    }

    /// File-only store; ignores env vars and the keychain.
    pub fn file_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            use_env: false,
            use_keychain: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the settings file. Missing or invalid files read as empty.
    pub fn read(&self) -> StoredSettings {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("[SETTINGS] Ignoring invalid {}: {}", self.path.display(), e);
                StoredSettings::default()
            }),
            Err(_) => StoredSettings::default(),
        }
    }

    /// Persist the settings file, creating its directory if needed.
    pub fn write(&self, settings: &StoredSettings) -> std::result::Result<(), String> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create config dir: {}", e))?;
        }
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;
        std::fs::write(&self.path, json)
            .map_err(|e| format!("Failed to write settings: {}", e))?;
        log::info!("[SETTINGS] Saved {}", self.path.display());
        Ok(())
    }

    /// Store a provider key in the settings file, and in the OS keychain
    /// when this store reads from it. Returns whether the keychain took it.
    ///
    /// A Gemini key also clears the legacy `apiKey`, which would otherwise
    /// shadow it.
    pub fn save_api_key(
        &self,
        kind: ProviderKind,
        api_key: &str,
    ) -> std::result::Result<bool, String> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(format!("{} must not be empty", kind.key_name()));
        }

        let mut settings = self.read();
        match kind {
            ProviderKind::Gemini => {
                settings.api_key = None;
                settings.gemini_api_key = Some(api_key.to_string());
            }
            ProviderKind::Qwen => settings.qwen_api_key = Some(api_key.to_string()),
        }
        self.write(&settings)?;

        if !self.use_keychain {
            return Ok(false);
        }
        match save_keychain_key(kind, api_key) {
            Ok(()) => Ok(true),
            Err(e) => {
                log::warn!("[SETTINGS] {}, key kept in settings file only", e);
                Ok(false)
            }
        }
    }

    /// Whether a key for `kind` can be found anywhere this store looks.
    pub fn is_configured(&self, kind: ProviderKind) -> bool {
        let stored = self.read();
        let from_env = self.use_env
            && std::env::var(kind.env_key())
                .map(|k| !k.trim().is_empty())
                .unwrap_or(false);
        from_env
            || stored.stored_key(kind).is_some()
            || (self.use_keychain && keychain_key(kind).is_some())
    }
}

impl ConfigSource for SettingsStore {
    fn load(&self) -> Result<ProviderConfig> {
        let stored = self.read();
        let use_env = self.use_env;
        let use_keychain = self.use_keychain;
        let config = resolve_config(
            &stored,
            |name| {
                if use_env {
                    std::env::var(name).ok()
                } else {
                    None
                }
            },
            |kind| if use_keychain { keychain_key(kind) } else { None },
        )?;
        log::info!(
            "[SETTINGS] Provider: {}, model: {}",
            config.provider,
            config.model
        );
        Ok(config)
    }
}

/// Look up a provider key in the OS keychain.
pub fn keychain_key(kind: ProviderKind) -> Option<String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, kind.id()).ok()?;
    match entry.get_password() {
        Ok(key) if !key.is_empty() => {
            log::info!("[SETTINGS] Loaded {} key from OS keychain", kind);
            Some(key)
        }
        _ => None,
    }
}

/// Save a provider key to the OS keychain.
pub fn save_keychain_key(kind: ProviderKind, api_key: &str) -> std::result::Result<(), String> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, kind.id())
        .map_err(|e| format!("Keyring error: {}", e))?;
    entry
        .set_password(api_key.trim())
        .map_err(|e| format!("Failed to save key: {}", e))?;
    log::info!("[SETTINGS] API key saved for provider: {}", kind);
    Ok(())
}
