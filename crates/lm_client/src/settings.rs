use lm_core::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_SETTINGS_PATH: &str = "./.llm-medium/llm-medium.gemini-settings.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

/// Fields to change; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl GeminiSettings {
    pub fn merge(&self, update: SettingsUpdate) -> Self {
        Self {
            api_key: update.api_key.unwrap_or_else(|| self.api_key.clone()),
            model: update.model.unwrap_or_else(|| self.model.clone()),
        }
    }

    pub fn api_key_override(&self) -> Option<String> {
        Some(self.api_key.clone()).filter(|key| !key.is_empty())
    }

    pub fn model_override(&self) -> Option<String> {
        Some(self.model.clone()).filter(|model| !model.is_empty())
    }
}

/// Settings record kept in a single JSON file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `LM_SETTINGS_PATH`, or the default location under the working directory.
    pub fn from_env() -> Self {
        let path = env::var("LM_SETTINGS_PATH")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string());
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable file yields the defaults.
    pub fn load(&self) -> GeminiSettings {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "No stored settings");
                return GeminiSettings::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring invalid settings file");
                GeminiSettings::default()
            }
        }
    }

    pub fn save(&self, settings: &GeminiSettings) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(settings)?)?;
        Ok(())
    }

    /// Merge `update` into the stored record and write it back.
    pub fn update(&self, update: SettingsUpdate) -> Result<GeminiSettings> {
        let merged = self.load().merge(update);
        self.save(&merged)?;
        Ok(merged)
    }
}
