use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use editor_core::EditorConfig;
use serde::Deserialize;
use tracing::warn;

pub const SETTINGS_FILE: &str = "paperctl.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub auth_token: Option<String>,
    pub autosave_enabled: bool,
    pub autosave_delay_ms: u64,
    pub history_capacity: usize,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".into(),
            auth_token: None,
            autosave_enabled: true,
            autosave_delay_ms: 30_000,
            history_capacity: 20,
            request_timeout_secs: 30,
        }
    }
}

/// Every key is optional; missing keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    api_base_url: Option<String>,
    auth_token: Option<String>,
    autosave_enabled: Option<bool>,
    autosave_delay_ms: Option<u64>,
    history_capacity: Option<usize>,
    request_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn editor_config(&self) -> EditorConfig {
        EditorConfig::default()
            .with_autosave(self.autosave_enabled)
            .with_autosave_delay(Duration::from_millis(self.autosave_delay_ms))
            .with_history_capacity(self.history_capacity)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = file.auth_token {
            self.auth_token = Some(v);
        }
        if let Some(v) = file.autosave_enabled {
            self.autosave_enabled = v;
        }
        if let Some(v) = file.autosave_delay_ms {
            self.autosave_delay_ms = v;
        }
        if let Some(v) = file.history_capacity {
            self.history_capacity = v;
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout_secs = v;
        }
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(v) = env("PAPERCTL_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = env("APP__API_BASE_URL") {
            self.api_base_url = v;
        }

        if let Some(v) = env("PAPERCTL_TOKEN") {
            self.auth_token = Some(v);
        }
        if let Some(v) = env("APP__AUTH_TOKEN") {
            self.auth_token = Some(v);
        }

        if let Some(v) = env("APP__AUTOSAVE_ENABLED") {
            match v.trim().parse::<bool>() {
                Ok(parsed) => self.autosave_enabled = parsed,
                Err(_) => warn!(value = %v, "ignoring invalid APP__AUTOSAVE_ENABLED"),
            }
        }
        if let Some(v) = env("APP__AUTOSAVE_DELAY_MS") {
            match v.trim().parse::<u64>() {
                Ok(parsed) => self.autosave_delay_ms = parsed,
                Err(_) => warn!(value = %v, "ignoring invalid APP__AUTOSAVE_DELAY_MS"),
            }
        }
        if let Some(v) = env("APP__HISTORY_CAPACITY") {
            match v.trim().parse::<usize>() {
                Ok(parsed) => self.history_capacity = parsed,
                Err(_) => warn!(value = %v, "ignoring invalid APP__HISTORY_CAPACITY"),
            }
        }
        if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
            match v.trim().parse::<u64>() {
                Ok(parsed) => self.request_timeout_secs = parsed,
                Err(_) => warn!(value = %v, "ignoring invalid APP__REQUEST_TIMEOUT_SECS"),
            }
        }
    }
}

pub fn load_settings() -> anyhow::Result<Settings> {
    load_settings_from(Path::new(SETTINGS_FILE), |key| std::env::var(key).ok())
}

/// Defaults, then `path` if it exists, then environment overrides. A settings
/// file that exists but does not parse is an error.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file '{}'", path.display()))?;
        let file: FileSettings = toml::from_str(&raw)
            .with_context(|| format!("invalid settings file '{}'", path.display()))?;
        settings.apply_file(file);
    }
    settings.apply_env(env);

    if settings
        .auth_token
        .as_deref()
        .is_some_and(|token| token.trim().is_empty())
    {
        settings.auth_token = None;
    }
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
