use std::{collections::HashMap, fs, time::Duration};

use anyhow::{anyhow, Context};
use tracing::warn;
use url::Url;

pub const SETTINGS_FILE: &str = "practice.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub engine_url: String,
    /// Unset means the client waits for the engine indefinitely.
    pub request_timeout: Option<Duration>,
    pub default_scenario: Option<String>,
    pub log_filter: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            engine_url: "http://127.0.0.1:8000".into(),
            request_timeout: None,
            default_scenario: Some("scenario1".into()),
            log_filter: "info".into(),
        }
    }
}

pub fn load_settings() -> ClientSettings {
    let file = fs::read_to_string(SETTINGS_FILE).ok();
    settings_from_sources(file.as_deref(), |key| std::env::var(key).ok())
}

/// Layers defaults, a flat `key = "value"` TOML table and environment
/// variables, in that order.
pub fn settings_from_sources(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Some(raw) = file {
        match toml::from_str::<HashMap<String, String>>(raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.get("engine_url") {
                    settings.engine_url = v.clone();
                }
                if let Some(v) = file_cfg.get("request_timeout_secs") {
                    apply_timeout(&mut settings, v);
                }
                if let Some(v) = file_cfg.get("default_scenario") {
                    settings.default_scenario = non_empty(v);
                }
                if let Some(v) = file_cfg.get("log_filter") {
                    settings.log_filter = v.clone();
                }
            }
            Err(error) => warn!(%error, file = SETTINGS_FILE, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("ENGINE_URL") {
        settings.engine_url = v;
    }
    if let Some(v) = env("APP__ENGINE_URL") {
        settings.engine_url = v;
    }

    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS") {
        apply_timeout(&mut settings, &v);
    }

    if let Some(v) = env("APP__DEFAULT_SCENARIO") {
        settings.default_scenario = non_empty(&v);
    }

    if let Some(v) = env("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    settings
}

fn apply_timeout(settings: &mut ClientSettings, raw: &str) {
    match raw.trim().parse::<u64>() {
        Ok(0) => settings.request_timeout = None,
        Ok(secs) => settings.request_timeout = Some(Duration::from_secs(secs)),
        Err(_) => warn!(value = raw, "ignoring invalid request timeout"),
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Trims whitespace and trailing slashes and insists on an http(s) URL.
pub fn normalize_engine_url(raw_engine_url: &str) -> anyhow::Result<String> {
    let trimmed = raw_engine_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(ClientSettings::default().engine_url);
    }

    let parsed =
        Url::parse(trimmed).with_context(|| format!("invalid engine url '{raw_engine_url}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(anyhow!(
            "engine url '{raw_engine_url}' must use http or https"
        ));
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
