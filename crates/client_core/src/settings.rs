use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_SETTINGS_FILE: &str = "tracker.toml";
/// Session flag location, relative to the working directory like the settings file.
pub const DEFAULT_SESSION_FILE: &str = ".tracker_session.json";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub api_url: String,
    pub page_size: u32,
    pub prefetch_rows: usize,
    pub session_file: Option<PathBuf>,
    pub request_timeout_secs: u64,
    pub carousel_tick_ms: u64,
    pub carousel_step: f64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080".into(),
            page_size: 50,
            prefetch_rows: 20,
            session_file: Some(PathBuf::from(DEFAULT_SESSION_FILE)),
            request_timeout_secs: 15,
            carousel_tick_ms: 25,
            carousel_step: 0.5,
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn carousel_period(&self) -> Duration {
        Duration::from_millis(self.carousel_tick_ms)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    page_size: Option<u32>,
    prefetch_rows: Option<usize>,
    session_file: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
    carousel_tick_ms: Option<u64>,
    carousel_step: Option<f64>,
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

/// Defaults, then the TOML file at `path` if it exists, then env overrides.
pub fn load_settings_from(path: &Path) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file_settings(&mut settings, file_cfg),
            Err(err) => warn!(path = %path.display(), "ignoring unreadable settings file: {err}"),
        }
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    sanitize(&mut settings);
    settings
}

fn apply_file_settings(settings: &mut ClientSettings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file_cfg.page_size {
        settings.page_size = v;
    }
    if let Some(v) = file_cfg.prefetch_rows {
        settings.prefetch_rows = v;
    }
    if let Some(v) = file_cfg.session_file {
        settings.session_file = Some(v);
    }
    if let Some(v) = file_cfg.request_timeout_secs {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.carousel_tick_ms {
        settings.carousel_tick_ms = v;
    }
    if let Some(v) = file_cfg.carousel_step {
        settings.carousel_step = v;
    }
}

fn apply_env_overrides(settings: &mut ClientSettings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("TRACKER_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = var("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(parsed) = var("APP__PAGE_SIZE").and_then(|v| v.parse().ok()) {
        settings.page_size = parsed;
    }
    if let Some(parsed) = var("APP__PREFETCH_ROWS").and_then(|v| v.parse().ok()) {
        settings.prefetch_rows = parsed;
    }
    if let Some(v) = var("APP__SESSION_FILE") {
        settings.session_file = Some(PathBuf::from(v));
    }
    if let Some(parsed) = var("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = parsed;
    }
}

fn sanitize(settings: &mut ClientSettings) {
    if settings.page_size == 0 {
        warn!("page_size must be positive; falling back to default");
        settings.page_size = ClientSettings::default().page_size;
    }
    if settings.carousel_tick_ms == 0 {
        settings.carousel_tick_ms = ClientSettings::default().carousel_tick_ms;
    }
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
