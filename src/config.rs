use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::viz::ImageOptions;

/// Application configuration, loaded from `easydash.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub title: String,
    pub host: String,
    pub port: u16,
    /// Print resolved bindings for every `auto_callback` registration.
    pub debug: bool,
    pub log_dir: String,
    /// Path prefix the browser uses to reach the app, e.g. behind a proxy.
    pub requests_pathname_prefix: String,
    /// Skip external stylesheets so the app works without network access.
    pub serve_locally: bool,
    pub external_stylesheets: Vec<String>,
    pub image: ImageOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "EasyDash".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8050,
            debug: false,
            log_dir: "logs".to_string(),
            requests_pathname_prefix: "/".to_string(),
            serve_locally: false,
            external_stylesheets: vec!["https://codepen.io/chriddyp/pen/bWLwgP.css".to_string()],
            image: ImageOptions::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration with the chain: `./easydash.toml` -> `~/easydash.toml` -> defaults,
    /// then apply `EASYDASH_*` environment overrides.
    pub fn load() -> Self {
        let mut cfg = Self::load_file();
        cfg.apply_env_overrides(|key| std::env::var(key).ok());
        cfg
    }

    fn load_file() -> Self {
        let candidates = Self::config_paths();
        for path in &candidates {
            if let Ok(contents) = fs::read_to_string(path) {
                match toml::from_str::<AppConfig>(&contents) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: failed to parse {}: {}", path.display(), e);
                    }
                }
            }
        }
        Self::default()
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("easydash.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join("easydash.toml"));
        }
        paths
    }

    /// `EASYDASH_HOST`, `EASYDASH_PORT` and `EASYDASH_DEBUG` win over the file.
    /// Unparseable values are reported and ignored.
    pub fn apply_env_overrides<F: Fn(&str) -> Option<String>>(&mut self, var: F) {
        if let Some(host) = var("EASYDASH_HOST") {
            self.host = host;
        }
        if let Some(port) = var("EASYDASH_PORT") {
            match port.parse() {
                Ok(p) => self.port = p,
                Err(e) => eprintln!("Warning: ignoring EASYDASH_PORT={}: {}", port, e),
            }
        }
        if let Some(debug) = var("EASYDASH_DEBUG") {
            self.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
    }

    /// The pathname prefix normalized to start and end with `/`.
    pub fn pathname_prefix(&self) -> String {
        let trimmed = self.requests_pathname_prefix.trim_matches('/');
        if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", trimmed)
        }
    }
}
