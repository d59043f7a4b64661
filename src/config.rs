use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

const PLACEHOLDER_API_KEY: &str = "PLACEHOLDER_GEMINI_API_KEY";

/// Main configuration structure for gemini-chat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// host:port the proxy listens on
    pub bind: String,
    /// When set, every route except /health requires this bearer token
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub proxy_url: String,
    pub bearer_token: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
            bearer_token: None,
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: PLACEHOLDER_API_KEY.to_string(),
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            timeout_seconds: 60,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            proxy_url: "http://127.0.0.1:3000".to_string(),
            bearer_token: None,
        }
    }
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::debug!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("GEMINI_CHAT_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = Self::from_file(Path::new(&config_path));
        config.apply_overrides(|key| env::var(key).ok());

        // Validate configuration - log warnings but don't fail
        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    /// Parse a YAML config file, falling back to defaults when it is missing or invalid
    pub fn from_file(path: &Path) -> Self {
        if !path.exists() {
            tracing::info!(
                "Config file not found at {} - using defaults",
                path.display()
            );
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to parse config file {}: {} - using defaults",
                        path.display(),
                        e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::error!(
                    "Failed to read config file {}: {} - using defaults",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Apply environment variable overrides. `lookup` is `std::env::var` outside tests.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Gemini overrides
        if let Some(api_key) = lookup("GEMINI_API_KEY") {
            self.gemini.api_key = api_key;
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.gemini.model = model;
        }
        if let Some(base_url) = lookup("GEMINI_BASE_URL") {
            self.gemini.base_url = base_url;
        }
        if let Some(timeout) = lookup("GEMINI_TIMEOUT_SECONDS") {
            match timeout.parse() {
                Ok(secs) => self.gemini.timeout_seconds = secs,
                Err(_) => tracing::warn!("Ignoring invalid GEMINI_TIMEOUT_SECONDS: {}", timeout),
            }
        }

        // Server overrides
        if let Some(bind) = lookup("CHAT_HTTP_BIND") {
            self.server.bind = bind;
        }
        if let Some(token) = lookup("CHAT_BEARER_TOKEN") {
            let token = if token.is_empty() { None } else { Some(token) };
            self.server.bearer_token = token.clone();
            self.client.bearer_token = token;
        }

        // Client overrides
        if let Some(proxy_url) = lookup("CHAT_PROXY_URL") {
            self.client.proxy_url = proxy_url;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.gemini.api_key.is_empty() || self.gemini.api_key == PLACEHOLDER_API_KEY {
            return Err("GEMINI_API_KEY environment variable must be set".into());
        }
        if self.gemini.timeout_seconds == 0 {
            return Err("gemini.timeout_seconds cannot be 0".into());
        }
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(format!(
                "server.bind '{}' is not a valid host:port",
                self.server.bind
            )
            .into());
        }
        Ok(())
    }

    /// Fully qualified generateContent endpoint, without the key
    pub fn generate_content_url(&self) -> String {
        format!(
            "{}/v1/models/{}:generateContent",
            self.gemini.base_url.trim_end_matches('/'),
            self.gemini.model
        )
    }

    /// Get upstream request timeout as Duration
    pub fn get_request_timeout(&self) -> Duration {
        Duration::from_secs(self.gemini.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_fail_validation_without_key() {
        let cfg = Config::default();
        assert!(cfg.validate().is_err());
        assert_eq!(cfg.server.bind, "127.0.0.1:3000");
        assert_eq!(cfg.gemini.model, "gemini-2.5-flash");
    }

    #[test]
    fn test_env_overrides() {
        let mut cfg = Config::default();
        cfg.apply_overrides(lookup_from(&[
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("GEMINI_TIMEOUT_SECONDS", "5"),
            ("CHAT_HTTP_BIND", "0.0.0.0:8080"),
            ("CHAT_BEARER_TOKEN", "tok"),
        ]));
        assert_eq!(cfg.gemini.api_key, "secret");
        assert_eq!(cfg.gemini.model, "gemini-2.0-flash");
        assert_eq!(cfg.get_request_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert_eq!(cfg.server.bearer_token.as_deref(), Some("tok"));
        assert_eq!(cfg.client.bearer_token.as_deref(), Some("tok"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_invalid_timeout_override_is_ignored() {
        let mut cfg = Config::default();
        cfg.apply_overrides(lookup_from(&[("GEMINI_TIMEOUT_SECONDS", "soon")]));
        assert_eq!(cfg.gemini.timeout_seconds, 60);
    }

    #[test]
    fn test_validate_rejects_bad_bind() {
        let mut cfg = Config::default();
        cfg.gemini.api_key = "secret".to_string();
        cfg.server.bind = "not-an-address".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_generate_content_url() {
        let mut cfg = Config::default();
        cfg.gemini.base_url = "http://localhost:9999/".to_string();
        assert_eq!(
            cfg.generate_content_url(),
            "http://localhost:9999/v1/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_from_file_partial_yaml() {
        let dir = std::env::temp_dir().join(format!("gemini-chat-cfg-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(
            file,
            "gemini:\n  api_key: from-file\n  model: m\n  base_url: http://x\n  timeout_seconds: 3"
        )
        .unwrap();

        let cfg = Config::from_file(&path);
        assert_eq!(cfg.gemini.api_key, "from-file");
        assert_eq!(cfg.gemini.timeout_seconds, 3);
        assert_eq!(cfg.server.bind, "127.0.0.1:3000");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_from_file_missing_uses_defaults() {
        let cfg = Config::from_file(Path::new("/definitely/not/here/config.yaml"));
        assert_eq!(cfg.client.proxy_url, "http://127.0.0.1:3000");
    }
}
