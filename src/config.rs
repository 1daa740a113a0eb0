use std::env;
use std::time::Duration;

use log::LevelFilter;

use crate::catalog::{clamp_limit, DEFAULT_SEARCH_LIMIT};

pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub database_url: String,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub cors_origins: Vec<String>,
    pub library_url: String,
    pub request_timeout: Duration,
    pub search_limit: u32,
    pub log_level: LevelFilter,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            api_host: lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            api_port: lookup("API_PORT")
                .and_then(|port| port.parse().ok())
                .or_else(|| lookup("PORT").and_then(|port| port.parse().ok()))
                .unwrap_or(8080),
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://music.db?mode=rwc".to_string()),
            spotify_client_id: non_empty("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: non_empty("SPOTIFY_CLIENT_SECRET"),
            cors_origins: lookup("CORS_ORIGINS")
                .unwrap_or_else(|| "http://localhost:5173,http://localhost:5174".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            library_url: lookup("LIBRARY_URL").unwrap_or_else(|| "http://localhost:8080/api".to_string()),
            request_timeout: Duration::from_secs(
                lookup("REQUEST_TIMEOUT_SECS")
                    .and_then(|secs| secs.parse().ok())
                    .unwrap_or(10),
            ),
            search_limit: clamp_limit(
                lookup("SEARCH_LIMIT")
                    .and_then(|limit| limit.parse().ok())
                    .unwrap_or(DEFAULT_SEARCH_LIMIT),
            ),
            log_level: lookup("LOG_LEVEL")
                .and_then(|level| level.parse().ok())
                .unwrap_or(LevelFilter::Info),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }

    /// Both halves of the Spotify credentials, if configured.
    pub fn spotify_credentials(&self) -> Option<(String, String)> {
        match (&self.spotify_client_id, &self.spotify_client_secret) {
            (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.database_url, "sqlite://music.db?mode=rwc");
        assert_eq!(config.library_url, "http://localhost:8080/api");
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.search_limit, 20);
        assert_eq!(config.log_level, LevelFilter::Info);
        assert!(config.spotify_credentials().is_none());
    }

    #[test]
    fn test_overrides_and_fallbacks() {
        let config = config_from(&[
            ("PORT", "9000"),
            ("SEARCH_LIMIT", "500"),
            ("REQUEST_TIMEOUT_SECS", "not-a-number"),
            ("LOG_LEVEL", "debug"),
            ("CORS_ORIGINS", "http://a.test, ,http://b.test"),
            ("SPOTIFY_CLIENT_ID", "id"),
            ("SPOTIFY_CLIENT_SECRET", "secret"),
        ]);

        assert_eq!(config.api_port, 9000);
        assert_eq!(config.search_limit, 50);
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(
            config.spotify_credentials(),
            Some(("id".to_string(), "secret".to_string()))
        );
    }

    #[test]
    fn test_api_port_wins_over_port() {
        let config = config_from(&[("API_PORT", "4000"), ("PORT", "9000")]);
        assert_eq!(config.api_port, 4000);
    }

    #[test]
    fn test_unparseable_api_port_falls_back_to_port() {
        let config = config_from(&[("API_PORT", "http"), ("PORT", "9000")]);
        assert_eq!(config.api_port, 9000);

        let config = config_from(&[("API_PORT", "http"), ("PORT", "also-bad")]);
        assert_eq!(config.api_port, 8080);
    }

    #[test]
    fn test_half_configured_spotify_is_disabled() {
        let config = config_from(&[("SPOTIFY_CLIENT_ID", "id"), ("SPOTIFY_CLIENT_SECRET", " ")]);
        assert!(config.spotify_credentials().is_none());
    }
}
