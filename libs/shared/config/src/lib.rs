use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_url: String,
    pub store_auth_token: String,
    pub store_timeout_secs: u64,
    pub store_reconnect_secs: u64,
    pub session_dir: String,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            store_url: env::var("STORE_URL")
                .unwrap_or_else(|_| {
                    warn!("STORE_URL not set, falling back to in-process store");
                    String::new()
                }),
            store_auth_token: env::var("STORE_AUTH_TOKEN")
                .unwrap_or_else(|_| {
                    warn!("STORE_AUTH_TOKEN not set, using empty value");
                    String::new()
                }),
            store_timeout_secs: parse_secs("STORE_TIMEOUT_SECS", 15),
            store_reconnect_secs: parse_secs("STORE_RECONNECT_SECS", 5),
            session_dir: env::var("SESSION_DIR")
                .unwrap_or_else(|_| {
                    warn!("SESSION_DIR not set, using default");
                    ".clinic-desk".to_string()
                }),
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        };

        if !config.is_configured() {
            warn!("Remote store not configured - appointments will not be shared between desks");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.store_url.is_empty()
    }

    /// Base URL with any trailing slash removed.
    pub fn store_base_url(&self) -> &str {
        self.store_url.trim_end_matches('/')
    }
}

fn parse_secs(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} is not a number ({}), using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_base_url_strips_trailing_slash() {
        let config = AppConfig {
            store_url: "https://clinic.example.app/".to_string(),
            store_auth_token: String::new(),
            store_timeout_secs: 15,
            store_reconnect_secs: 5,
            session_dir: ".clinic-desk".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
        };

        assert!(config.is_configured());
        assert_eq!(config.store_base_url(), "https://clinic.example.app");
    }
}
