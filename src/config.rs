//! Configuration management
//!
//! Loads configuration from config.toml with support for:
//! - Server binding settings
//! - Session token signing (app name, TTL, secret)
//! - Storage backend selection
//! - Bounty board limits

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub bounties: BountyRules,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Request body cap; images arrive inline as data URLs
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_max_body_bytes() -> usize {
    // Five base64-encoded 10 MB images plus the surrounding JSON
    72 * 1024 * 1024
}

/// Wallet authentication and session token settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Name embedded in the challenge message
    pub app_name: String,
    /// Session token lifetime
    pub token_ttl_days: i64,
    /// HMAC secret for session tokens (JWT_SECRET env var takes precedence)
    #[serde(default)]
    pub jwt_secret: String,
}

/// Database configuration (DATABASE_URL selects PostgreSQL instead)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub sqlite_path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "sleuth.db".to_string(),
        }
    }
}

/// Limits enforced by the lifecycle engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BountyRules {
    pub min_bounty_amount: f64,
    pub max_title_len: usize,
    pub max_solution_images: usize,
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl Default for BountyRules {
    fn default() -> Self {
        Self {
            min_bounty_amount: 0.1,
            max_title_len: 100,
            max_solution_images: 5,
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl Config {
    /// Load from config.toml or use defaults
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load from specific path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            toml::from_str(DEFAULT_CONFIG).context("Failed to parse default config")
        }
    }

    /// Bind host (SLEUTH_HOST overrides)
    pub fn host(&self) -> String {
        env_non_empty("SLEUTH_HOST").unwrap_or_else(|| self.server.host.clone())
    }

    /// Bind port (SLEUTH_PORT overrides when it parses)
    pub fn port(&self) -> u16 {
        std::env::var("SLEUTH_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(self.server.port)
    }

    /// Token secret (env var takes precedence, None if neither is set)
    pub fn jwt_secret(&self) -> Option<String> {
        match env_non_empty("JWT_SECRET") {
            Some(secret) => Some(secret),
            None if self.auth.jwt_secret.is_empty() => None,
            None => Some(self.auth.jwt_secret.clone()),
        }
    }

    /// PostgreSQL URL, if the server should use PostgreSQL
    pub fn database_url(&self) -> Option<String> {
        env_non_empty("DATABASE_URL")
    }

    /// SQLite file used when no DATABASE_URL is configured
    pub fn sqlite_path(&self) -> String {
        env_non_empty("SQLITE_PATH").unwrap_or_else(|| self.database.sqlite_path.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        // The embedded config is checked by the test below
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|_| Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                max_body_bytes: default_max_body_bytes(),
            },
            auth: AuthConfig {
                app_name: "TrapCard".to_string(),
                token_ttl_days: 7,
                jwt_secret: String::new(),
            },
            database: DatabaseConfig::default(),
            bounties: BountyRules::default(),
        })
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_default_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.auth.app_name, "TrapCard");
        assert_eq!(config.auth.token_ttl_days, 7);
        assert_eq!(config.bounties.max_solution_images, 5);
        assert!((config.bounties.min_bounty_amount - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let config = Config::load_from("/nonexistent/sleuth-config.toml").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.sqlite_path, "sleuth.db");
    }

    #[test]
    fn test_optional_sections_default() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [auth]
            app_name = "PumpSleuth"
            token_ttl_days = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.bounties.max_title_len, 100);
        assert_eq!(config.server.max_body_bytes, 72 * 1024 * 1024);
        assert!(config.auth.jwt_secret.is_empty());
    }
}
