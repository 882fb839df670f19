//! Configuration module for the agency backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for the admin API (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Base URL of the postcode lookup service
    pub postcode_api_url: String,
    /// Authority used for the current address when lookup fails
    pub default_authority: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("AGENCY_API_PSK").ok();

        let db_path = env::var("AGENCY_DB_PATH")
            .unwrap_or_else(|_| "./data/agency.sqlite".to_string())
            .into();

        let bind_addr = env::var("AGENCY_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid AGENCY_BIND_ADDR format");

        let log_level = env::var("AGENCY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let postcode_api_url = env::var("AGENCY_POSTCODE_API_URL")
            .unwrap_or_else(|_| "https://api.postcodes.io".to_string());

        let default_authority =
            env::var("AGENCY_DEFAULT_AUTHORITY").unwrap_or_else(|_| "Unknown".to_string());

        Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            postcode_api_url,
            default_authority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("AGENCY_API_PSK");
        env::remove_var("AGENCY_DB_PATH");
        env::remove_var("AGENCY_BIND_ADDR");
        env::remove_var("AGENCY_LOG_LEVEL");
        env::remove_var("AGENCY_POSTCODE_API_URL");
        env::remove_var("AGENCY_DEFAULT_AUTHORITY");

        let config = Config::from_env();

        assert!(config.api_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/agency.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.postcode_api_url, "https://api.postcodes.io");
        assert_eq!(config.default_authority, "Unknown");
    }
}
