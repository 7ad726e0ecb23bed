//! Runtime configuration for the club membership server.

use once_cell::sync::Lazy;
use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Postgres connection string. `None` runs on the in-memory store.
    pub database_url: Option<String>,
    /// Address the HTTP server binds to.
    pub server_addr: String,
    /// HMAC secret for access tokens (at least 32 bytes).
    pub jwt_secret: String,
    /// Access-token lifetime (seconds).
    pub jwt_ttl_secs: i64,
    /// Postgres pool size.
    pub db_max_connections: u32,
    /// How many times an operation is retried after a serialization failure.
    pub tx_retry_attempts: usize,
    /// Reject free clubs with a price and paid clubs without one.
    pub strict_pricing: bool,
    /// Allow `role: ADMIN` in registration requests.
    pub allow_admin_signup: bool,
}

impl Settings {
    fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; unset or unparsable
    /// values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());

        let server_addr = lookup("SERVER_ADDR").unwrap_or_else(|| "127.0.0.1:8080".into());

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_default();

        let jwt_ttl_secs = lookup("JWT_TTL_SECS")
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(24 * 3_600);

        let db_max_connections = lookup("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(5);

        let tx_retry_attempts = lookup("TX_RETRY_ATTEMPTS")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(3);

        let strict_pricing = lookup("STRICT_PRICING")
            .and_then(|v| parse_flag(&v))
            .unwrap_or(true);

        let allow_admin_signup = lookup("ALLOW_ADMIN_SIGNUP")
            .and_then(|v| parse_flag(&v))
            .unwrap_or(false);

        Settings {
            database_url,
            server_addr,
            jwt_secret,
            jwt_ttl_secs,
            db_max_connections,
            tx_retry_attempts,
            strict_pricing,
            allow_admin_signup,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

static SETTINGS: Lazy<Settings> = Lazy::new(Settings::from_env);

pub fn settings() -> &'static Settings {
    &SETTINGS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let s = Settings::from_lookup(|_| None);
        assert!(s.database_url.is_none());
        assert_eq!(s.server_addr, "127.0.0.1:8080");
        assert_eq!(s.jwt_ttl_secs, 86_400);
        assert_eq!(s.tx_retry_attempts, 3);
        assert!(s.strict_pricing);
        assert!(!s.allow_admin_signup);
    }

    #[test]
    fn overrides_and_bad_values() {
        let s = Settings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/clubs"),
            ("JWT_TTL_SECS", "-5"),
            ("DB_MAX_CONNECTIONS", "12"),
            ("STRICT_PRICING", "off"),
            ("ALLOW_ADMIN_SIGNUP", "maybe"),
        ]));
        assert_eq!(s.database_url.as_deref(), Some("postgres://localhost/clubs"));
        assert_eq!(s.jwt_ttl_secs, 86_400);
        assert_eq!(s.db_max_connections, 12);
        assert!(!s.strict_pricing);
        assert!(!s.allow_admin_signup);
    }

    #[test]
    fn blank_database_url_means_memory() {
        let s = Settings::from_lookup(lookup_from(&[("DATABASE_URL", "  ")]));
        assert!(s.database_url.is_none());
    }
}
