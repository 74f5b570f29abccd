use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://mealmatch.db?mode=rwc";

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub admin_email: String,
    pub admin_password: String,
    pub admin_name: String,
    pub rakuten_application_id: Option<String>,
    pub production: bool,
    pub session_ttl_days: i64,
    pub session_sweep_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Missing or unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            database_url: text("DATABASE_URL", DEFAULT_DATABASE_URL),
            host: text("HOST", "0.0.0.0"),
            port: try_load(&lookup, "PORT", 3000),
            admin_email: text("ADMIN_EMAIL", "admin@mealmatch.local"),
            admin_password: text("ADMIN_PASSWORD", "admin123"),
            admin_name: text("ADMIN_NAME", "Admin"),
            rakuten_application_id: lookup("RAKUTEN_APPLICATION_ID")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            production: lookup("APP_ENV").is_some_and(|v| v.eq_ignore_ascii_case("production")),
            session_ttl_days: try_load(&lookup, "SESSION_TTL_DAYS", 30i64).max(1),
            session_sweep_interval_secs: try_load(&lookup, "SESSION_SWEEP_INTERVAL_SECS", 3600u64)
                .max(1),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.session_ttl_days)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs)
    }

    /// Session cookies carry the `Secure` flag only in production.
    pub fn secure_cookies(&self) -> bool {
        self.production
    }
}

fn try_load<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
        Some(raw) => raw.trim().parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.session_ttl_days, 30);
        assert!(!config.secure_cookies());
        assert_eq!(config.rakuten_application_id, None);
    }

    #[test]
    fn overrides_and_invalid_values() {
        let config = config(&[
            ("PORT", "8080"),
            ("SESSION_TTL_DAYS", "seven"),
            ("APP_ENV", "Production"),
            ("RAKUTEN_APPLICATION_ID", "  "),
            ("ADMIN_EMAIL", "root@example.com"),
        ]);
        assert_eq!(config.port, 8080);
        assert_eq!(config.session_ttl_days, 30);
        assert!(config.secure_cookies());
        assert_eq!(config.rakuten_application_id, None);
        assert_eq!(config.admin_email, "root@example.com");
    }
}
