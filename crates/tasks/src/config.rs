use std::env;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Default host for the SQL-over-HTTP endpoint.
pub const DEFAULT_SQL_HOST: &str = "localhost";

/// Default broker port.
pub const DEFAULT_SQL_PORT: u16 = 8082;

/// Default path of the SQL endpoint on the broker.
pub const DEFAULT_SQL_PATH: &str = "/druid/v2/sql/";

/// Default scheme for the SQL endpoint.
pub const DEFAULT_SQL_SCHEME: &str = "http";

/// Default base url for the native query endpoint.
pub const DEFAULT_NATIVE_URL: &str = "http://localhost:8082";

/// Default native endpoint path, relative to the base url.
pub const DEFAULT_NATIVE_ENDPOINT: &str = "druid/v2";

// ── Env helpers ──────────────────────────────────────────────────

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries `{PROFILE}_{KEY}` first, falls back to `{KEY}`.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.as_str(), "true" | "1"),
        None => default,
    }
}

// ── DruidSqlConfig ───────────────────────────────────────────────

/// Connection parameters for Druid's SQL-over-HTTP endpoint.
///
/// Reads from environment variables with optional profile prefix.
/// When `DRUIDFLOW_PROFILE=PROD`, checks `PROD_DRUID_HOST` before `DRUID_HOST`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DruidSqlConfig {
    /// Broker hostname.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Path of the SQL endpoint.
    pub path: String,
    /// "http" or "https".
    pub scheme: String,
    /// Basic-auth user, if the broker requires authentication.
    pub user: Option<String>,
    /// Basic-auth password.
    pub password: Option<String>,
    /// Query context forwarded verbatim in the request body.
    pub context: Option<Map<String, Value>>,
    /// Verify the server TLS certificate. Disable for self-signed brokers.
    pub ssl_verify_cert: bool,
    /// Path to a PEM client certificate for mutual TLS.
    pub ssl_client_cert: Option<String>,
}

impl Default for DruidSqlConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SQL_HOST.to_string(),
            port: DEFAULT_SQL_PORT,
            path: DEFAULT_SQL_PATH.to_string(),
            scheme: DEFAULT_SQL_SCHEME.to_string(),
            user: None,
            password: None,
            context: None,
            ssl_verify_cert: true,
            ssl_client_cert: None,
        }
    }
}

impl DruidSqlConfig {
    /// Build config from environment variables.
    ///
    /// Reads `DRUIDFLOW_PROFILE` to determine the profile prefix.
    /// For each key, tries `{PROFILE}_DRUID_*` first, then `DRUID_*`.
    pub fn from_env() -> Self {
        let profile = env_opt("DRUIDFLOW_PROFILE")
            .map(|s| s.to_uppercase())
            .unwrap_or_default();
        Self::from_env_profiled(&profile)
    }

    /// Build config for a specific named profile.
    pub fn from_env_profiled(profile: &str) -> Self {
        Self {
            host: profiled_env_or(profile, "DRUID_HOST", DEFAULT_SQL_HOST),
            port: profiled_env_u16(profile, "DRUID_PORT", DEFAULT_SQL_PORT),
            path: profiled_env_or(profile, "DRUID_PATH", DEFAULT_SQL_PATH),
            scheme: profiled_env_or(profile, "DRUID_SCHEME", DEFAULT_SQL_SCHEME),
            user: profiled_env_opt(profile, "DRUID_USER"),
            password: profiled_env_opt(profile, "DRUID_PASSWORD"),
            context: None,
            ssl_verify_cert: profiled_env_bool(profile, "DRUID_SSL_VERIFY_CERT", true),
            ssl_client_cert: profiled_env_opt(profile, "DRUID_SSL_CLIENT_CERT"),
        }
    }

    /// Full url of the SQL endpoint.
    pub fn endpoint_url(&self) -> String {
        format!("{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }
}

// ── DruidNativeConfig ────────────────────────────────────────────

/// Connection parameters for Druid's native query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DruidNativeConfig {
    /// Base url of the broker, e.g. `http://localhost:8082`.
    pub url: String,
    /// Endpoint path relative to the base url.
    pub endpoint: String,
    /// Path to a PEM CA certificate to trust in addition to the system roots.
    pub cafile: Option<String>,
}

impl Default for DruidNativeConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_NATIVE_URL.to_string(),
            endpoint: DEFAULT_NATIVE_ENDPOINT.to_string(),
            cafile: None,
        }
    }
}

impl DruidNativeConfig {
    /// Build config from environment variables, honoring `DRUIDFLOW_PROFILE`.
    pub fn from_env() -> Self {
        let profile = env_opt("DRUIDFLOW_PROFILE")
            .map(|s| s.to_uppercase())
            .unwrap_or_default();
        Self::from_env_profiled(&profile)
    }

    /// Build config for a specific named profile.
    pub fn from_env_profiled(profile: &str) -> Self {
        Self {
            url: profiled_env_or(profile, "DRUID_URL", DEFAULT_NATIVE_URL),
            endpoint: profiled_env_or(profile, "DRUID_ENDPOINT", DEFAULT_NATIVE_ENDPOINT),
            cafile: profiled_env_opt(profile, "DRUID_CAFILE"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env-based tests must run serially to avoid interfering with each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Helper: clear all DRUID_* and profile env vars used by the configs.
    fn clear_druid_env() {
        let keys = [
            "DRUIDFLOW_PROFILE",
            "DRUID_HOST",
            "DRUID_PORT",
            "DRUID_PATH",
            "DRUID_SCHEME",
            "DRUID_USER",
            "DRUID_PASSWORD",
            "DRUID_SSL_VERIFY_CERT",
            "DRUID_SSL_CLIENT_CERT",
            "DRUID_URL",
            "DRUID_ENDPOINT",
            "DRUID_CAFILE",
            "PROD_DRUID_HOST",
            "PROD_DRUID_URL",
        ];
        for k in keys {
            env::remove_var(k);
        }
    }

    #[test]
    fn sql_defaults_when_no_env_vars() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_druid_env();

        let cfg = DruidSqlConfig::from_env_profiled("");

        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.port, 8082);
        assert_eq!(cfg.path, "/druid/v2/sql/");
        assert_eq!(cfg.scheme, "http");
        assert_eq!(cfg.user, None);
        assert!(cfg.ssl_verify_cert);
        assert_eq!(cfg.ssl_client_cert, None);
    }

    #[test]
    fn sql_from_env_reads_vars() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_druid_env();

        env::set_var("DRUID_HOST", "broker.internal");
        env::set_var("DRUID_PORT", "8282");
        env::set_var("DRUID_SCHEME", "https");
        env::set_var("DRUID_SSL_VERIFY_CERT", "false");

        let cfg = DruidSqlConfig::from_env_profiled("");

        assert_eq!(cfg.host, "broker.internal");
        assert_eq!(cfg.port, 8282);
        assert_eq!(cfg.scheme, "https");
        assert!(!cfg.ssl_verify_cert);

        clear_druid_env();
    }

    #[test]
    fn profiled_env_takes_precedence() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_druid_env();

        env::set_var("DRUID_HOST", "base");
        env::set_var("PROD_DRUID_HOST", "prod");

        let cfg = DruidSqlConfig::from_env_profiled("PROD");
        assert_eq!(cfg.host, "prod");

        clear_druid_env();
    }

    #[test]
    fn invalid_port_falls_back_to_default() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_druid_env();

        env::set_var("DRUID_PORT", "not_a_number");

        let cfg = DruidSqlConfig::from_env_profiled("");
        assert_eq!(cfg.port, 8082);

        clear_druid_env();
    }

    #[test]
    fn endpoint_url_formatting() {
        let cfg = DruidSqlConfig::default();
        assert_eq!(cfg.endpoint_url(), "http://localhost:8082/druid/v2/sql/");

        let cfg = DruidSqlConfig {
            scheme: "https".into(),
            host: "broker.internal".into(),
            port: 443,
            ..DruidSqlConfig::default()
        };
        assert_eq!(cfg.endpoint_url(), "https://broker.internal:443/druid/v2/sql/");
    }

    #[test]
    fn native_defaults_when_no_env_vars() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_druid_env();

        let cfg = DruidNativeConfig::from_env_profiled("");

        assert_eq!(cfg.url, "http://localhost:8082");
        assert_eq!(cfg.endpoint, "druid/v2");
        assert_eq!(cfg.cafile, None);
    }

    #[test]
    fn native_profiled_url() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_druid_env();

        env::set_var("DRUID_URL", "http://base:8082");
        env::set_var("PROD_DRUID_URL", "https://prod:8282");

        let cfg = DruidNativeConfig::from_env_profiled("PROD");
        assert_eq!(cfg.url, "https://prod:8282");

        let cfg = DruidNativeConfig::from_env_profiled("");
        assert_eq!(cfg.url, "http://base:8082");

        clear_druid_env();
    }
}
