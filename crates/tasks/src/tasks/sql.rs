//! The SQL query task: connect → execute → fetch → close.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::config::DruidSqlConfig;
use crate::error::DruidError;
use crate::sql::{apply_fetch, FetchMode, HttpSqlConnector, SqlConnector};

/// Rows fetched when the mode is `many` and no count is configured.
const DEFAULT_FETCH_COUNT: usize = 10;

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Parameters for the SQL task.
///
/// Every field is optional: a task instance captures one set as defaults at
/// construction, `run` accepts another as call-time overrides, and
/// [`merge`](SqlTaskParams::merge) resolves them once per invocation.
/// Fields unset on both sides take the built-in defaults from
/// [`DruidSqlConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlTaskParams {
    /// SQL query to execute. Required by the time `run` is invoked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// How many rows to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchMode>,
    /// Row limit for [`FetchMode::Many`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_count: Option<usize>,
    /// Broker hostname.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Broker port.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Path of the SQL endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// "http" or "https".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Basic-auth user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Basic-auth password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Query context forwarded verbatim in the request body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
    /// Verify the server TLS certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_verify_cert: Option<bool>,
    /// Path to a PEM client certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssl_client_cert: Option<String>,
}

impl SqlTaskParams {
    /// Resolve call-time `overrides` against construction-time `defaults`:
    /// a call-time value wins, an unset one falls back.
    pub fn merge(defaults: &Self, overrides: &Self) -> Self {
        Self {
            query: overrides.query.clone().or_else(|| defaults.query.clone()),
            fetch: overrides.fetch.or(defaults.fetch),
            fetch_count: overrides.fetch_count.or(defaults.fetch_count),
            host: overrides.host.clone().or_else(|| defaults.host.clone()),
            port: overrides.port.or(defaults.port),
            path: overrides.path.clone().or_else(|| defaults.path.clone()),
            scheme: overrides.scheme.clone().or_else(|| defaults.scheme.clone()),
            user: overrides.user.clone().or_else(|| defaults.user.clone()),
            password: overrides
                .password
                .clone()
                .or_else(|| defaults.password.clone()),
            context: overrides
                .context
                .clone()
                .or_else(|| defaults.context.clone()),
            ssl_verify_cert: overrides.ssl_verify_cert.or(defaults.ssl_verify_cert),
            ssl_client_cert: overrides
                .ssl_client_cert
                .clone()
                .or_else(|| defaults.ssl_client_cert.clone()),
        }
    }

    /// Seed a parameter set from a resolved connection config.
    pub fn from_config(config: &DruidSqlConfig) -> Self {
        Self {
            query: None,
            fetch: None,
            fetch_count: None,
            host: Some(config.host.clone()),
            port: Some(config.port),
            path: Some(config.path.clone()),
            scheme: Some(config.scheme.clone()),
            user: config.user.clone(),
            password: config.password.clone(),
            context: config.context.clone(),
            ssl_verify_cert: Some(config.ssl_verify_cert),
            ssl_client_cert: config.ssl_client_cert.clone(),
        }
    }

    /// Apply built-in defaults to whatever the merge left unset.
    fn resolve(self) -> EffectiveSqlQuery {
        let base = DruidSqlConfig::default();
        EffectiveSqlQuery {
            query: self.query,
            fetch: self.fetch.unwrap_or_default(),
            fetch_count: self.fetch_count.unwrap_or(DEFAULT_FETCH_COUNT),
            connection: DruidSqlConfig {
                host: self.host.unwrap_or(base.host),
                port: self.port.unwrap_or(base.port),
                path: self.path.unwrap_or(base.path),
                scheme: self.scheme.unwrap_or(base.scheme),
                user: self.user,
                password: self.password,
                context: self.context,
                ssl_verify_cert: self.ssl_verify_cert.unwrap_or(base.ssl_verify_cert),
                ssl_client_cert: self.ssl_client_cert,
            },
        }
    }
}

/// A fully resolved invocation: merged parameters with built-in defaults
/// applied.
struct EffectiveSqlQuery {
    query: Option<String>,
    fetch: FetchMode,
    fetch_count: usize,
    connection: DruidSqlConfig,
}

// ---------------------------------------------------------------------------
// SqlQueryTask
// ---------------------------------------------------------------------------

/// Executes a raw SQL query over Druid's SQL-over-HTTP endpoint.
pub struct SqlQueryTask {
    defaults: SqlTaskParams,
}

impl SqlQueryTask {
    /// Create a task with the given construction-time defaults.
    pub fn new(defaults: SqlTaskParams) -> Self {
        Self { defaults }
    }

    /// Merge `overrides` over the defaults, execute the query, and return
    /// rows shaped by the fetch mode.
    ///
    /// Fails with [`DruidError::MissingQuery`] before any connection
    /// attempt when no query string is present after the merge.
    pub async fn run(&self, overrides: SqlTaskParams) -> Result<Value, DruidError> {
        self.run_with(&HttpSqlConnector, overrides).await
    }

    /// Like [`run`](Self::run), but connects through the given connector.
    pub async fn run_with(
        &self,
        connector: &dyn SqlConnector,
        overrides: SqlTaskParams,
    ) -> Result<Value, DruidError> {
        let effective = SqlTaskParams::merge(&self.defaults, &overrides).resolve();

        let query = match effective.query.as_deref() {
            Some(q) if !q.is_empty() => q.to_string(),
            _ => return Err(DruidError::MissingQuery),
        };

        info!(fetch = ?effective.fetch, "running SQL query");

        let mut conn = connector.connect(&effective.connection).await?;

        // The connection is closed exactly once on every path past connect,
        // including execute failure.
        let executed = conn.execute(&query).await;
        let closed = conn.close().await;

        let rows = executed?;
        closed?;

        Ok(apply_fetch(rows, effective.fetch, effective.fetch_count))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_call_time_host_wins() {
        let defaults = SqlTaskParams {
            host: Some("a".into()),
            ..SqlTaskParams::default()
        };
        let overrides = SqlTaskParams {
            host: Some("b".into()),
            ..SqlTaskParams::default()
        };

        let merged = SqlTaskParams::merge(&defaults, &overrides);
        assert_eq!(merged.host.as_deref(), Some("b"));
    }

    #[test]
    fn merge_falls_back_to_construction_default() {
        let defaults = SqlTaskParams {
            host: Some("a".into()),
            ..SqlTaskParams::default()
        };

        let merged = SqlTaskParams::merge(&defaults, &SqlTaskParams::default());
        assert_eq!(merged.host.as_deref(), Some("a"));
    }

    #[test]
    fn construction_fetch_count_is_honored() {
        // A construction-time fetch_count survives a call that leaves it
        // unset; only when neither side sets it does 10 apply.
        let defaults = SqlTaskParams {
            fetch_count: Some(7),
            ..SqlTaskParams::default()
        };

        let effective = SqlTaskParams::merge(&defaults, &SqlTaskParams::default()).resolve();
        assert_eq!(effective.fetch_count, 7);

        let effective =
            SqlTaskParams::merge(&SqlTaskParams::default(), &SqlTaskParams::default()).resolve();
        assert_eq!(effective.fetch_count, 10);
    }

    #[test]
    fn resolve_applies_builtin_defaults() {
        let effective = SqlTaskParams::default().resolve();

        assert_eq!(effective.query, None);
        assert_eq!(effective.fetch, FetchMode::One);
        assert_eq!(effective.fetch_count, 10);
        assert_eq!(effective.connection.host, "localhost");
        assert_eq!(effective.connection.port, 8082);
        assert_eq!(effective.connection.path, "/druid/v2/sql/");
        assert_eq!(effective.connection.scheme, "http");
        assert!(effective.connection.ssl_verify_cert);
    }

    #[test]
    fn resolve_keeps_supplied_values() {
        let params = SqlTaskParams {
            query: Some("SELECT 1".into()),
            fetch: Some(FetchMode::All),
            port: Some(8282),
            ssl_verify_cert: Some(false),
            ..SqlTaskParams::default()
        };

        let effective = params.resolve();
        assert_eq!(effective.query.as_deref(), Some("SELECT 1"));
        assert_eq!(effective.fetch, FetchMode::All);
        assert_eq!(effective.connection.port, 8282);
        assert!(!effective.connection.ssl_verify_cert);
    }

    #[test]
    fn from_config_round_trips_connection_fields() {
        let config = DruidSqlConfig {
            host: "broker.internal".into(),
            user: Some("analyst".into()),
            ..DruidSqlConfig::default()
        };

        let params = SqlTaskParams::from_config(&config);
        assert_eq!(params.host.as_deref(), Some("broker.internal"));
        assert_eq!(params.user.as_deref(), Some("analyst"));
        assert_eq!(params.query, None);
        assert_eq!(params.fetch, None);
    }

    #[test]
    fn params_deserialize_from_json() {
        let params: SqlTaskParams = serde_json::from_str(
            r#"{
                "query": "SELECT page, COUNT(*) FROM wikipedia GROUP BY page",
                "fetch": "many",
                "fetch_count": 50,
                "host": "broker.internal"
            }"#,
        )
        .unwrap();

        assert_eq!(params.fetch, Some(FetchMode::Many));
        assert_eq!(params.fetch_count, Some(50));
        assert_eq!(params.host.as_deref(), Some("broker.internal"));
    }
}
