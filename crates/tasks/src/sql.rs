//! SQL-over-HTTP client for Druid's `/druid/v2/sql/` endpoint.
//!
//! Provides the [`SqlConnector`]/[`SqlConnection`] seam the SQL task runs
//! against, the [`HttpSqlConnector`] production implementation backed by
//! `reqwest`, and the [`apply_fetch`] row shaping shared with the task layer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::config::DruidSqlConfig;
use crate::error::DruidError;

/// A single result row as returned by the SQL endpoint (a JSON object).
pub type SqlRow = Value;

// ---------------------------------------------------------------------------
// Fetch mode
// ---------------------------------------------------------------------------

/// How many rows the SQL task returns from an executed query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// The first row only.
    #[default]
    One,
    /// Up to `fetch_count` rows.
    Many,
    /// Every available row.
    All,
}

/// Shape executed rows according to the fetch mode.
///
/// `One` yields the first row (JSON null when the result set is empty),
/// `Many` yields at most `fetch_count` rows, `All` yields every row.
pub fn apply_fetch(rows: Vec<SqlRow>, fetch: FetchMode, fetch_count: usize) -> Value {
    match fetch {
        FetchMode::One => rows.into_iter().next().unwrap_or(Value::Null),
        FetchMode::Many => Value::Array(rows.into_iter().take(fetch_count).collect()),
        FetchMode::All => Value::Array(rows),
    }
}

// ---------------------------------------------------------------------------
// Connection seam
// ---------------------------------------------------------------------------

/// An open connection to the SQL endpoint.
///
/// The task layer calls [`execute`](SqlConnection::execute) once and then
/// [`close`](SqlConnection::close) exactly once, on every exit path.
#[async_trait]
pub trait SqlConnection: Send {
    /// Execute `query` and return all result rows.
    async fn execute(&mut self, query: &str) -> Result<Vec<SqlRow>, DruidError>;

    /// Release the connection.
    async fn close(&mut self) -> Result<(), DruidError>;
}

/// Opens [`SqlConnection`]s for a given configuration.
#[async_trait]
pub trait SqlConnector: Send + Sync {
    /// Open a connection to the endpoint described by `config`.
    async fn connect(&self, config: &DruidSqlConfig)
        -> Result<Box<dyn SqlConnection>, DruidError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Production [`SqlConnector`] speaking HTTP(S) via `reqwest`.
pub struct HttpSqlConnector;

#[async_trait]
impl SqlConnector for HttpSqlConnector {
    async fn connect(
        &self,
        config: &DruidSqlConfig,
    ) -> Result<Box<dyn SqlConnection>, DruidError> {
        let mut builder = reqwest::Client::builder();

        if !config.ssl_verify_cert {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(cert_path) = &config.ssl_client_cert {
            let pem = std::fs::read(cert_path)
                .map_err(|e| DruidError::Certificate(format!("{}: {}", cert_path, e)))?;
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|e| DruidError::Certificate(e.to_string()))?;
            builder = builder.identity(identity);
        }

        let client = builder.build()?;

        info!(url = %config.endpoint_url(), "opened Druid SQL connection");

        Ok(Box::new(HttpSqlConnection {
            client,
            config: config.clone(),
        }))
    }
}

struct HttpSqlConnection {
    client: reqwest::Client,
    config: DruidSqlConfig,
}

#[async_trait]
impl SqlConnection for HttpSqlConnection {
    async fn execute(&mut self, query: &str) -> Result<Vec<SqlRow>, DruidError> {
        let url = self.config.endpoint_url();

        let mut body = json!({ "query": query });
        if let Some(ctx) = &self.config.context {
            body["context"] = Value::Object(ctx.clone());
        }

        debug!(url = %url, "executing SQL query");

        let mut request = self.client.post(&url).json(&body);
        if let Some(user) = &self.config.user {
            request = request.basic_auth(user, self.config.password.as_deref());
        }

        let response = request.send().await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(DruidError::Api { status, body });
        }

        let rows: Value = response
            .json()
            .await
            .map_err(|e| DruidError::Parse(e.to_string()))?;

        match rows {
            Value::Array(rows) => {
                debug!(rows = rows.len(), "SQL query returned");
                Ok(rows)
            }
            _ => Err(DruidError::Parse("expected a JSON array of rows".into())),
        }
    }

    async fn close(&mut self) -> Result<(), DruidError> {
        // The SQL endpoint is stateless; closing ends the connection scope.
        debug!(url = %self.config.endpoint_url(), "closed Druid SQL connection");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
