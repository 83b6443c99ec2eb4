//! Native query client for Druid's `druid/v2` endpoint.
//!
//! The timeseries, topN, and groupBy tasks build a typed JSON query body
//! and submit it through [`NativeClient`]; [`HttpNativeClient`] is the
//! production implementation.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::DruidNativeConfig;
use crate::error::DruidError;

/// Submits native query bodies and returns the raw response.
#[async_trait]
pub trait NativeClient: Send + Sync {
    /// POST `body` to the query endpoint and return the response JSON
    /// untouched.
    async fn submit(&self, body: &Value) -> Result<Value, DruidError>;
}

/// Production [`NativeClient`] speaking HTTP(S) via `reqwest`.
#[derive(Debug)]
pub struct HttpNativeClient {
    client: reqwest::Client,
    query_url: Url,
}

impl HttpNativeClient {
    /// Build a client for the endpoint described by `config`.
    ///
    /// When `cafile` is set, the certificate is added to the trusted roots
    /// for this client.
    pub fn new(config: &DruidNativeConfig) -> Result<Self, DruidError> {
        let mut builder = reqwest::Client::builder();

        if let Some(cafile) = &config.cafile {
            let pem = std::fs::read(cafile)
                .map_err(|e| DruidError::Certificate(format!("{}: {}", cafile, e)))?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| DruidError::Certificate(e.to_string()))?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder.build()?;
        let query_url = join_endpoint(&config.url, &config.endpoint)?;

        Ok(Self { client, query_url })
    }
}

#[async_trait]
impl NativeClient for HttpNativeClient {
    async fn submit(&self, body: &Value) -> Result<Value, DruidError> {
        debug!(
            url = %self.query_url,
            query_type = body.get("queryType").and_then(|v| v.as_str()).unwrap_or("unknown"),
            "submitting native query"
        );

        let response = self
            .client
            .post(self.query_url.clone())
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(DruidError::Api { status, body });
        }

        response
            .json()
            .await
            .map_err(|e| DruidError::Parse(e.to_string()))
    }
}

/// Join the endpoint path onto the base url, tolerating a trailing slash.
fn join_endpoint(url: &str, endpoint: &str) -> Result<Url, DruidError> {
    let joined = format!("{}/{}", url.trim_end_matches('/'), endpoint);
    Url::parse(&joined).map_err(|e| DruidError::InvalidUrl(format!("{}: {}", joined, e)))
}
