//! TopN ranking queries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::DruidError;
use crate::native::{HttpNativeClient, NativeClient};
use crate::tasks::native::NativeQueryParams;

/// Parameters for a topN query: the shared native set plus the dimension
/// to rank by, the metric to rank on, and the maximum number of entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TopNParams {
    #[serde(flatten)]
    pub base: NativeQueryParams,
    /// Dimension to rank by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    /// Metric to rank on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
    /// Maximum number of ranked entries to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u64>,
}

impl TopNParams {
    /// Resolve call-time `overrides` against construction-time `defaults`.
    pub fn merge(defaults: &Self, overrides: &Self) -> Self {
        Self {
            base: NativeQueryParams::merge(&defaults.base, &overrides.base),
            dimension: overrides
                .dimension
                .clone()
                .or_else(|| defaults.dimension.clone()),
            metric: overrides.metric.clone().or_else(|| defaults.metric.clone()),
            threshold: overrides.threshold.or(defaults.threshold),
        }
    }
}

/// Submits topN ranking queries to Druid.
pub struct TopNQueryTask {
    defaults: TopNParams,
}

impl TopNQueryTask {
    /// Create a task with the given construction-time defaults.
    pub fn new(defaults: TopNParams) -> Self {
        Self { defaults }
    }

    /// Merge `overrides` over the defaults, build the query, and submit it
    /// over HTTP. Returns the ranked result set unmodified.
    pub async fn run(&self, overrides: TopNParams) -> Result<Value, DruidError> {
        let effective = TopNParams::merge(&self.defaults, &overrides);
        let client = HttpNativeClient::new(&effective.base.connection())?;
        Self::execute(&client, effective).await
    }

    /// Like [`run`](Self::run), but submits through the given client.
    pub async fn run_with(
        &self,
        client: &dyn NativeClient,
        overrides: TopNParams,
    ) -> Result<Value, DruidError> {
        let effective = TopNParams::merge(&self.defaults, &overrides);
        Self::execute(client, effective).await
    }

    async fn execute(
        client: &dyn NativeClient,
        effective: TopNParams,
    ) -> Result<Value, DruidError> {
        info!(
            datasource = effective.base.datasource.as_deref().unwrap_or(""),
            dimension = effective.dimension.as_deref().unwrap_or(""),
            "running topN query"
        );

        let mut body = effective.base.body("topN");
        if let Some(dimension) = &effective.dimension {
            body.insert("dimension".to_string(), Value::String(dimension.clone()));
        }
        if let Some(metric) = &effective.metric {
            body.insert("metric".to_string(), Value::String(metric.clone()));
        }
        if let Some(threshold) = effective.threshold {
            body.insert("threshold".to_string(), Value::from(threshold));
        }

        client.submit(&Value::Object(body)).await
    }
}
