//! Shared parameter set for the native query tasks, plus the timeseries task.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::config::{DruidNativeConfig, DEFAULT_NATIVE_ENDPOINT, DEFAULT_NATIVE_URL};
use crate::error::DruidError;
use crate::native::{HttpNativeClient, NativeClient};

// ---------------------------------------------------------------------------
// Intervals
// ---------------------------------------------------------------------------

/// One or more ISO-8601 interval strings bounding a query.
///
/// Serializes exactly as supplied; Druid accepts both a single string and
/// a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Intervals {
    /// A single interval, e.g. `"2024-01-01/2024-02-01"`.
    One(String),
    /// An ordered list of intervals.
    Many(Vec<String>),
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Connection and query-shape parameters shared by the native query tasks.
///
/// Every field is optional: a task instance captures one set as defaults at
/// construction, `run` accepts another as call-time overrides, and
/// [`merge`](NativeQueryParams::merge) resolves them once per invocation.
/// Parameters this crate does not recognize land in `extra` and are
/// forwarded verbatim into the query body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeQueryParams {
    /// Base url of the broker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Endpoint path relative to the base url.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Path to a PEM CA certificate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cafile: Option<String>,
    /// Datasource the query targets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource: Option<String>,
    /// Time-bucketing resolution, e.g. `"hour"` or `"day"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<String>,
    /// Time range(s) the query considers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intervals: Option<Intervals>,
    /// Aggregation name → aggregation spec.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Map<String, Value>>,
    /// Unrecognized parameters, forwarded verbatim into the query body.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NativeQueryParams {
    /// Resolve call-time `overrides` against construction-time `defaults`:
    /// a call-time value wins, an unset one falls back.
    pub fn merge(defaults: &Self, overrides: &Self) -> Self {
        let mut extra = defaults.extra.clone();
        extra.extend(overrides.extra.clone());

        Self {
            url: overrides.url.clone().or_else(|| defaults.url.clone()),
            endpoint: overrides.endpoint.clone().or_else(|| defaults.endpoint.clone()),
            cafile: overrides.cafile.clone().or_else(|| defaults.cafile.clone()),
            datasource: overrides
                .datasource
                .clone()
                .or_else(|| defaults.datasource.clone()),
            granularity: overrides
                .granularity
                .clone()
                .or_else(|| defaults.granularity.clone()),
            intervals: overrides
                .intervals
                .clone()
                .or_else(|| defaults.intervals.clone()),
            aggregations: overrides
                .aggregations
                .clone()
                .or_else(|| defaults.aggregations.clone()),
            extra,
        }
    }

    /// Connection config with built-in defaults applied.
    pub fn connection(&self) -> DruidNativeConfig {
        DruidNativeConfig {
            url: self
                .url
                .clone()
                .unwrap_or_else(|| DEFAULT_NATIVE_URL.to_string()),
            endpoint: self
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_NATIVE_ENDPOINT.to_string()),
            cafile: self.cafile.clone(),
        }
    }

    /// Seed a parameter set from a resolved connection config.
    pub fn from_config(config: &DruidNativeConfig) -> Self {
        Self {
            url: Some(config.url.clone()),
            endpoint: Some(config.endpoint.clone()),
            cafile: config.cafile.clone(),
            ..Self::default()
        }
    }

    /// Build the query body shared by every native query type.
    ///
    /// Only present fields are emitted; a missing datasource or granularity
    /// is the broker's to reject. The aggregations mapping becomes Druid's
    /// list form with the mapping key injected as the aggregator `name`.
    /// `extra` is appended last, so unrecognized parameters reach the
    /// broker exactly as supplied.
    pub fn body(&self, query_type: &str) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert(
            "queryType".to_string(),
            Value::String(query_type.to_string()),
        );

        if let Some(datasource) = &self.datasource {
            body.insert("dataSource".to_string(), Value::String(datasource.clone()));
        }
        if let Some(granularity) = &self.granularity {
            body.insert(
                "granularity".to_string(),
                Value::String(granularity.clone()),
            );
        }
        if let Some(intervals) = &self.intervals {
            // Serializing Intervals cannot fail: it is a string or a list.
            body.insert(
                "intervals".to_string(),
                serde_json::to_value(intervals).unwrap_or(Value::Null),
            );
        }
        if let Some(aggregations) = &self.aggregations {
            let list: Vec<Value> = aggregations
                .iter()
                .map(|(name, spec)| match spec {
                    Value::Object(obj) => {
                        let mut obj = obj.clone();
                        obj.insert("name".to_string(), Value::String(name.clone()));
                        Value::Object(obj)
                    }
                    other => other.clone(),
                })
                .collect();
            body.insert("aggregations".to_string(), Value::Array(list));
        }

        for (key, value) in &self.extra {
            body.insert(key.clone(), value.clone());
        }

        body
    }
}

// ---------------------------------------------------------------------------
// TimeSeriesQueryTask
// ---------------------------------------------------------------------------

/// Submits timeseries aggregation queries to Druid.
pub struct TimeSeriesQueryTask {
    defaults: NativeQueryParams,
}

impl TimeSeriesQueryTask {
    /// Create a task with the given construction-time defaults.
    pub fn new(defaults: NativeQueryParams) -> Self {
        Self { defaults }
    }

    /// Merge `overrides` over the defaults, build the query, and submit it
    /// over HTTP. Returns the broker's result structure unmodified.
    pub async fn run(&self, overrides: NativeQueryParams) -> Result<Value, DruidError> {
        let effective = NativeQueryParams::merge(&self.defaults, &overrides);
        let client = HttpNativeClient::new(&effective.connection())?;
        Self::execute(&client, effective).await
    }

    /// Like [`run`](Self::run), but submits through the given client.
    pub async fn run_with(
        &self,
        client: &dyn NativeClient,
        overrides: NativeQueryParams,
    ) -> Result<Value, DruidError> {
        let effective = NativeQueryParams::merge(&self.defaults, &overrides);
        Self::execute(client, effective).await
    }

    async fn execute(
        client: &dyn NativeClient,
        effective: NativeQueryParams,
    ) -> Result<Value, DruidError> {
        info!(
            datasource = effective.datasource.as_deref().unwrap_or(""),
            "running timeseries query"
        );
        let body = effective.body("timeseries");
        client.submit(&Value::Object(body)).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
