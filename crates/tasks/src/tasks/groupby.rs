//! GroupBy aggregation queries.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::DruidError;
use crate::native::{HttpNativeClient, NativeClient};
use crate::tasks::native::NativeQueryParams;

/// Parameters for a groupBy query: the shared native set plus the ordered
/// list of dimensions to group by.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupByParams {
    #[serde(flatten)]
    pub base: NativeQueryParams,
    /// Dimensions to group by, in order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Vec<String>>,
}

impl GroupByParams {
    /// Resolve call-time `overrides` against construction-time `defaults`.
    pub fn merge(defaults: &Self, overrides: &Self) -> Self {
        Self {
            base: NativeQueryParams::merge(&defaults.base, &overrides.base),
            dimensions: overrides
                .dimensions
                .clone()
                .or_else(|| defaults.dimensions.clone()),
        }
    }
}

/// Submits groupBy aggregation queries to Druid.
pub struct GroupByQueryTask {
    defaults: GroupByParams,
}

impl GroupByQueryTask {
    /// Create a task with the given construction-time defaults.
    pub fn new(defaults: GroupByParams) -> Self {
        Self { defaults }
    }

    /// Merge `overrides` over the defaults, build the query, and submit it
    /// over HTTP. Returns the grouped result set unmodified.
    pub async fn run(&self, overrides: GroupByParams) -> Result<Value, DruidError> {
        let effective = GroupByParams::merge(&self.defaults, &overrides);
        let client = HttpNativeClient::new(&effective.base.connection())?;
        Self::execute(&client, effective).await
    }

    /// Like [`run`](Self::run), but submits through the given client.
    pub async fn run_with(
        &self,
        client: &dyn NativeClient,
        overrides: GroupByParams,
    ) -> Result<Value, DruidError> {
        let effective = GroupByParams::merge(&self.defaults, &overrides);
        Self::execute(client, effective).await
    }

    async fn execute(
        client: &dyn NativeClient,
        effective: GroupByParams,
    ) -> Result<Value, DruidError> {
        info!(
            datasource = effective.base.datasource.as_deref().unwrap_or(""),
            "running groupBy query"
        );

        let mut body = effective.base.body("groupBy");
        if let Some(dimensions) = &effective.dimensions {
            body.insert(
                "dimensions".to_string(),
                Value::Array(
                    dimensions
                        .iter()
                        .map(|d| Value::String(d.clone()))
                        .collect(),
                ),
            );
        }

        client.submit(&Value::Object(body)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_precedence_for_dimensions() {
        let defaults = GroupByParams {
            dimensions: Some(vec!["country".into()]),
            ..GroupByParams::default()
        };
        let overrides = GroupByParams {
            dimensions: Some(vec!["country".into(), "city".into()]),
            ..GroupByParams::default()
        };

        let merged = GroupByParams::merge(&defaults, &overrides);
        assert_eq!(
            merged.dimensions,
            Some(vec!["country".to_string(), "city".to_string()])
        );

        let merged = GroupByParams::merge(&defaults, &GroupByParams::default());
        assert_eq!(merged.dimensions, Some(vec!["country".to_string()]));
    }

    #[test]
    fn params_deserialize_with_shared_fields() {
        let p: GroupByParams = serde_json::from_str(
            r#"{
                "datasource": "events",
                "granularity": "day",
                "dimensions": ["country", "city"]
            }"#,
        )
        .unwrap();

        assert_eq!(p.base.datasource.as_deref(), Some("events"));
        assert_eq!(p.base.granularity.as_deref(), Some("day"));
        assert_eq!(
            p.dimensions,
            Some(vec!["country".to_string(), "city".to_string()])
        );
    }

    #[test]
    fn dimensions_ordering_is_preserved() {
        let p = GroupByParams {
            dimensions: Some(vec!["b".into(), "a".into(), "c".into()]),
            ..GroupByParams::default()
        };

        let mut body = p.base.body("groupBy");
        if let Some(dimensions) = &p.dimensions {
            body.insert(
                "dimensions".to_string(),
                Value::Array(
                    dimensions
                        .iter()
                        .map(|d| Value::String(d.clone()))
                        .collect(),
                ),
            );
        }
        assert_eq!(body["dimensions"], json!(["b", "a", "c"]));
    }
}
