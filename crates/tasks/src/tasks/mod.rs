//! The four query task adapters.
//!
//! Each task holds construction-time defaults and exposes one `run`
//! operation taking call-time overrides; for every parameter the call-time
//! value wins and an unset one falls back to the default. The tasks share
//! no state and delegate all wire work to the client layer in
//! [`crate::sql`] and [`crate::native`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DruidError;

pub mod groupby;
pub mod native;
pub mod sql;
pub mod topn;

pub use groupby::{GroupByParams, GroupByQueryTask};
pub use native::{Intervals, NativeQueryParams, TimeSeriesQueryTask};
pub use sql::{SqlQueryTask, SqlTaskParams};
pub use topn::{TopNParams, TopNQueryTask};

/// A task invocation described as data.
///
/// This is the JSON contract a scheduler stores and the worker binary
/// executes:
///
/// ```json
/// {
///   "task": "topn",
///   "params": {
///     "datasource": "wikipedia",
///     "granularity": "all",
///     "intervals": "2024-01-01/2024-02-01",
///     "dimension": "page",
///     "metric": "edits",
///     "threshold": 10
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "task", content = "params", rename_all = "lowercase")]
pub enum TaskSpec {
    /// Raw SQL over the SQL-over-HTTP endpoint.
    Sql(SqlTaskParams),
    /// Native timeseries aggregation.
    Timeseries(NativeQueryParams),
    /// Native topN ranking.
    Topn(TopNParams),
    /// Native groupBy aggregation.
    Groupby(GroupByParams),
}

impl TaskSpec {
    /// Short name of the task kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            TaskSpec::Sql(_) => "sql",
            TaskSpec::Timeseries(_) => "timeseries",
            TaskSpec::Topn(_) => "topn",
            TaskSpec::Groupby(_) => "groupby",
        }
    }

    /// Run the described task over HTTP.
    ///
    /// `sql_defaults` and `native_defaults` supply the construction-time
    /// defaults (typically seeded from the environment); the spec's own
    /// parameters act as the call-time overrides.
    pub async fn run(
        self,
        sql_defaults: SqlTaskParams,
        native_defaults: NativeQueryParams,
    ) -> Result<Value, DruidError> {
        match self {
            TaskSpec::Sql(params) => SqlQueryTask::new(sql_defaults).run(params).await,
            TaskSpec::Timeseries(params) => {
                TimeSeriesQueryTask::new(native_defaults).run(params).await
            }
            TaskSpec::Topn(params) => {
                let defaults = TopNParams {
                    base: native_defaults,
                    ..TopNParams::default()
                };
                TopNQueryTask::new(defaults).run(params).await
            }
            TaskSpec::Groupby(params) => {
                let defaults = GroupByParams {
                    base: native_defaults,
                    ..GroupByParams::default()
                };
                GroupByQueryTask::new(defaults).run(params).await
            }
        }
    }
}
