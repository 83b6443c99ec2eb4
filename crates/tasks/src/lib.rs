pub mod config;
pub mod error;
pub mod native;
pub mod sql;
pub mod tasks;

pub use config::{DruidNativeConfig, DruidSqlConfig};
pub use error::DruidError;
pub use native::{HttpNativeClient, NativeClient};
pub use sql::{apply_fetch, FetchMode, HttpSqlConnector, SqlConnection, SqlConnector, SqlRow};
pub use tasks::{
    GroupByParams, GroupByQueryTask, Intervals, NativeQueryParams, SqlQueryTask, SqlTaskParams,
    TaskSpec, TimeSeriesQueryTask, TopNParams, TopNQueryTask,
};
