use thiserror::Error;

/// Errors surfaced by the Druid query tasks.
///
/// Only [`DruidError::MissingQuery`] is raised locally, before any network
/// call. Everything else originates in the transport or on the broker and
/// is propagated without translation, retries, or partial-result handling.
#[derive(Debug, Error)]
pub enum DruidError {
    /// The SQL task was invoked without a query string.
    #[error("a query string must be provided")]
    MissingQuery,

    /// HTTP transport failure (connection refused, TLS handshake, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the broker. The body carries Druid's own
    /// error payload verbatim.
    #[error("Druid returned {status}: {body}")]
    Api { status: u16, body: String },

    /// A certificate file could not be read or parsed.
    #[error("certificate error: {0}")]
    Certificate(String),

    /// The configured base url does not parse.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// The response body was not the JSON shape the endpoint documents.
    #[error("failed to parse response: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = DruidError::MissingQuery;
        assert_eq!(err.to_string(), "a query string must be provided");

        let err = DruidError::Api {
            status: 400,
            body: "unknown datasource".into(),
        };
        assert!(err.to_string().contains("400"));
        assert!(err.to_string().contains("unknown datasource"));

        let err = DruidError::Certificate("no such file".into());
        assert!(err.to_string().contains("no such file"));
    }
}
