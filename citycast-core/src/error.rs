use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to one of the upstream HTTP APIs.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (DNS, TLS, connection reset...).
    #[error("Request to {service} failed: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{service} request failed with status {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    /// The body could not be decoded into the expected shape.
    #[error("Failed to parse {service} response: {reason}")]
    Parse {
        service: &'static str,
        reason: String,
    },
}

impl ApiError {
    pub(crate) fn parse(service: &'static str, reason: impl Into<String>) -> Self {
        Self::Parse {
            service,
            reason: reason.into(),
        }
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let mut end = MAX;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &body[..end])
    } else {
        body.to_string()
    }
}
