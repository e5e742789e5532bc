use thiserror::Error;

/// Errors surfaced by the console controller and its REST transport.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{path} returned {status}")]
    Status {
        path: String,
        status: reqwest::StatusCode,
    },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Edit rejected: {0}")]
    Rejected(String),

    #[error("No edit session is open")]
    NoSession,
}

impl ClientError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_names_the_path() {
        let err = ClientError::Status {
            path: "/rest/system".to_string(),
            status: reqwest::StatusCode::BAD_GATEWAY,
        };
        assert_eq!(err.to_string(), "/rest/system returned 502 Bad Gateway");
    }

    #[test]
    fn rejected_carries_message() {
        match ClientError::rejected("cannot remove the local node") {
            ClientError::Rejected(message) => assert_eq!(message, "cannot remove the local node"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
