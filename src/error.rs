use thiserror::Error;

/// The two failure classes a fetch can end in.
///
/// Transport covers everything between us and a well-formed response
/// (network errors, non-2xx statuses, undecodable bodies). Domain covers
/// responses the server produced on purpose but flagged as unsuccessful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Transport,
    Domain,
}

/// Error returned by every fetcher and by the transport collaborator.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {path} returned HTTP {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} reported failure: {message}")]
    Domain { path: String, message: String },
}

impl FetchError {
    pub fn domain(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Domain {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn status(path: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            path: path.into(),
            status,
            body: body.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Domain { .. } => FailureKind::Domain,
            FetchError::Transport { .. }
            | FetchError::Status { .. }
            | FetchError::Decode { .. } => FailureKind::Transport,
        }
    }

    /// The request path the failure belongs to.
    pub fn path(&self) -> &str {
        match self {
            FetchError::Transport { path, .. }
            | FetchError::Status { path, .. }
            | FetchError::Decode { path, .. }
            | FetchError::Domain { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_decode_are_transport_failures() {
        let status = FetchError::status("/incomes/dashboard/summary", 502, "bad gateway");
        assert_eq!(status.kind(), FailureKind::Transport);

        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let decode = FetchError::Decode {
            path: "/cost-centers".to_string(),
            source,
        };
        assert_eq!(decode.kind(), FailureKind::Transport);
        assert_eq!(decode.path(), "/cost-centers");
    }

    #[test]
    fn envelope_failure_is_domain() {
        let err = FetchError::domain("/costs/explore", "Error al obtener datos de costos");
        assert_eq!(err.kind(), FailureKind::Domain);
        assert_eq!(
            err.to_string(),
            "/costs/explore reported failure: Error al obtener datos de costos"
        );
    }
}
