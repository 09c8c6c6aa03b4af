use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::FetchError;

/// Query endpoint response wrapper: `{ success, data, message }`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

fn default_success() -> bool {
    true
}

impl<T> Envelope<T> {
    /// The payload, which may be absent. `success: false` is a domain
    /// failure.
    pub fn into_payload(self, path: &str) -> Result<Option<T>, FetchError> {
        if !self.success {
            let message = self
                .message
                .unwrap_or_else(|| "request was not successful".to_string());
            return Err(FetchError::domain(path, message));
        }
        Ok(self.data)
    }

    /// Unwrap the payload, turning `success: false` or a missing payload into
    /// a domain failure.
    pub fn into_data(self, path: &str) -> Result<T, FetchError> {
        self.into_payload(path)?
            .ok_or_else(|| FetchError::domain(path, "response has no data"))
    }
}

fn is_envelope(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| obj.contains_key("success") || obj.contains_key("data"))
}

/// Decode a response body that is either an [`Envelope`] or a bare payload.
pub fn decode_data<T: DeserializeOwned>(path: &str, body: Value) -> Result<T, FetchError> {
    let decode_err = |source| FetchError::Decode {
        path: path.to_string(),
        source,
    };

    if is_envelope(&body) {
        let envelope: Envelope<T> = serde_json::from_value(body).map_err(decode_err)?;
        envelope.into_data(path)
    } else {
        serde_json::from_value(body).map_err(decode_err)
    }
}

/// Decode a list payload leniently.
///
/// A `null`, missing or non-array payload is an empty list and records that
/// fail to decode are skipped. An unsuccessful envelope still fails.
pub fn decode_list<T: DeserializeOwned>(path: &str, body: Value) -> Result<Vec<T>, FetchError> {
    let payload = if is_envelope(&body) {
        let envelope: Envelope<Value> =
            serde_json::from_value(body).map_err(|source| FetchError::Decode {
                path: path.to_string(),
                source,
            })?;
        envelope.into_payload(path)?
    } else {
        Some(body)
    };

    let Some(Value::Array(items)) = payload else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(path, error = %err, "skipping undecodable record");
                None
            }
        })
        .collect())
}
