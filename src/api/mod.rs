//! Transport collaborator: the HTTP client every fetcher goes through, the
//! bearer-token seam, response envelope decoding and query parameters.

mod client;
mod envelope;
mod params;
mod token;

pub use client::HttpApiClient;
pub use envelope::{decode_data, decode_list, Envelope};
pub use params::{CostCenterScope, QueryParams, ReportFilters};
pub use token::{EnvTokenSource, NoTokenSource, StaticTokenSource, TokenSource};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchError;

/// Issues GET requests against the remote service.
///
/// Implementations own authentication and timeouts; callers only see the
/// decoded JSON body or a [`FetchError`].
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn get(&self, path: &str, params: &QueryParams) -> Result<Value, FetchError>;
}
