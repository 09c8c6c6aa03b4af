//! One fetcher per remote aggregate query.
//!
//! Every fetcher issues exactly one GET through an [`ApiTransport`],
//! normalizes the envelope into plain Rust values and propagates failures
//! unchanged. Retry and fallback policy belongs to the composing services.

mod catalog;
mod costs;
mod dashboard;
mod incomes;
mod ledger;

pub use catalog::{
    CatalogFetcher, CostCenter, CostFilterOptions, FilterOption, IncomeFilterOptions, TypeRecord,
};
pub use costs::{CostItem, CostsByCategory, CostsByPeriod, CostsFetcher, CostsOverview};
pub use dashboard::{
    CashFlowPeriod, CategorySummary, DashboardFetcher, DashboardSummary, Flow, TopTransaction,
    TypeSummary,
};
pub use incomes::{
    IncomeItem, IncomesByCenter, IncomesByClient, IncomesByPeriod, IncomesFetcher, IncomesOverview,
};
pub use ledger::{LedgerFetcher, LedgerRow};

use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::api::{decode_data, decode_list, ApiTransport, QueryParams};
use crate::error::FetchError;

pub type SharedTransport = Arc<dyn ApiTransport>;

/// GET `path` and decode the enveloped payload.
pub(crate) async fn fetch_data<T: DeserializeOwned>(
    transport: &dyn ApiTransport,
    path: &str,
    params: &QueryParams,
) -> Result<T, FetchError> {
    let body = transport.get(path, params).await?;
    let data = decode_data(path, body)?;
    debug!(path, "decoded response");
    Ok(data)
}

/// GET `path` and decode a list payload with [`decode_list`]'s leniency.
pub(crate) async fn fetch_list<T: DeserializeOwned>(
    transport: &dyn ApiTransport,
    path: &str,
    params: &QueryParams,
) -> Result<Vec<T>, FetchError> {
    let body = transport.get(path, params).await?;
    let records = decode_list(path, body)?;
    debug!(path, records = records.len(), "decoded list response");
    Ok(records)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Decimal(Decimal),
    Text(String),
}

/// Amounts arrive as JSON numbers, numeric strings (Postgres `numeric`) or
/// `null`. Anything unparseable counts as zero.
pub(crate) fn decimal_or_zero<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<NumberOrString> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrString::Decimal(value)) => value,
        Some(NumberOrString::Text(text)) => text.trim().parse().unwrap_or_default(),
        None => Decimal::ZERO,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountRepr {
    Int(u64),
    Float(f64),
    Text(String),
}

/// Counts and ids arrive as integers, `bigint` strings or `null`.
pub(crate) fn count_or_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<CountRepr> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(CountRepr::Int(value)) => value,
        Some(CountRepr::Float(value)) if value.is_finite() && value >= 0.0 => value as u64,
        Some(CountRepr::Text(text)) => text.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

/// Parse `YYYY-MM-DD` or an RFC 3339 timestamp (date part is kept).
pub(crate) fn parse_loose_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

/// Optional date in either accepted format; unparseable values become `None`.
pub(crate) fn loose_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_loose_date))
}

/// `null` and missing strings both become empty.
pub(crate) fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
