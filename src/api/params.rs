use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::periods::Granularity;

/// Sentinel the UI uses for "no filter"; never sent to the server.
const ALL_SENTINEL: &str = "all";

/// Ordered query parameters for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.pairs.push((key.into(), value.to_string()));
    }

    /// Insert a free-form filter value, skipping empty values and `all`.
    pub fn insert_filter(&mut self, key: impl Into<String>, value: Option<&str>) {
        if let Some(value) = value.map(str::trim) {
            if !value.is_empty() && !value.eq_ignore_ascii_case(ALL_SENTINEL) {
                self.insert(key, value);
            }
        }
    }

    pub fn insert_cost_center(&mut self, scope: CostCenterScope) {
        if let CostCenterScope::Id(id) = scope {
            self.insert("cost_center_id", id);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Cost-center scope of a query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CostCenterScope {
    #[default]
    All,
    Id(u64),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid cost center {value:?}: expected a numeric id or \"all\"")]
pub struct ParseCostCenterError {
    value: String,
}

impl CostCenterScope {
    pub fn id(&self) -> Option<u64> {
        match self {
            CostCenterScope::All => None,
            CostCenterScope::Id(id) => Some(*id),
        }
    }
}

impl From<Option<u64>> for CostCenterScope {
    fn from(id: Option<u64>) -> Self {
        id.map_or(CostCenterScope::All, CostCenterScope::Id)
    }
}

impl FromStr for CostCenterScope {
    type Err = ParseCostCenterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(ALL_SENTINEL) {
            return Ok(CostCenterScope::All);
        }
        trimmed
            .parse::<u64>()
            .map(CostCenterScope::Id)
            .map_err(|_| ParseCostCenterError {
                value: s.to_string(),
            })
    }
}

impl fmt::Display for CostCenterScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostCenterScope::All => f.write_str(ALL_SENTINEL),
            CostCenterScope::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Filters shared by the report and dashboard endpoints.
///
/// Also the cache key of memoized dashboard snapshots, hence `Hash`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ReportFilters {
    pub period_type: Option<Granularity>,
    pub year: Option<i32>,
    pub cost_center: CostCenterScope,
    pub category_id: Option<String>,
    pub client_id: Option<String>,
    pub status: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl ReportFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_period(mut self, granularity: Granularity, year: i32) -> Self {
        self.period_type = Some(granularity);
        self.year = Some(year);
        self
    }

    pub fn with_cost_center(mut self, scope: CostCenterScope) -> Self {
        self.cost_center = scope;
        self
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn with_client(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_date_range(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    /// Only the fields the dashboard queries read: the date range and cost
    /// center.
    pub fn dashboard_scope(&self) -> ReportFilters {
        ReportFilters {
            date_from: self.date_from,
            date_to: self.date_to,
            cost_center: self.cost_center,
            ..ReportFilters::default()
        }
    }

    pub fn to_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        if let Some(period_type) = self.period_type {
            params.insert("period_type", period_type.as_str());
        }
        if let Some(year) = self.year {
            params.insert("year", format!("{year:04}"));
        }
        params.insert_cost_center(self.cost_center);
        params.insert_filter("category_id", self.category_id.as_deref());
        params.insert_filter("client_id", self.client_id.as_deref());
        params.insert_filter("status", self.status.as_deref());
        if let Some(from) = self.date_from {
            params.insert("date_from", from.format("%Y-%m-%d"));
        }
        if let Some(to) = self.date_to {
            params.insert("date_to", to.format("%Y-%m-%d"));
        }
        params
    }
}
