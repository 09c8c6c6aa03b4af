use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    count_or_zero, decimal_or_zero, fetch_data, loose_date, string_or_empty, SharedTransport,
};
use crate::api::{QueryParams, ReportFilters};
use crate::error::FetchError;

/// Direction of money through the dashboard endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    Income,
    Expense,
}

impl Flow {
    /// Path segment of the flow's dashboard endpoints.
    pub fn segment(&self) -> &'static str {
        match self {
            Flow::Income => "incomes",
            Flow::Expense => "expenses",
        }
    }

    fn endpoint(&self, name: &str) -> String {
        format!("/{}/dashboard/{name}", self.segment())
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Flow::Income => "income",
            Flow::Expense => "expense",
        })
    }
}

/// Headline totals of one flow. `trend_percentage` is computed server-side
/// against the previous comparable window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub total_amount: Decimal,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub total_count: u64,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub average_amount: Decimal,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub trend_percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSummary {
    #[serde(default)]
    pub type_id: Option<u64>,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub type_name: String,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub total_amount: Decimal,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub count: u64,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub percentage: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    #[serde(default)]
    pub category_id: Option<u64>,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub category_name: String,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub total_amount: Decimal,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub count: u64,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub percentage: Decimal,
}

/// One bucket of the cash-flow series; `period` is the server's label
/// (e.g. `2024-03`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowPeriod {
    #[serde(default, deserialize_with = "string_or_empty")]
    pub period: String,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub total_amount: Decimal,
    #[serde(default, deserialize_with = "count_or_zero")]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopTransaction {
    pub id: u64,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub type_name: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub category_name: String,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub amount: Decimal,
    #[serde(default, deserialize_with = "loose_date")]
    pub date: Option<NaiveDate>,
}

/// The five `/{incomes,expenses}/dashboard/*` endpoints.
#[derive(Clone)]
pub struct DashboardFetcher {
    transport: SharedTransport,
}

impl DashboardFetcher {
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }

    /// Dashboard endpoints only honor the date range and cost center.
    fn params(filters: &ReportFilters) -> QueryParams {
        filters.dashboard_scope().to_params()
    }

    pub async fn summary(
        &self,
        flow: Flow,
        filters: &ReportFilters,
    ) -> Result<DashboardSummary, FetchError> {
        fetch_data(&*self.transport, &flow.endpoint("summary"), &Self::params(filters)).await
    }

    pub async fn by_type(
        &self,
        flow: Flow,
        filters: &ReportFilters,
    ) -> Result<Vec<TypeSummary>, FetchError> {
        fetch_data(&*self.transport, &flow.endpoint("by-type"), &Self::params(filters)).await
    }

    pub async fn by_category(
        &self,
        flow: Flow,
        filters: &ReportFilters,
    ) -> Result<Vec<CategorySummary>, FetchError> {
        fetch_data(&*self.transport, &flow.endpoint("by-category"), &Self::params(filters)).await
    }

    pub async fn cash_flow(
        &self,
        flow: Flow,
        filters: &ReportFilters,
    ) -> Result<Vec<CashFlowPeriod>, FetchError> {
        fetch_data(&*self.transport, &flow.endpoint("cash-flow"), &Self::params(filters)).await
    }

    pub async fn top_transactions(
        &self,
        flow: Flow,
        limit: u32,
        filters: &ReportFilters,
    ) -> Result<Vec<TopTransaction>, FetchError> {
        let params = Self::params(filters).with("limit", limit);
        fetch_data(&*self.transport, &flow.endpoint("top-transactions"), &params).await
    }
}
