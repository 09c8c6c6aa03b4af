use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    count_or_zero, decimal_or_zero, fetch_data, loose_date, string_or_empty, SharedTransport,
};
use crate::api::{QueryParams, ReportFilters};
use crate::error::FetchError;
use crate::periods::AmountByPeriod;

const RECENT_LIMIT: usize = 10;
const UNCATEGORIZED: &str = "Sin Categoría";

/// A single cost line from the explore endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostItem {
    #[serde(default)]
    pub cost_id: u64,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub transaction_type: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub amount: Decimal,
    #[serde(default, deserialize_with = "loose_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub status: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub cost_center_name: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub category_name: String,
    #[serde(default)]
    pub supplier_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_empty")]
    pub source_type: String,
    #[serde(default)]
    pub period_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostsByCategory {
    pub category_id: u64,
    pub title: String,
    pub amount: Decimal,
    pub count: u64,
    pub path: String,
    pub has_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostsOverview {
    pub total_expenses: Decimal,
    pub pending_count: u64,
    pub recent: Vec<CostItem>,
    pub by_category: Vec<CostsByCategory>,
}

/// Per-category period amounts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostsByPeriod {
    pub category: String,
    pub path: String,
    pub amounts: AmountByPeriod,
}

#[derive(Debug, Deserialize)]
struct ExploreSummary {
    #[serde(default, deserialize_with = "decimal_or_zero")]
    total_expenses: Decimal,
    #[serde(default, deserialize_with = "count_or_zero")]
    pending_count: u64,
}

#[derive(Debug, Deserialize)]
struct ExploreCategory {
    #[serde(default)]
    category_id: Option<u64>,
    #[serde(default, deserialize_with = "string_or_empty")]
    category_name: String,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    total_amount: Decimal,
    #[serde(default, deserialize_with = "count_or_zero")]
    cost_count: u64,
}

#[derive(Debug, Deserialize)]
struct ExploreResponse {
    summary: ExploreSummary,
    #[serde(default)]
    items: Vec<CostItem>,
    #[serde(default)]
    by_category: Vec<ExploreCategory>,
}

#[derive(Debug, Deserialize)]
struct PeriodRow {
    #[serde(default, deserialize_with = "string_or_empty")]
    category_name: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    period_key: String,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    total_amount: Decimal,
}

fn category_path(name: &str) -> String {
    format!("/costs/category/{}", urlencoding::encode(name))
}

fn name_or_default(name: String) -> String {
    if name.trim().is_empty() {
        UNCATEGORIZED.to_string()
    } else {
        name
    }
}

#[derive(Clone)]
pub struct CostsFetcher {
    transport: SharedTransport,
}

impl CostsFetcher {
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }

    fn params(filters: &ReportFilters) -> QueryParams {
        ReportFilters {
            client_id: None,
            date_from: None,
            date_to: None,
            ..filters.clone()
        }
        .to_params()
    }

    /// Totals, the ten most recent costs and the per-category breakdown.
    pub async fn explore(&self, filters: &ReportFilters) -> Result<CostsOverview, FetchError> {
        let response: ExploreResponse =
            fetch_data(&*self.transport, "/costs/explore", &Self::params(filters)).await?;

        let by_category = response
            .by_category
            .into_iter()
            .enumerate()
            .map(|(index, cat)| {
                let path = if cat.category_name.trim().is_empty() {
                    category_path("sin-categoria")
                } else {
                    category_path(&cat.category_name)
                };
                CostsByCategory {
                    category_id: cat.category_id.unwrap_or(index as u64 + 1),
                    title: name_or_default(cat.category_name),
                    amount: cat.total_amount,
                    count: cat.cost_count,
                    path,
                    has_data: cat.cost_count > 0,
                }
            })
            .collect();

        let mut recent = response.items;
        recent.truncate(RECENT_LIMIT);

        Ok(CostsOverview {
            total_expenses: response.summary.total_expenses,
            pending_count: response.summary.pending_count,
            recent,
            by_category,
        })
    }

    /// Cost amounts per category and server-side period key, in order of
    /// first appearance.
    pub async fn by_period(
        &self,
        filters: &ReportFilters,
    ) -> Result<Vec<CostsByPeriod>, FetchError> {
        let rows: Vec<PeriodRow> =
            fetch_data(&*self.transport, "/costs/by-period", &Self::params(filters)).await?;

        let mut grouped: Vec<CostsByPeriod> = Vec::new();
        for row in rows {
            let category = name_or_default(row.category_name);
            let position = match grouped.iter().position(|g| g.category == category) {
                Some(position) => position,
                None => {
                    grouped.push(CostsByPeriod {
                        path: category_path(&category),
                        category,
                        amounts: AmountByPeriod::new(),
                    });
                    grouped.len() - 1
                }
            };
            grouped[position]
                .amounts
                .insert_or_add(row.period_key, row.total_amount);
        }
        Ok(grouped)
    }
}
