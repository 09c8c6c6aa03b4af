use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{
    count_or_zero, decimal_or_zero, fetch_data, loose_date, string_or_empty, SharedTransport,
};
use crate::api::{QueryParams, ReportFilters};
use crate::error::FetchError;
use crate::periods::AmountByPeriod;

const RECENT_LIMIT: usize = 10;
const NO_CLIENT: &str = "Sin Cliente";
const NO_CENTER: &str = "Sin Centro";

/// An income document. Income records vary by income type, so fields beyond
/// the common ones are kept verbatim in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeItem {
    #[serde(default)]
    pub id: u64,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub amount: Decimal,
    #[serde(default, deserialize_with = "loose_date")]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomesByClient {
    pub client_id: String,
    pub client_name: String,
    pub client_tax_id: String,
    pub amount: Decimal,
    pub count: u64,
    pub path: String,
    pub has_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomesByCenter {
    pub center_id: u64,
    pub center_name: String,
    pub center_code: String,
    pub amount: Decimal,
    pub count: u64,
    pub path: String,
    pub has_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomesOverview {
    pub total_incomes: Decimal,
    pub pending_count: u64,
    pub recent: Vec<IncomeItem>,
    pub by_client: Vec<IncomesByClient>,
    pub by_center: Vec<IncomesByCenter>,
}

/// Per-client period amounts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomesByPeriod {
    pub client: String,
    pub path: String,
    pub amounts: AmountByPeriod,
}

#[derive(Debug, Deserialize)]
struct ExploreSummary {
    #[serde(default, deserialize_with = "decimal_or_zero")]
    total_incomes: Decimal,
    #[serde(default, deserialize_with = "count_or_zero")]
    pending_count: u64,
}

#[derive(Debug, Deserialize)]
struct ExploreClient {
    #[serde(default, deserialize_with = "string_or_empty")]
    client_tax_id: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    client_name: String,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    total_amount: Decimal,
    #[serde(default, deserialize_with = "count_or_zero")]
    income_count: u64,
}

#[derive(Debug, Deserialize)]
struct ExploreCenter {
    #[serde(default)]
    center_id: Option<u64>,
    #[serde(default, deserialize_with = "string_or_empty")]
    center_name: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    center_code: String,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    total_amount: Decimal,
    #[serde(default, deserialize_with = "count_or_zero")]
    income_count: u64,
}

#[derive(Debug, Deserialize)]
struct ExploreResponse {
    summary: ExploreSummary,
    #[serde(default)]
    items: Vec<IncomeItem>,
    #[serde(default)]
    by_client: Vec<ExploreClient>,
    #[serde(default)]
    by_center: Vec<ExploreCenter>,
}

#[derive(Debug, Deserialize)]
struct PeriodRow {
    #[serde(default, deserialize_with = "string_or_empty")]
    client_name: String,
    #[serde(default, deserialize_with = "string_or_empty")]
    period_key: String,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    total_amount: Decimal,
}

fn client_path(segment: &str) -> String {
    format!("/ingresos/client/{}", urlencoding::encode(segment))
}

fn or_default(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}

#[derive(Clone)]
pub struct IncomesFetcher {
    transport: SharedTransport,
}

impl IncomesFetcher {
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }

    fn params(filters: &ReportFilters) -> QueryParams {
        ReportFilters {
            category_id: None,
            date_from: None,
            date_to: None,
            ..filters.clone()
        }
        .to_params()
    }

    /// Totals, the ten most recent incomes, and breakdowns by client and by
    /// cost center.
    pub async fn explore(&self, filters: &ReportFilters) -> Result<IncomesOverview, FetchError> {
        let response: ExploreResponse =
            fetch_data(&*self.transport, "/ingresos/explore", &Self::params(filters)).await?;

        let by_client = response
            .by_client
            .into_iter()
            .enumerate()
            .map(|(index, client)| {
                let tax_id = client.client_tax_id;
                let path = if tax_id.is_empty() {
                    client_path("sin-cliente")
                } else {
                    client_path(&tax_id)
                };
                IncomesByClient {
                    client_id: if tax_id.is_empty() { index.to_string() } else { tax_id.clone() },
                    client_name: or_default(client.client_name, NO_CLIENT),
                    client_tax_id: tax_id,
                    amount: client.total_amount,
                    count: client.income_count,
                    path,
                    has_data: client.income_count > 0,
                }
            })
            .collect();

        let by_center = response
            .by_center
            .into_iter()
            .enumerate()
            .map(|(index, center)| {
                let center_id = center.center_id.unwrap_or(index as u64 + 1);
                IncomesByCenter {
                    center_id,
                    center_name: or_default(center.center_name, NO_CENTER),
                    center_code: center.center_code,
                    amount: center.total_amount,
                    count: center.income_count,
                    path: format!("/ingresos/center/{center_id}"),
                    has_data: center.income_count > 0,
                }
            })
            .collect();

        let mut recent = response.items;
        recent.truncate(RECENT_LIMIT);

        Ok(IncomesOverview {
            total_incomes: response.summary.total_incomes,
            pending_count: response.summary.pending_count,
            recent,
            by_client,
            by_center,
        })
    }

    /// Income amounts per client and server-side period key, in order of
    /// first appearance.
    pub async fn by_period(
        &self,
        filters: &ReportFilters,
    ) -> Result<Vec<IncomesByPeriod>, FetchError> {
        let rows: Vec<PeriodRow> =
            fetch_data(&*self.transport, "/ingresos/by-period", &Self::params(filters)).await?;

        let mut grouped: Vec<IncomesByPeriod> = Vec::new();
        for row in rows {
            let client = or_default(row.client_name, NO_CLIENT);
            let position = match grouped.iter().position(|g| g.client == client) {
                Some(position) => position,
                None => {
                    grouped.push(IncomesByPeriod {
                        path: client_path(&client),
                        client,
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
