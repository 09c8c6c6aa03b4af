//! Consolidated income/expense snapshot.
//!
//! [`ConsolidatedDashboardService::fetch_all_data`] is atomic: all eight
//! aggregate queries must succeed or the whole snapshot fails. The
//! supplementary widgets (operational metrics, top transactions) degrade to
//! zeros and empty lists instead.

pub mod kpi;

pub use kpi::{calculate_kpis, kpis_from_summaries, FinancialKPIs};

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::api::{ApiTransport, CostCenterScope, ReportFilters};
use crate::error::FetchError;
use crate::fetchers::{
    CashFlowPeriod, CatalogFetcher, CategorySummary, DashboardFetcher, DashboardSummary, Flow,
    TopTransaction, TypeSummary,
};

/// Every dashboard dimension of one flow.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionalView {
    pub summary: DashboardSummary,
    pub by_type: Vec<TypeSummary>,
    pub by_category: Vec<CategorySummary>,
    pub cash_flow: Vec<CashFlowPeriod>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidatedData {
    pub income: DimensionalView,
    pub expense: DimensionalView,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OperationalMetrics {
    pub cost_centers_count: usize,
    pub income_types_count: usize,
    pub expense_types_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TopTransactions {
    pub income: Vec<TopTransaction>,
    pub expense: Vec<TopTransaction>,
}

#[derive(Clone)]
pub struct ConsolidatedDashboardService {
    dashboard: DashboardFetcher,
    catalog: CatalogFetcher,
}

impl ConsolidatedDashboardService {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            dashboard: DashboardFetcher::new(transport.clone()),
            catalog: CatalogFetcher::new(transport),
        }
    }

    /// Summary, by-type, by-category and cash flow for both flows, fetched
    /// concurrently. The first failure aborts the snapshot.
    pub async fn fetch_all_data(
        &self,
        filters: &ReportFilters,
    ) -> Result<ConsolidatedData, FetchError> {
        let d = &self.dashboard;
        let result = tokio::try_join!(
            d.summary(Flow::Income, filters),
            d.by_type(Flow::Income, filters),
            d.by_category(Flow::Income, filters),
            d.cash_flow(Flow::Income, filters),
            d.summary(Flow::Expense, filters),
            d.by_type(Flow::Expense, filters),
            d.by_category(Flow::Expense, filters),
            d.cash_flow(Flow::Expense, filters),
        );

        let (
            income_summary,
            income_by_type,
            income_by_category,
            income_cash_flow,
            expense_summary,
            expense_by_type,
            expense_by_category,
            expense_cash_flow,
        ) = result.map_err(|err| {
            error!(
                path = err.path(),
                kind = ?err.kind(),
                error = %err,
                "consolidated dashboard fetch failed"
            );
            err
        })?;

        info!(
            income_total = %income_summary.total_amount,
            expense_total = %expense_summary.total_amount,
            "consolidated dashboard fetched"
        );

        Ok(ConsolidatedData {
            income: DimensionalView {
                summary: income_summary,
                by_type: income_by_type,
                by_category: income_by_category,
                cash_flow: income_cash_flow,
            },
            expense: DimensionalView {
                summary: expense_summary,
                by_type: expense_by_type,
                by_category: expense_by_category,
                cash_flow: expense_cash_flow,
            },
        })
    }

    pub fn calculate_kpis(&self, data: &ConsolidatedData) -> FinancialKPIs {
        calculate_kpis(data)
    }

    /// Counts of active cost centers, income types and expense types.
    ///
    /// With a specific cost center the center count is 1. A source with no
    /// list counts zero on its own; a failed request yields all zeros.
    pub async fn operational_metrics(&self, cost_center: CostCenterScope) -> OperationalMetrics {
        let c = &self.catalog;
        match tokio::try_join!(c.income_types(), c.expense_types(), c.cost_centers()) {
            Ok((income_types, expense_types, cost_centers)) => OperationalMetrics {
                cost_centers_count: match cost_center {
                    CostCenterScope::Id(_) => 1,
                    CostCenterScope::All => cost_centers.iter().filter(|cc| cc.is_active()).count(),
                },
                income_types_count: income_types.len(),
                expense_types_count: expense_types.len(),
            },
            Err(err) => {
                warn!(
                    path = err.path(),
                    error = %err,
                    "operational metrics unavailable, reporting zeros"
                );
                OperationalMetrics::default()
            }
        }
    }

    /// Top `limit` income and expense transactions. Each side falls back to
    /// an empty list on its own.
    pub async fn top_transactions(&self, limit: u32, filters: &ReportFilters) -> TopTransactions {
        let d = &self.dashboard;
        let (income, expense) = tokio::join!(
            d.top_transactions(Flow::Income, limit, filters),
            d.top_transactions(Flow::Expense, limit, filters),
        );

        TopTransactions {
            income: or_empty(Flow::Income, income),
            expense: or_empty(Flow::Expense, expense),
        }
    }
}

fn or_empty(flow: Flow, result: Result<Vec<TopTransaction>, FetchError>) -> Vec<TopTransaction> {
    result.unwrap_or_else(|err| {
        warn!(%flow, path = err.path(), error = %err, "top transactions unavailable");
        Vec::new()
    })
}
