//! Period table aggregation: the four fixed legacy categories plus every
//! dynamic account category, fetched concurrently and merged into one
//! table.
//!
//! Sources settle independently. A failed source degrades to zero-filled
//! periods (fixed) or to no dynamic categories at all, and the failure is
//! only logged.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::{info, warn};

use crate::api::{ApiTransport, CostCenterScope};
use crate::categories::{
    category_key, display_name, navigation_path, CategoryDescriptor, FixedCategory,
};
use crate::error::FetchError;
use crate::fetchers::LedgerFetcher;
use crate::periods::{build_periods, empty_periods, AmountByPeriod, Granularity, Period};

/// What to aggregate: an ordered period sequence, its year, and the
/// cost-center scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationRequest {
    pub periods: Vec<Period>,
    pub year: i32,
    pub cost_center: CostCenterScope,
}

impl AggregationRequest {
    /// Request covering the whole of `year` at the given granularity.
    pub fn for_year(year: i32, granularity: Granularity) -> Self {
        Self {
            periods: build_periods(year, granularity),
            year,
            cost_center: CostCenterScope::All,
        }
    }

    pub fn with_periods(periods: Vec<Period>, year: i32) -> Self {
        Self {
            periods,
            year,
            cost_center: CostCenterScope::All,
        }
    }

    pub fn with_cost_center(mut self, cost_center: CostCenterScope) -> Self {
        self.cost_center = cost_center;
        self
    }
}

/// Per-source outcomes of one aggregation fan-out, before fallbacks.
#[derive(Debug)]
pub struct SettledSources {
    /// One entry per fixed category, in [`FixedCategory::ALL`] order.
    pub fixed: Vec<(FixedCategory, Result<AmountByPeriod, FetchError>)>,
    pub dynamic: Result<Vec<(CategoryDescriptor, AmountByPeriod)>, FetchError>,
}

impl SettledSources {
    /// Names of the sources that failed.
    pub fn failed_sources(&self) -> Vec<&'static str> {
        let mut failed: Vec<&'static str> = self
            .fixed
            .iter()
            .filter(|(_, result)| result.is_err())
            .map(|(category, _)| category.key())
            .collect();
        if self.dynamic.is_err() {
            failed.push("accountCategories");
        }
        failed
    }

    /// Apply the fallback policy and merge into the public table shape.
    pub fn collapse(self, periods: &[Period]) -> FinancialDataByPeriod {
        let failed = self.failed_sources().len();

        let fixed = self
            .fixed
            .into_iter()
            .map(|(category, result)| {
                let amounts = result.unwrap_or_else(|err| {
                    warn!(
                        category = category.key(),
                        path = err.path(),
                        kind = ?err.kind(),
                        error = %err,
                        "fixed category failed, using zero-filled periods"
                    );
                    empty_periods(periods)
                });
                (category, amounts)
            })
            .collect();

        let mut data = FinancialDataByPeriod {
            fixed,
            dynamic: Vec::new(),
            descriptors: Vec::new(),
        };

        match self.dynamic {
            Ok(categories) => {
                for (descriptor, amounts) in categories {
                    data.merge_dynamic(descriptor, amounts);
                }
            }
            Err(err) => warn!(
                path = err.path(),
                kind = ?err.kind(),
                error = %err,
                "account categories failed, continuing with fixed categories only"
            ),
        }

        info!(
            periods = periods.len(),
            dynamic_categories = data.dynamic.len(),
            failed_sources = failed,
            "financial data aggregated"
        );
        data
    }
}

/// Merged period table: fixed categories first, then dynamic categories in
/// order of first appearance.
///
/// Serializes as one flat map from category key to period amounts.
#[derive(Debug, Clone, PartialEq)]
pub struct FinancialDataByPeriod {
    fixed: Vec<(FixedCategory, AmountByPeriod)>,
    dynamic: Vec<(String, AmountByPeriod)>,
    descriptors: Vec<CategoryDescriptor>,
}

impl FinancialDataByPeriod {
    fn merge_dynamic(&mut self, descriptor: CategoryDescriptor, amounts: AmountByPeriod) {
        let key = category_key(&descriptor);
        if FixedCategory::is_reserved(&key) {
            warn!(key = %key, "dynamic category key shadows a fixed category, skipping");
            return;
        }
        match self.dynamic.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => {
                for (period_id, amount) in amounts.iter() {
                    existing.insert_or_add(period_id, amount);
                }
            }
            None => {
                self.dynamic.push((key, amounts));
                self.descriptors.push(descriptor);
            }
        }
    }

    pub fn fixed(&self, category: FixedCategory) -> Option<&AmountByPeriod> {
        self.fixed
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, amounts)| amounts)
    }

    pub fn dynamic(&self) -> &[(String, AmountByPeriod)] {
        &self.dynamic
    }

    /// Descriptors of the dynamic categories present, in table order.
    pub fn dynamic_descriptors(&self) -> &[CategoryDescriptor] {
        &self.descriptors
    }

    pub fn get(&self, key: &str) -> Option<&AmountByPeriod> {
        self.iter().find(|(k, _)| *k == key).map(|(_, amounts)| amounts)
    }

    /// Every category, fixed first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AmountByPeriod)> {
        self.fixed
            .iter()
            .map(|(category, amounts)| (category.key(), amounts))
            .chain(self.dynamic.iter().map(|(key, amounts)| (key.as_str(), amounts)))
    }

    /// Sum over all periods of one category; zero for unknown keys.
    pub fn total_for_category(&self, key: &str) -> Decimal {
        self.get(key).map(AmountByPeriod::total).unwrap_or_default()
    }

    /// Per-period sum across every category, over the fixed categories'
    /// period sequence.
    pub fn combined_totals(&self) -> AmountByPeriod {
        let mut totals: AmountByPeriod = self
            .fixed
            .first()
            .map(|(_, amounts)| {
                amounts
                    .period_ids()
                    .map(|id| (id.to_string(), Decimal::ZERO))
                    .collect()
            })
            .unwrap_or_default();
        for (_, amounts) in self.iter() {
            for (period_id, amount) in amounts.iter() {
                totals.accumulate(period_id, amount);
            }
        }
        totals
    }

    pub fn grand_total(&self) -> Decimal {
        self.iter().map(|(_, amounts)| amounts.total()).sum()
    }

    /// Fixed keys in declaration order, then dynamic keys as observed.
    pub fn all_category_keys(&self) -> Vec<String> {
        self.iter().map(|(key, _)| key.to_string()).collect()
    }
}

impl Serialize for FinancialDataByPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fixed.len() + self.dynamic.len()))?;
        for (key, amounts) in self.iter() {
            map.serialize_entry(key, amounts)?;
        }
        map.end()
    }
}

/// A dynamic category ready for display in the period table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialTableRow {
    pub key: String,
    pub category: String,
    pub amounts: AmountByPeriod,
    pub path: String,
}

/// Display rows for the dynamic categories of `data`.
///
/// Names and paths are resolved against `known`; keys missing from it fall
/// back to the lossy name reconstruction.
pub fn dynamic_category_rows(
    data: &FinancialDataByPeriod,
    known: &[CategoryDescriptor],
) -> Vec<FinancialTableRow> {
    data.dynamic()
        .iter()
        .map(|(key, amounts)| FinancialTableRow {
            key: key.clone(),
            category: display_name(key, known),
            amounts: amounts.clone(),
            path: navigation_path(key, known).to_string(),
        })
        .collect()
}

/// Fans out the five ledger queries and merges them.
#[derive(Clone)]
pub struct FinancialAggregationService {
    ledger: LedgerFetcher,
}

impl FinancialAggregationService {
    pub fn new(transport: Arc<dyn ApiTransport>) -> Self {
        Self {
            ledger: LedgerFetcher::new(transport),
        }
    }

    /// Run all five sources concurrently and keep each outcome.
    pub async fn settle_sources(&self, request: &AggregationRequest) -> SettledSources {
        let periods = request.periods.as_slice();
        let (year, cost_center) = (request.year, request.cost_center);
        let ledger = &self.ledger;
        let fixed = move |category| {
            ledger.fixed_category_amounts(category, periods, year, cost_center)
        };

        let (remuneraciones, factoring, previsionales, costos_fijos, dynamic) = tokio::join!(
            fixed(FixedCategory::Remuneraciones),
            fixed(FixedCategory::Factoring),
            fixed(FixedCategory::Previsionales),
            fixed(FixedCategory::CostosFijos),
            ledger.account_category_amounts(periods, year, cost_center),
        );

        SettledSources {
            fixed: vec![
                (FixedCategory::Remuneraciones, remuneraciones),
                (FixedCategory::Factoring, factoring),
                (FixedCategory::Previsionales, previsionales),
                (FixedCategory::CostosFijos, costos_fijos),
            ],
            dynamic,
        }
    }

    /// The merged table. Never fails; see the module docs for the fallback
    /// policy.
    pub async fn all_financial_data(&self, request: &AggregationRequest) -> FinancialDataByPeriod {
        self.settle_sources(request).await.collapse(&request.periods)
    }
}
