use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

use super::{decimal_or_zero, fetch_data, loose_date, SharedTransport};
use crate::api::{CostCenterScope, QueryParams};
use crate::categories::{category_key, CategoryDescriptor, CategoryType, FixedCategory};
use crate::error::FetchError;
use crate::periods::{empty_periods, resolve_period, AmountByPeriod, Granularity, Period};

const ACCOUNT_CATEGORIES_BY_PERIOD: &str = "/account-categories/by-period";

/// One aggregated ledger bucket as returned by the `by-period` endpoints.
///
/// The server either pre-buckets (`period_key`) or returns the posting date,
/// in which case the row is bucketed locally.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LedgerRow {
    #[serde(default)]
    pub period_key: Option<String>,
    #[serde(default, deserialize_with = "loose_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    pub total_amount: Decimal,
}

impl LedgerRow {
    /// The period this row belongs to, if it can be determined.
    pub fn period_id(&self, periods: &[Period]) -> Option<String> {
        match (self.period_key.as_deref().map(str::trim), self.date) {
            (Some(key), _) if !key.is_empty() => Some(key.to_string()),
            (_, Some(date)) => resolve_period(date, periods),
            _ => None,
        }
    }
}

/// Rows may name their category with `category_*` fields, the short
/// `id`/`code`/`name`/`type` forms, or both. The long form wins.
#[derive(Debug, Deserialize)]
struct AccountCategoryRow {
    #[serde(default)]
    category_id: Option<u64>,
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    category_code: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    category_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    category_type: Option<CategoryType>,
    #[serde(default, rename = "type")]
    short_type: Option<CategoryType>,
    #[serde(default)]
    group_name: Option<String>,
    #[serde(default)]
    period_key: Option<String>,
    #[serde(default, deserialize_with = "loose_date")]
    date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "decimal_or_zero")]
    total_amount: Decimal,
}

impl AccountCategoryRow {
    fn split(self) -> (CategoryDescriptor, LedgerRow) {
        let category_type = self
            .category_type
            .or(self.short_type)
            .unwrap_or_else(|| CategoryType::Other("otros".to_string()));
        let mut descriptor = CategoryDescriptor::new(
            self.category_id.or(self.id).unwrap_or_default(),
            self.category_code.or(self.code).unwrap_or_default(),
            self.category_name.or(self.name).unwrap_or_default(),
            category_type,
        );
        descriptor.group_name = self.group_name;
        let row = LedgerRow {
            period_key: self.period_key,
            date: self.date,
            total_amount: self.total_amount,
        };
        (descriptor, row)
    }
}

/// Fold rows into a zero-filled series over `periods`.
///
/// Rows outside the sequence are dropped; several rows for one period add up.
pub fn bucket_rows<'a>(
    source: &str,
    rows: impl IntoIterator<Item = &'a LedgerRow>,
    periods: &[Period],
) -> AmountByPeriod {
    let mut amounts = empty_periods(periods);
    for row in rows {
        let period = row.period_id(periods);
        let kept = period
            .as_deref()
            .is_some_and(|id| amounts.accumulate(id, row.total_amount));
        if !kept {
            debug!(
                source,
                period = ?period,
                amount = %row.total_amount,
                "dropping row outside requested periods"
            );
        }
    }
    amounts
}

/// The four legacy `/financial/*` endpoints plus the dynamic account
/// category ledger.
#[derive(Clone)]
pub struct LedgerFetcher {
    transport: SharedTransport,
}

impl LedgerFetcher {
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }

    fn params(periods: &[Period], year: i32, cost_center: CostCenterScope) -> QueryParams {
        let mut params = QueryParams::new();
        if let Some(first) = periods.first() {
            params.insert("period_type", Granularity::of_period_id(&first.id).as_str());
        }
        params.insert("year", format!("{year:04}"));
        params.insert_cost_center(cost_center);
        params
    }

    /// Period series of one fixed legacy category.
    pub async fn fixed_category_amounts(
        &self,
        category: FixedCategory,
        periods: &[Period],
        year: i32,
        cost_center: CostCenterScope,
    ) -> Result<AmountByPeriod, FetchError> {
        let path = format!("/financial/{}/by-period", category.slug());
        let rows: Vec<LedgerRow> =
            fetch_data(&*self.transport, &path, &Self::params(periods, year, cost_center)).await?;
        debug!(category = category.key(), rows = rows.len(), "fixed category rows");
        Ok(bucket_rows(category.key(), &rows, periods))
    }

    /// Period series of every account category with activity, keyed by
    /// [`category_key`], in order of first appearance.
    ///
    /// Categories whose keys collide share one series; the first descriptor
    /// seen is kept.
    pub async fn account_category_amounts(
        &self,
        periods: &[Period],
        year: i32,
        cost_center: CostCenterScope,
    ) -> Result<Vec<(CategoryDescriptor, AmountByPeriod)>, FetchError> {
        let rows: Vec<AccountCategoryRow> = fetch_data(
            &*self.transport,
            ACCOUNT_CATEGORIES_BY_PERIOD,
            &Self::params(periods, year, cost_center),
        )
        .await?;
        debug!(rows = rows.len(), "account category rows");

        let mut grouped: Vec<(String, CategoryDescriptor, Vec<LedgerRow>)> = Vec::new();
        for row in rows {
            let (descriptor, row) = row.split();
            let key = category_key(&descriptor);
            match grouped.iter_mut().find(|(k, _, _)| *k == key) {
                Some((_, _, bucket)) => bucket.push(row),
                None => grouped.push((key, descriptor, vec![row])),
            }
        }

        Ok(grouped
            .into_iter()
            .map(|(key, descriptor, rows)| (descriptor, bucket_rows(&key, &rows, periods)))
            .collect())
    }
}
