//! Output shaping for the command line: JSON documents and the text period
//! table.

use std::fmt::Write as _;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::aggregation::{dynamic_category_rows, FinancialDataByPeriod};
use crate::categories::{CategoryDescriptor, FixedCategory};
use crate::config::{Config, DisplayConfig};
use crate::dashboard::{ConsolidatedData, FinancialKPIs};
use crate::duration::format_duration;
use crate::format::{format_amount, format_percentage};
use crate::periods::Period;

pub fn config_output(config_path: &Path, config: &Config) -> serde_json::Value {
    serde_json::json!({
        "config_file": config_path.display().to_string(),
        "api": {
            "base_url": config.api.base_url,
            "timeout": format_duration(config.api.timeout),
            "token_env": config.api.token_env,
        },
        "cache": {
            "enabled": config.cache.enabled,
            "ttl": format_duration(config.cache.ttl),
        },
        "dashboard": config.dashboard,
        "display": config.display,
    })
}

/// Snapshot plus KPIs, with display strings alongside the exact values.
pub fn dashboard_output(
    data: &ConsolidatedData,
    kpis: &FinancialKPIs,
    display: &DisplayConfig,
) -> serde_json::Value {
    serde_json::json!({
        "kpis": kpis,
        "kpis_display": {
            "total_income": format_amount(kpis.total_income, display),
            "total_expense": format_amount(kpis.total_expense, display),
            "net_cash_flow": format_amount(kpis.net_cash_flow, display),
            "profit_margin": format_percentage(kpis.profit_margin, display),
            "cash_flow_growth": format_percentage(kpis.cash_flow_growth, display),
        },
        "income": data.income,
        "expense": data.expense,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableLine {
    pub key: String,
    pub category: String,
    pub path: Option<String>,
    pub amounts: Vec<Decimal>,
    pub total: Decimal,
}

/// The merged period table laid out for display: one line per category,
/// one column per period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodTable {
    pub columns: Vec<String>,
    pub lines: Vec<TableLine>,
    pub totals: Vec<Decimal>,
    pub grand_total: Decimal,
}

impl PeriodTable {
    pub fn build(
        data: &FinancialDataByPeriod,
        periods: &[Period],
        known: &[CategoryDescriptor],
    ) -> Self {
        let column_values = |amounts: &crate::periods::AmountByPeriod| -> Vec<Decimal> {
            periods.iter().map(|p| amounts.amount(&p.id)).collect()
        };

        let mut lines: Vec<TableLine> = FixedCategory::ALL
            .into_iter()
            .filter_map(|category| {
                data.fixed(category).map(|amounts| TableLine {
                    key: category.key().to_string(),
                    category: category.label().to_string(),
                    path: None,
                    amounts: column_values(amounts),
                    total: amounts.total(),
                })
            })
            .collect();

        lines.extend(dynamic_category_rows(data, known).into_iter().map(|row| TableLine {
            amounts: column_values(&row.amounts),
            total: row.amounts.total(),
            key: row.key,
            category: row.category,
            path: Some(row.path),
        }));

        let combined = data.combined_totals();
        Self {
            columns: periods.iter().map(|p| p.label.clone()).collect(),
            lines,
            totals: column_values(&combined),
            grand_total: data.grand_total(),
        }
    }

    /// Fixed-width text rendering with a trailing totals line.
    pub fn render(&self, display: &DisplayConfig) -> String {
        let mut cells: Vec<Vec<String>> = Vec::with_capacity(self.lines.len() + 2);

        let mut header = vec!["Categoría".to_string()];
        header.extend(self.columns.iter().cloned());
        header.push("Total".to_string());
        cells.push(header);

        for line in &self.lines {
            let mut row = vec![line.category.clone()];
            row.extend(line.amounts.iter().map(|a| format_amount(*a, display)));
            row.push(format_amount(line.total, display));
            cells.push(row);
        }

        let mut footer = vec!["Total".to_string()];
        footer.extend(self.totals.iter().map(|a| format_amount(*a, display)));
        footer.push(format_amount(self.grand_total, display));
        cells.push(footer);

        let width_of = |s: &str| s.chars().count();
        let column_count = cells[0].len();
        let widths: Vec<usize> = (0..column_count)
            .map(|i| {
                cells
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|c| width_of(c))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut out = String::new();
        for row in &cells {
            let mut line = String::new();
            for (i, cell) in row.iter().enumerate() {
                let pad = widths[i].saturating_sub(width_of(cell));
                if i == 0 {
                    let _ = write!(line, "{cell}{}", " ".repeat(pad));
                } else {
                    let _ = write!(line, "  {}{cell}", " ".repeat(pad));
                }
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}
