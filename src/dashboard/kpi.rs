use rust_decimal::Decimal;
use serde::Serialize;

use super::ConsolidatedData;
use crate::fetchers::DashboardSummary;

/// Ratios and deltas derived from the income and expense summaries.
///
/// Growth figures are the server's trend percentages, not recomputed here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FinancialKPIs {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_cash_flow: Decimal,
    /// Net cash flow as a percentage of income; zero when there is no income.
    pub profit_margin: Decimal,
    pub income_growth: Decimal,
    pub expense_growth: Decimal,
    pub cash_flow_growth: Decimal,
    pub income_count: u64,
    pub expense_count: u64,
}

pub fn calculate_kpis(data: &ConsolidatedData) -> FinancialKPIs {
    kpis_from_summaries(&data.income.summary, &data.expense.summary)
}

pub fn kpis_from_summaries(income: &DashboardSummary, expense: &DashboardSummary) -> FinancialKPIs {
    let total_income = income.total_amount;
    let total_expense = expense.total_amount;
    let net_cash_flow = total_income - total_expense;

    let profit_margin = if total_income > Decimal::ZERO {
        net_cash_flow
            .checked_div(total_income)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .unwrap_or_default()
    } else {
        Decimal::ZERO
    };

    let income_growth = income.trend_percentage;
    let expense_growth = expense.trend_percentage;

    FinancialKPIs {
        total_income,
        total_expense,
        net_cash_flow,
        profit_margin,
        income_growth,
        expense_growth,
        cash_flow_growth: income_growth - expense_growth,
        income_count: income.total_count,
        expense_count: expense.total_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn summary(total: i64, count: u64, trend: &str) -> DashboardSummary {
        DashboardSummary {
            total_amount: Decimal::from(total),
            total_count: count,
            average_amount: Decimal::ZERO,
            trend_percentage: Decimal::from_str(trend).unwrap(),
        }
    }

    #[test]
    fn margin_and_net_flow() {
        let kpis = kpis_from_summaries(&summary(1_000_000, 12, "8.5"), &summary(750_000, 40, "2"));
        assert_eq!(kpis.net_cash_flow, Decimal::from(250_000));
        assert_eq!(kpis.profit_margin, Decimal::from(25));
        assert_eq!(kpis.cash_flow_growth, Decimal::from_str("6.5").unwrap());
        assert_eq!(kpis.income_count, 12);
        assert_eq!(kpis.expense_count, 40);
    }

    #[test]
    fn zero_income_means_zero_margin() {
        let kpis = kpis_from_summaries(&summary(0, 0, "0"), &summary(500, 3, "-4"));
        assert_eq!(kpis.profit_margin, Decimal::ZERO);
        assert_eq!(kpis.net_cash_flow, Decimal::from(-500));
        assert_eq!(kpis.cash_flow_growth, Decimal::from(4));
    }

    #[test]
    fn losses_give_negative_margin() {
        let kpis = kpis_from_summaries(&summary(200, 1, "0"), &summary(300, 1, "0"));
        assert_eq!(kpis.profit_margin, Decimal::from(-50));
    }
}
