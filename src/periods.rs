//! Calendar periods and the per-period amount tables built over them.
//!
//! A report request generates one ordered sequence of [`Period`]s for a year
//! and granularity. Identifiers carry the granularity in their prefix
//! (`week-<n>`, `month-<n>`, `quarter-<n>`, or a bare year for annual
//! reports), which is how [`resolve_period`] decides which arithmetic to apply.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Highest week number handed out; later days of the year fold into it.
pub const MAX_WEEK: u32 = 52;

const MONTH_LABELS: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Weekly,
    Monthly,
    Quarterly,
    Annual,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid period type {value:?}. Use: weekly, monthly, quarterly, annual")]
pub struct ParseGranularityError {
    value: String,
}

impl Granularity {
    /// Wire value of the `period_type` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Weekly => "weekly",
            Granularity::Monthly => "monthly",
            Granularity::Quarterly => "quarterly",
            Granularity::Annual => "annual",
        }
    }

    /// Infers the granularity from the shape of a period identifier.
    ///
    /// Anything without a known prefix is treated as an annual (bare year) id.
    pub fn of_period_id(id: &str) -> Self {
        if id.starts_with("week-") {
            Granularity::Weekly
        } else if id.starts_with("month-") {
            Granularity::Monthly
        } else if id.starts_with("quarter-") {
            Granularity::Quarterly
        } else {
            Granularity::Annual
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ParseGranularityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            "quarterly" => Ok(Granularity::Quarterly),
            "annual" | "yearly" => Ok(Granularity::Annual),
            _ => Err(ParseGranularityError {
                value: s.to_string(),
            }),
        }
    }
}

/// One calendar bucket of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Period {
    pub id: String,
    pub label: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Period {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            start_date,
            end_date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Generate the ordered period sequence for `year`.
///
/// Week 52 runs through Dec 31 so that it covers the days [`resolve_period`]
/// clamps into it. Years outside chrono's supported range yield an empty
/// sequence.
pub fn build_periods(year: i32, granularity: Granularity) -> Vec<Period> {
    build_periods_inner(year, granularity).unwrap_or_default()
}

fn build_periods_inner(year: i32, granularity: Granularity) -> Option<Vec<Period>> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let dec31 = NaiveDate::from_ymd_opt(year, 12, 31)?;

    let periods = match granularity {
        Granularity::Weekly => (1..=MAX_WEEK)
            .map(|week| {
                let start = jan1 + Duration::days(7 * (week as i64 - 1));
                let end = if week == MAX_WEEK {
                    dec31
                } else {
                    start + Duration::days(6)
                };
                Period::new(format!("week-{week}"), format!("Semana {week}"), start, end)
            })
            .collect(),
        Granularity::Monthly => {
            let mut periods = Vec::with_capacity(12);
            for month in 1..=12u32 {
                let start = NaiveDate::from_ymd_opt(year, month, 1)?;
                let end = month_end(year, month)?;
                periods.push(Period::new(
                    format!("month-{month}"),
                    MONTH_LABELS[month as usize - 1],
                    start,
                    end,
                ));
            }
            periods
        }
        Granularity::Quarterly => {
            let mut periods = Vec::with_capacity(4);
            for quarter in 1..=4u32 {
                let first_month = (quarter - 1) * 3 + 1;
                let start = NaiveDate::from_ymd_opt(year, first_month, 1)?;
                let end = month_end(year, first_month + 2)?;
                periods.push(Period::new(
                    format!("quarter-{quarter}"),
                    format!("T{quarter}"),
                    start,
                    end,
                ));
            }
            periods
        }
        Granularity::Annual => vec![Period::new(year.to_string(), year.to_string(), jan1, dec31)],
    };

    Some(periods)
}

fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let next_start = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    next_start.pred_opt()
}

/// Map `date` to a period identifier using the granularity of `periods`.
///
/// Returns `None` for an empty sequence. The returned id is computed from the
/// date alone; it is not checked for membership in `periods`.
pub fn resolve_period(date: NaiveDate, periods: &[Period]) -> Option<String> {
    let first = periods.first()?;

    let id = match Granularity::of_period_id(&first.id) {
        Granularity::Weekly => {
            // ceil((days_since_jan1 + 1) / 7)
            let week = date.ordinal0() / 7 + 1;
            format!("week-{}", week.min(MAX_WEEK))
        }
        Granularity::Monthly => format!("month-{}", date.month()),
        Granularity::Quarterly => format!("quarter-{}", date.month0() / 3 + 1),
        Granularity::Annual => date.year().to_string(),
    };

    Some(id)
}

/// Amounts keyed by period id, in period order.
///
/// Tables built from [`empty_periods`] hold an entry for every requested
/// period; [`AmountByPeriod::accumulate`] never adds new keys to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmountByPeriod {
    entries: Vec<(String, Decimal)>,
}

impl AmountByPeriod {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, period_id: &str) -> Option<Decimal> {
        self.entries
            .iter()
            .find(|(id, _)| id == period_id)
            .map(|(_, amount)| *amount)
    }

    /// Amount for `period_id`, zero when the period is absent.
    pub fn amount(&self, period_id: &str) -> Decimal {
        self.get(period_id).unwrap_or_default()
    }

    /// Add `amount` to an existing period. Returns false if the period is unknown.
    pub fn accumulate(&mut self, period_id: &str, amount: Decimal) -> bool {
        match self.entries.iter_mut().find(|(id, _)| id == period_id) {
            Some((_, total)) => {
                *total += amount;
                true
            }
            None => false,
        }
    }

    /// Add `amount` to a period, appending the period if it is not present yet.
    pub fn insert_or_add(&mut self, period_id: impl Into<String>, amount: Decimal) {
        let period_id = period_id.into();
        if !self.accumulate(&period_id, amount) {
            self.entries.push((period_id, amount));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.entries.iter().map(|(id, amount)| (id.as_str(), *amount))
    }

    pub fn period_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum over all periods.
    pub fn total(&self) -> Decimal {
        self.entries.iter().map(|(_, amount)| *amount).sum()
    }
}

impl FromIterator<(String, Decimal)> for AmountByPeriod {
    fn from_iter<I: IntoIterator<Item = (String, Decimal)>>(iter: I) -> Self {
        let mut table = AmountByPeriod::new();
        for (id, amount) in iter {
            table.insert_or_add(id, amount);
        }
        table
    }
}

impl Serialize for AmountByPeriod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, amount) in &self.entries {
            map.serialize_entry(id, amount)?;
        }
        map.end()
    }
}

/// Zero-filled table with one entry per period, keyed by `periods[i].id`.
pub fn empty_periods(periods: &[Period]) -> AmountByPeriod {
    periods
        .iter()
        .map(|period| (period.id.clone(), Decimal::ZERO))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn resolve_returns_none_for_empty_sequence() {
        assert_eq!(resolve_period(date(2024, 3, 1), &[]), None);
    }

    #[test]
    fn resolve_weekly_counts_from_jan_first() {
        let periods = build_periods(2024, Granularity::Weekly);
        assert_eq!(resolve_period(date(2024, 1, 1), &periods).unwrap(), "week-1");
        assert_eq!(resolve_period(date(2024, 1, 7), &periods).unwrap(), "week-1");
        assert_eq!(resolve_period(date(2024, 1, 8), &periods).unwrap(), "week-2");
        assert_eq!(resolve_period(date(2024, 3, 1), &periods).unwrap(), "week-9");
    }

    #[test]
    fn resolve_weekly_clamps_to_week_52() {
        let periods = build_periods(2023, Granularity::Weekly);
        // Dec 31 of a leap year is day 366, i.e. week 53 before clamping.
        for d in [date(2024, 12, 31), date(2024, 12, 30), date(2023, 12, 31)] {
            assert_eq!(resolve_period(d, &periods).unwrap(), "week-52");
        }
        for day in 24..=31 {
            let id = resolve_period(date(2025, 12, day), &periods).unwrap();
            let n: u32 = id.trim_start_matches("week-").parse().unwrap();
            assert!(n <= MAX_WEEK, "{id} exceeds week 52");
        }
    }

    #[test]
    fn resolve_monthly_quarterly_and_annual() {
        let monthly = build_periods(2024, Granularity::Monthly);
        let quarterly = build_periods(2024, Granularity::Quarterly);
        let annual = build_periods(2024, Granularity::Annual);

        assert_eq!(resolve_period(date(2024, 1, 31), &monthly).unwrap(), "month-1");
        assert_eq!(resolve_period(date(2024, 12, 1), &monthly).unwrap(), "month-12");
        assert_eq!(resolve_period(date(2024, 3, 31), &quarterly).unwrap(), "quarter-1");
        assert_eq!(resolve_period(date(2024, 4, 1), &quarterly).unwrap(), "quarter-2");
        assert_eq!(resolve_period(date(2024, 12, 31), &quarterly).unwrap(), "quarter-4");
        assert_eq!(resolve_period(date(2024, 6, 15), &annual).unwrap(), "2024");
    }

    #[test]
    fn granularity_is_inferred_from_first_period_only() {
        let periods = vec![
            Period::new("quarter-1", "T1", date(2024, 1, 1), date(2024, 3, 31)),
            Period::new("month-4", "Abr", date(2024, 4, 1), date(2024, 4, 30)),
        ];
        assert_eq!(resolve_period(date(2024, 5, 2), &periods).unwrap(), "quarter-2");
    }

    #[test]
    fn resolve_is_deterministic() {
        let periods = build_periods(2024, Granularity::Weekly);
        let d = date(2024, 8, 19);
        assert_eq!(resolve_period(d, &periods), resolve_period(d, &periods));
    }

    #[test]
    fn every_day_resolves_to_the_period_containing_it() {
        for granularity in [
            Granularity::Weekly,
            Granularity::Monthly,
            Granularity::Quarterly,
            Granularity::Annual,
        ] {
            for year in [2023, 2024] {
                let periods = build_periods(year, granularity);
                let mut day = date(year, 1, 1);
                while day.year() == year {
                    let id = resolve_period(day, &periods).unwrap();
                    let period = periods
                        .iter()
                        .find(|p| p.id == id)
                        .unwrap_or_else(|| panic!("{id} not generated for {granularity}"));
                    assert!(period.contains(day), "{day} not inside {id}");
                    day = day.succ_opt().unwrap();
                }
            }
        }
    }

    #[test]
    fn build_periods_shapes() {
        let weekly = build_periods(2024, Granularity::Weekly);
        assert_eq!(weekly.len(), 52);
        assert_eq!(weekly[51].end_date, date(2024, 12, 31));

        let monthly = build_periods(2024, Granularity::Monthly);
        assert_eq!(monthly.len(), 12);
        assert_eq!(monthly[1].end_date, date(2024, 2, 29));
        assert_eq!(monthly[1].label, "Feb");

        let quarterly = build_periods(2023, Granularity::Quarterly);
        assert_eq!(quarterly.len(), 4);
        assert_eq!(quarterly[3].start_date, date(2023, 10, 1));
        assert_eq!(quarterly[3].end_date, date(2023, 12, 31));

        let annual = build_periods(2024, Granularity::Annual);
        assert_eq!(annual.len(), 1);
        assert_eq!(annual[0].id, "2024");

        let ids: std::collections::HashSet<_> = weekly.iter().map(|p| &p.id).collect();
        assert_eq!(ids.len(), weekly.len());
    }

    #[test]
    fn empty_periods_has_one_zero_per_period() {
        for granularity in [Granularity::Weekly, Granularity::Monthly, Granularity::Annual] {
            let periods = build_periods(2024, granularity);
            let table = empty_periods(&periods);
            assert_eq!(table.len(), periods.len());
            for (period, (id, amount)) in periods.iter().zip(table.iter()) {
                assert_eq!(period.id, id);
                assert_eq!(amount, Decimal::ZERO);
            }
        }
        assert!(empty_periods(&[]).is_empty());
    }

    #[test]
    fn accumulate_only_touches_known_periods() {
        let periods = build_periods(2024, Granularity::Quarterly);
        let mut table = empty_periods(&periods);
        assert!(table.accumulate("quarter-2", Decimal::from(40)));
        assert!(table.accumulate("quarter-2", Decimal::from(2)));
        assert!(!table.accumulate("quarter-5", Decimal::from(1)));
        assert_eq!(table.amount("quarter-2"), Decimal::from(42));
        assert_eq!(table.len(), 4);
        assert_eq!(table.total(), Decimal::from(42));
    }

    #[test]
    fn serializes_in_period_order() {
        let periods = build_periods(2024, Granularity::Monthly);
        let mut table = empty_periods(&periods[8..11]);
        table.accumulate("month-10", Decimal::new(1250, 2));
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"month-9":"0","month-10":"12.50","month-11":"0"}"#);
    }

    #[test]
    fn granularity_parses_wire_values() {
        assert_eq!("monthly".parse::<Granularity>().unwrap(), Granularity::Monthly);
        assert_eq!(" Yearly ".parse::<Granularity>().unwrap(), Granularity::Annual);
        assert!("daily".parse::<Granularity>().is_err());
        assert_eq!(Granularity::Quarterly.to_string(), "quarterly");
    }
}
