use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::DisplayConfig;

fn group_int_digits(int_part: &str, separator: &str) -> String {
    let mut out = String::with_capacity(int_part.len() + int_part.len() / 3 * separator.len());
    let len = int_part.len();
    for (i, ch) in int_part.chars().enumerate() {
        out.push(ch);
        let remaining = len.saturating_sub(i + 1);
        if remaining > 0 && remaining % 3 == 0 {
            out.push_str(separator);
        }
    }
    out
}

fn pad_fraction_to_dp(frac_part: &str, dp: u32) -> String {
    let mut out: String = frac_part.chars().take(dp as usize).collect();
    while out.len() < dp as usize {
        out.push('0');
    }
    out
}

/// Render an unsigned decimal with the configured separators and exactly
/// `dp` decimal places.
fn render_number(abs: Decimal, dp: u32, display: &DisplayConfig) -> String {
    let plain = abs.to_string();
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), ""));

    let mut out = group_int_digits(int_part, &display.thousands_separator);
    if dp > 0 {
        out.push_str(&display.decimal_separator);
        out.push_str(&pad_fraction_to_dp(frac_part, dp));
    }
    out
}

fn round(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a monetary amount for human display, e.g. `$1.234.567` or
/// `-$8.500`.
///
/// Rounds half away from zero to `currency_decimals`. JSON output is never
/// routed through here.
pub fn format_amount(value: Decimal, display: &DisplayConfig) -> String {
    let dp = display.currency_decimals;
    let rounded = round(value, dp);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&display.currency_symbol);
    out.push_str(&render_number(rounded.abs(), dp, display));
    out
}

/// Format a percentage with one decimal place, e.g. `23,5%`.
pub fn format_percentage(value: Decimal, display: &DisplayConfig) -> String {
    let rounded = round(value, 1);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&render_number(rounded.abs(), 1, display));
    out.push('%');
    out
}
