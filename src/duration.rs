//! Human-readable durations for config values like "30s", "5m", "1500ms".

use std::time::Duration;

use anyhow::{Context, Result};
use serde::{de, Deserialize, Deserializer, Serializer};

const MS_PER_SECOND: u64 = 1000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Parse a duration string like "1500ms", "30s", "5m", "2h", "1d".
///
/// The input is case-insensitive and whitespace is trimmed.
///
/// ```
/// use costboard::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
/// assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    // "ms" has to be checked before "m" and "s".
    let (num, unit_ms) = if let Some(num) = s.strip_suffix("ms") {
        (num, 1)
    } else if let Some(num) = s.strip_suffix('d') {
        (num, MS_PER_DAY)
    } else if let Some(num) = s.strip_suffix('h') {
        (num, MS_PER_HOUR)
    } else if let Some(num) = s.strip_suffix('m') {
        (num, MS_PER_MINUTE)
    } else if let Some(num) = s.strip_suffix('s') {
        (num, MS_PER_SECOND)
    } else {
        anyhow::bail!("Duration must end with ms, s, m, h, or d");
    };

    let num: u64 = num
        .trim()
        .parse()
        .with_context(|| format!("Invalid number in duration: {s:?}"))?;
    let millis = num.checked_mul(unit_ms).context("Duration is too large")?;

    Ok(Duration::from_millis(millis))
}

/// Format a duration using the largest unit that divides it evenly.
pub fn format_duration(d: Duration) -> String {
    let ms = u64::try_from(d.as_millis()).unwrap_or(u64::MAX);

    if ms == 0 {
        "0s".to_string()
    } else if ms.is_multiple_of(MS_PER_DAY) {
        format!("{}d", ms / MS_PER_DAY)
    } else if ms.is_multiple_of(MS_PER_HOUR) {
        format!("{}h", ms / MS_PER_HOUR)
    } else if ms.is_multiple_of(MS_PER_MINUTE) {
        format!("{}m", ms / MS_PER_MINUTE)
    } else if ms.is_multiple_of(MS_PER_SECOND) {
        format!("{}s", ms / MS_PER_SECOND)
    } else {
        format!("{ms}ms")
    }
}

/// Use with `#[serde(deserialize_with = "deserialize_duration")]`.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}

/// Use with `#[serde(serialize_with = "serialize_duration")]`.
pub fn serialize_duration<S>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&format_duration(*d))
}
