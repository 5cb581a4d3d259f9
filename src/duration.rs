//! Human-readable durations for config timeouts: "30s", "2m", "1h", "1d".

use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{de, Deserialize, Deserializer};

const UNITS: [(char, u64); 4] = [('d', 86_400), ('h', 3_600), ('m', 60), ('s', 1)];

/// Parses `<number><unit>` with unit one of `d`, `h`, `m`, `s`.
/// Case-insensitive; surrounding whitespace is ignored.
///
/// ```
/// use nftbook::duration::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
/// assert_eq!(parse_duration("2M").unwrap(), Duration::from_secs(120));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    let Some(unit) = s.chars().last() else {
        bail!("Duration is empty");
    };
    let Some(&(_, secs_per_unit)) = UNITS.iter().find(|(u, _)| *u == unit) else {
        bail!("Duration must end with d, h, m, or s");
    };

    let count: u64 = s[..s.len() - 1]
        .trim()
        .parse()
        .context("Invalid number in duration")?;
    let secs = count
        .checked_mul(secs_per_unit)
        .context("Duration is too large")?;
    Ok(Duration::from_secs(secs))
}

/// Formats using the largest unit that divides the duration evenly.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    UNITS
        .iter()
        .find(|(_, per)| secs != 0 && secs % per == 0)
        .map(|(unit, per)| format!("{}{}", secs / per, unit))
        .unwrap_or_else(|| format!("{secs}s"))
}

pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_duration(&s).map_err(de::Error::custom)
}
