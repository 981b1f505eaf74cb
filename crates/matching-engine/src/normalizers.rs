//! Field canonicalization applied before any comparison.
//!
//! All functions are pure, deterministic, and idempotent on their output.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Trailing exchange suffix such as `.L`, `.TO`, `.HK`, `.XNAS`.
    static ref EXCHANGE_SUFFIX: Regex = Regex::new(r"\.[A-Z]{1,4}$").unwrap();
    /// Corporate suffixes as whole words, with an optional trailing period.
    static ref CORPORATE_SUFFIX: Regex = Regex::new(
        r"\b(INC|INCORPORATED|LLC|LTD|LIMITED|CORP|CORPORATION|CO|LP|LLP|PLC|SA|AG|GMBH|NV|BV)\b\.?"
    )
    .unwrap();
    static ref NON_ALNUM_RUN: Regex = Regex::new(r"[^\w\s]+").unwrap();
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Uppercase, strip, drop a trailing exchange suffix, remove internal
/// whitespace: `"vod.l"` becomes `"VOD"`, `"BRK B"` becomes `"BRKB"`.
pub fn normalize_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    let stripped = EXCHANGE_SUFFIX.replace(&upper, "");
    stripped.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Uppercase, strip legal-entity suffixes, collapse punctuation runs to
/// single spaces.
pub fn normalize_counterparty(counterparty: &str) -> String {
    let upper = counterparty.trim().to_uppercase();
    let without_suffixes = CORPORATE_SUFFIX.replace_all(&upper, "");
    let alnum = NON_ALNUM_RUN.replace_all(&without_suffixes, " ");
    WHITESPACE_RUN.replace_all(&alnum, " ").trim().to_string()
}

/// Round half-to-even to `decimals` places; `None` is treated as zero.
pub fn normalize_amount(amount: Option<f64>, decimals: u32) -> f64 {
    let value = amount.unwrap_or(0.0);
    let factor = 10f64.powi(decimals as i32);
    let scaled = value * factor;
    let floor = scaled.floor();
    let frac = scaled - floor;

    // Banker's rounding on the .5 boundary
    let rounded = if (frac - 0.5).abs() < f64::EPSILON {
        if (floor as i64) % 2 == 0 {
            floor
        } else {
            floor + 1.0
        }
    } else {
        scaled.round()
    };

    rounded / factor
}

/// Calendar-date rendering used for date comparisons.
pub fn normalize_date(date: Option<chrono::DateTime<chrono::Utc>>) -> String {
    match date {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("aapl"), "AAPL");
        assert_eq!(normalize_symbol("  VOD.L "), "VOD");
        assert_eq!(normalize_symbol("7203.XTKS"), "7203");
        assert_eq!(normalize_symbol("BRK B"), "BRKB");
        // Idempotent
        assert_eq!(normalize_symbol(&normalize_symbol("vod.l")), "VOD");
    }

    #[test]
    fn test_normalize_symbol_keeps_non_suffix_dots() {
        // Five letters after the dot is not an exchange suffix
        assert_eq!(normalize_symbol("ABC.DEFGH"), "ABC.DEFGH");
    }

    #[test]
    fn test_normalize_counterparty_strips_suffixes() {
        assert_eq!(normalize_counterparty("Goldman Sachs LLC"), "GOLDMAN SACHS");
        assert_eq!(normalize_counterparty("Goldman Sachs"), "GOLDMAN SACHS");
        assert_eq!(
            normalize_counterparty("Morgan Stanley & Co. Inc."),
            "MORGAN STANLEY"
        );
        assert_eq!(normalize_counterparty("Siemens A.G."), "SIEMENS A G");
        assert_eq!(normalize_counterparty("UBS AG"), "UBS");
    }

    #[test]
    fn test_normalize_counterparty_collapses_punctuation() {
        assert_eq!(
            normalize_counterparty("J.P. Morgan -- Securities"),
            "J P MORGAN SECURITIES"
        );
        assert_eq!(normalize_counterparty(""), "");
    }

    #[test]
    fn test_normalize_amount_half_even() {
        // Exactly-representable .5 boundaries round to the even neighbor
        assert_eq!(normalize_amount(Some(2.125), 2), 2.12);
        assert_eq!(normalize_amount(Some(2.375), 2), 2.38);
        assert_eq!(normalize_amount(Some(2.344), 2), 2.34);
        assert_eq!(normalize_amount(Some(2.346), 2), 2.35);
        assert_eq!(normalize_amount(None, 2), 0.0);
    }

    #[test]
    fn test_normalize_date() {
        let dt = chrono::Utc.with_ymd_and_hms(2026, 2, 24, 14, 30, 0).unwrap();
        assert_eq!(normalize_date(Some(dt)), "2026-02-24");
        assert_eq!(normalize_date(None), "");
    }
}
