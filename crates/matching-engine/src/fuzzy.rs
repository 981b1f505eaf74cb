//! Weighted fuzzy matching between trade records from two sources.

use recon_core::{ReconConfig, Trade};
use serde::{Deserialize, Serialize};

/// Comparison fields, in the canonical weight order. Break records for a
/// pair are emitted in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    Symbol,
    TradeDate,
    Side,
    Quantity,
    Price,
    Counterparty,
}

impl MatchField {
    pub const ORDER: [MatchField; 6] = [
        MatchField::Symbol,
        MatchField::TradeDate,
        MatchField::Side,
        MatchField::Quantity,
        MatchField::Price,
        MatchField::Counterparty,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchField::Symbol => "symbol",
            MatchField::TradeDate => "trade_date",
            MatchField::Side => "side",
            MatchField::Quantity => "quantity",
            MatchField::Price => "price",
            MatchField::Counterparty => "counterparty",
        }
    }
}

/// Per-field weights; must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchWeights {
    pub symbol: f64,
    pub trade_date: f64,
    pub side: f64,
    pub quantity: f64,
    pub price: f64,
    pub counterparty: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            symbol: 0.25,
            trade_date: 0.15,
            side: 0.15,
            quantity: 0.20,
            price: 0.15,
            counterparty: 0.10,
        }
    }
}

impl MatchWeights {
    pub fn get(&self, field: MatchField) -> f64 {
        match field {
            MatchField::Symbol => self.symbol,
            MatchField::TradeDate => self.trade_date,
            MatchField::Side => self.side,
            MatchField::Quantity => self.quantity,
            MatchField::Price => self.price,
            MatchField::Counterparty => self.counterparty,
        }
    }
}

/// Similarity per comparison field, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FieldScores {
    pub symbol: f64,
    pub trade_date: f64,
    pub side: f64,
    pub quantity: f64,
    pub price: f64,
    pub counterparty: f64,
}

impl FieldScores {
    pub fn get(&self, field: MatchField) -> f64 {
        match field {
            MatchField::Symbol => self.symbol,
            MatchField::TradeDate => self.trade_date,
            MatchField::Side => self.side,
            MatchField::Quantity => self.quantity,
            MatchField::Price => self.price,
            MatchField::Counterparty => self.counterparty,
        }
    }

    /// Iterate (field, score) in canonical weight order.
    pub fn iter(&self) -> impl Iterator<Item = (MatchField, f64)> + '_ {
        MatchField::ORDER.iter().map(move |f| (*f, self.get(*f)))
    }
}

/// Classification of an overall score against the configured thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    Auto,
    Review,
    NoMatch,
}

impl MatchConfidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchConfidence::Auto => "auto",
            MatchConfidence::Review => "review",
            MatchConfidence::NoMatch => "no_match",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchScore {
    pub overall_score: f64,
    pub field_scores: FieldScores,
    pub is_match: bool,
    pub confidence_level: MatchConfidence,
}

/// Weighted fuzzy matcher for cross-system trade reconciliation.
pub struct FuzzyMatcher {
    auto_match_threshold: f64,
    manual_review_threshold: f64,
    price_tolerance_pct: f64,
    quantity_tolerance: f64,
}

impl FuzzyMatcher {
    pub fn new(config: &ReconConfig) -> Self {
        Self {
            auto_match_threshold: config.auto_match_threshold,
            manual_review_threshold: config.manual_review_threshold,
            price_tolerance_pct: config.price_tolerance_pct,
            quantity_tolerance: config.quantity_tolerance,
        }
    }

    pub fn compute_match_score(
        &self,
        trade1: &Trade,
        trade2: &Trade,
        weights: Option<&MatchWeights>,
    ) -> MatchScore {
        let default_weights = MatchWeights::default();
        let weights = weights.unwrap_or(&default_weights);

        let field_scores = FieldScores {
            symbol: match_symbol(&trade1.symbol, &trade2.symbol),
            trade_date: if trade1.trade_date.date_naive() == trade2.trade_date.date_naive() {
                1.0
            } else {
                0.0
            },
            side: if trade1.side.eq_ignore_ascii_case(&trade2.side) {
                1.0
            } else {
                0.0
            },
            quantity: self.match_quantity(trade1.quantity, trade2.quantity),
            price: self.match_price(trade1.price, trade2.price),
            counterparty: match_counterparty(
                comparison_counterparty(trade1),
                comparison_counterparty(trade2),
            ),
        };

        let overall_score: f64 = field_scores
            .iter()
            .map(|(field, score)| score * weights.get(field))
            .sum();

        let (is_match, confidence_level) = if overall_score >= self.auto_match_threshold {
            (true, MatchConfidence::Auto)
        } else if overall_score >= self.manual_review_threshold {
            (true, MatchConfidence::Review)
        } else {
            (false, MatchConfidence::NoMatch)
        };

        MatchScore {
            overall_score,
            field_scores,
            is_match,
            confidence_level,
        }
    }

    /// Best-scoring candidate at or above `min_score` (defaults to the
    /// review threshold). Ties keep the earliest candidate; returns the
    /// index into `candidates`.
    pub fn find_best_match(
        &self,
        source_trade: &Trade,
        candidates: &[Trade],
        min_score: Option<f64>,
    ) -> Option<(usize, MatchScore)> {
        let threshold = min_score.unwrap_or(self.manual_review_threshold);
        let mut best: Option<(usize, MatchScore)> = None;

        for (idx, candidate) in candidates.iter().enumerate() {
            let score = self.compute_match_score(source_trade, candidate, None);
            if score.overall_score < threshold {
                continue;
            }
            match &best {
                Some((_, current)) if score.overall_score <= current.overall_score => {}
                _ => best = Some((idx, score)),
            }
        }

        best
    }

    fn match_quantity(&self, qty1: f64, qty2: f64) -> f64 {
        let diff = (qty1 - qty2).abs();
        if diff <= self.quantity_tolerance {
            return 1.0;
        }
        let denom = qty1.abs().max(qty2.abs()).max(1.0);
        (1.0 - diff / denom).max(0.0)
    }

    fn match_price(&self, price1: f64, price2: f64) -> f64 {
        if price1 == price2 {
            return 1.0;
        }
        let denom = price1.abs().max(price2.abs()).max(1e-9);
        let pct_diff = (price1 - price2).abs() / denom;
        if pct_diff <= self.price_tolerance_pct {
            return 1.0;
        }
        (1.0 - pct_diff / self.price_tolerance_pct.max(1e-9)).max(0.0)
    }
}

/// Counterparty string used for scoring: normalized form when present,
/// otherwise the raw name.
fn comparison_counterparty(trade: &Trade) -> Option<&str> {
    trade
        .counterparty_normalized
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(trade.counterparty.as_deref())
        .filter(|s| !s.is_empty())
}

fn match_symbol(sym1: &str, sym2: &str) -> f64 {
    if sym1.is_empty() || sym2.is_empty() {
        return 0.0;
    }
    if sym1 == sym2 {
        return 1.0;
    }
    let similarity = strsim::normalized_levenshtein(sym1, sym2);
    if similarity >= 0.9 {
        similarity
    } else {
        0.0
    }
}

/// Blend of token-sort, token-set, and Jaro-Winkler similarity. Either
/// side missing scores a neutral 0.5.
fn match_counterparty(cp1: Option<&str>, cp2: Option<&str>) -> f64 {
    let (cp1, cp2) = match (cp1, cp2) {
        (Some(a), Some(b)) => (a, b),
        _ => return 0.5,
    };
    if cp1 == cp2 {
        return 1.0;
    }

    let token_sort = token_sort_ratio(cp1, cp2);
    let token_set = token_set_ratio(cp1, cp2);
    let jaro = strsim::jaro_winkler(cp1, cp2);
    token_sort * 0.4 + token_set * 0.4 + jaro * 0.2
}

fn sorted_tokens(s: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens
}

/// Similarity of the whitespace-tokenized, sorted renderings.
fn token_sort_ratio(s1: &str, s2: &str) -> f64 {
    strsim::normalized_levenshtein(&sorted_tokens(s1).join(" "), &sorted_tokens(s2).join(" "))
}

/// Set-based similarity: compares the shared-token core against each
/// side's full token set, so a subset relationship scores near 1.0.
fn token_set_ratio(s1: &str, s2: &str) -> f64 {
    use std::collections::BTreeSet;

    let set1: BTreeSet<&str> = s1.split_whitespace().collect();
    let set2: BTreeSet<&str> = s2.split_whitespace().collect();

    let common: Vec<&str> = set1.intersection(&set2).copied().collect();
    let only1: Vec<&str> = set1.difference(&set2).copied().collect();
    let only2: Vec<&str> = set2.difference(&set1).copied().collect();

    let base = common.join(" ");
    let combined1 = join_nonempty(&base, &only1.join(" "));
    let combined2 = join_nonempty(&base, &only2.join(" "));

    let r1 = strsim::normalized_levenshtein(&base, &combined1);
    let r2 = strsim::normalized_levenshtein(&base, &combined2);
    let r3 = strsim::normalized_levenshtein(&combined1, &combined2);
    r1.max(r2).max(r3)
}

fn join_nonempty(a: &str, b: &str) -> String {
    match (a.is_empty(), b.is_empty()) {
        (true, _) => b.to_string(),
        (_, true) => a.to_string(),
        _ => format!("{a} {b}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use recon_core::TradeSource;

    pub(crate) fn make_trade(
        id: i64,
        source: TradeSource,
        symbol: &str,
        day: u32,
        side: &str,
        quantity: f64,
        price: f64,
        counterparty: &str,
    ) -> Trade {
        let now = Utc::now();
        Trade {
            id,
            source_system: source,
            source_trade_id: format!("{source}-{id}"),
            source_raw_data: None,
            trade_date: Utc.with_ymd_and_hms(2026, 2, day, 14, 30, 0).unwrap(),
            settlement_date: None,
            symbol: symbol.to_string(),
            security_identifier: None,
            side: side.to_string(),
            quantity,
            price,
            gross_amount: None,
            net_amount: None,
            currency: "USD".to_string(),
            counterparty: if counterparty.is_empty() {
                None
            } else {
                Some(counterparty.to_string())
            },
            counterparty_normalized: None,
            account_number: None,
            portfolio: None,
            commission: 0.0,
            fees: 0.0,
            is_matched: false,
            matched_trade_id: None,
            match_confidence: None,
            ingested_at: now,
            updated_at: now,
        }
    }

    fn matcher() -> FuzzyMatcher {
        FuzzyMatcher::new(&ReconConfig::default())
    }

    #[test]
    fn test_identical_trades_score_auto() {
        let t1 = make_trade(1, TradeSource::Oms, "AAPL", 24, "BUY", 100.0, 200.0, "Goldman Sachs LLC");
        let t2 = make_trade(2, TradeSource::Custodian, "AAPL", 24, "BUY", 100.0, 200.0, "Goldman Sachs LLC");

        let score = matcher().compute_match_score(&t1, &t2, None);
        assert!(score.overall_score >= 0.99);
        assert!(score.is_match);
        assert_eq!(score.confidence_level, MatchConfidence::Auto);
    }

    #[test]
    fn test_symmetry() {
        let t1 = make_trade(1, TradeSource::Oms, "AAPL", 24, "BUY", 100.0, 200.0, "Goldman Sachs");
        let t2 = make_trade(2, TradeSource::Custodian, "AAPL", 24, "BUY", 105.0, 201.0, "Goldman Sachs Intl");

        let m = matcher();
        let ab = m.compute_match_score(&t1, &t2, None).overall_score;
        let ba = m.compute_match_score(&t2, &t1, None).overall_score;
        assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn test_divergent_trades_no_match() {
        let t1 = make_trade(1, TradeSource::Oms, "AAPL", 24, "BUY", 100.0, 200.0, "MS");
        let t2 = make_trade(2, TradeSource::Custodian, "TSLA", 25, "SELL", 400.0, 310.0, "Different");

        let score = matcher().compute_match_score(&t1, &t2, None);
        assert!(score.overall_score < 0.75);
        assert!(!score.is_match);
        assert_eq!(score.confidence_level, MatchConfidence::NoMatch);
    }

    #[test]
    fn test_minor_price_variance_within_tolerance() {
        let t1 = make_trade(1, TradeSource::Oms, "AAPL", 24, "BUY", 100.0, 199.10, "Goldman Sachs");
        let t2 = make_trade(2, TradeSource::Custodian, "AAPL", 24, "BUY", 100.0, 199.11, "Goldman Sachs");

        let score = matcher().compute_match_score(&t1, &t2, None);
        assert_eq!(score.field_scores.price, 1.0);
        assert_eq!(score.confidence_level, MatchConfidence::Auto);
    }

    #[test]
    fn test_quantity_discrepancy_downgrades_to_review() {
        // 5 shares off on 105 costs ~0.95 of the quantity weight; with no
        // counterparty on either side the overall lands in the review band.
        let t1 = make_trade(1, TradeSource::Oms, "AAPL", 24, "BUY", 100.0, 200.0, "");
        let t2 = make_trade(2, TradeSource::Custodian, "AAPL", 24, "BUY", 105.0, 200.0, "");

        let score = matcher().compute_match_score(&t1, &t2, None);
        assert!(score.is_match);
        assert_eq!(score.confidence_level, MatchConfidence::Review);
        assert!(score.field_scores.quantity < 0.99);
        assert!((score.field_scores.quantity - (1.0 - 5.0 / 105.0)).abs() < 1e-12);
    }

    #[test]
    fn test_counterparty_missing_scores_neutral() {
        let t1 = make_trade(1, TradeSource::Oms, "AAPL", 24, "BUY", 100.0, 200.0, "");
        let t2 = make_trade(2, TradeSource::Custodian, "AAPL", 24, "BUY", 100.0, 200.0, "Goldman Sachs");

        let score = matcher().compute_match_score(&t1, &t2, None);
        assert_eq!(score.field_scores.counterparty, 0.5);
    }

    #[test]
    fn test_token_set_handles_subset_names() {
        let score = match_counterparty(Some("GOLDMAN SACHS"), Some("GOLDMAN SACHS INTERNATIONAL"));
        assert!(score > 0.75);
    }

    #[test]
    fn test_find_best_match_prefers_highest_and_is_stable() {
        let src = make_trade(1, TradeSource::Oms, "AAPL", 24, "BUY", 100.0, 200.0, "Goldman Sachs");
        let close = make_trade(2, TradeSource::Custodian, "AAPL", 24, "BUY", 101.0, 200.0, "Goldman Sachs");
        let exact_a = make_trade(3, TradeSource::Custodian, "AAPL", 24, "BUY", 100.0, 200.0, "Goldman Sachs");
        let exact_b = make_trade(4, TradeSource::Custodian, "AAPL", 24, "BUY", 100.0, 200.0, "Goldman Sachs");

        let m = matcher();
        let candidates = vec![close.clone(), exact_a, exact_b];
        let (idx, score) = m.find_best_match(&src, &candidates, None).unwrap();
        // First of the two perfect candidates wins the tie
        assert_eq!(idx, 1);
        assert_eq!(score.confidence_level, MatchConfidence::Auto);

        let none = m.find_best_match(&src, &[], None);
        assert!(none.is_none());
    }

    #[test]
    fn test_raising_auto_threshold_never_adds_autos() {
        let t1 = make_trade(1, TradeSource::Oms, "AAPL", 24, "BUY", 100.0, 200.0, "Goldman Sachs");
        let t2 = make_trade(2, TradeSource::Custodian, "AAPL", 24, "BUY", 101.0, 200.0, "Goldman Sachs");

        let loose = FuzzyMatcher::new(&ReconConfig {
            auto_match_threshold: 0.95,
            ..ReconConfig::default()
        });
        let strict = FuzzyMatcher::new(&ReconConfig {
            auto_match_threshold: 0.999,
            ..ReconConfig::default()
        });

        let loose_auto =
            loose.compute_match_score(&t1, &t2, None).confidence_level == MatchConfidence::Auto;
        let strict_auto =
            strict.compute_match_score(&t1, &t2, None).confidence_level == MatchConfidence::Auto;
        // Tightening the threshold can only lose auto-matches
        assert!(loose_auto);
        assert!(!strict_auto);
    }
}
