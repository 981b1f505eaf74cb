//! Runs reconciliation between two trade sources for one trade date.

use chrono::{DateTime, Duration, Utc};
use recon_core::{ReconConfig, ReconError, ReconciliationStats, Trade, TradeSource};
use recon_store::{insert_break_in_tx, persist_normalization, set_trade_matched, ReconDb};

use crate::breaks::BreakDeriver;
use crate::fuzzy::FuzzyMatcher;
use crate::normalizers;

pub struct MatchingOrchestrator {
    db: ReconDb,
    config: ReconConfig,
    matcher: FuzzyMatcher,
}

impl MatchingOrchestrator {
    pub fn new(db: ReconDb, config: ReconConfig) -> Self {
        let matcher = FuzzyMatcher::new(&config);
        Self {
            db,
            config,
            matcher,
        }
    }

    /// Pair unmatched trades from `source1` against `source2` within the
    /// 24-hour window starting at `trade_date`'s midnight.
    ///
    /// Pairing is greedy and one-to-one: source1 trades are visited in
    /// stable load order, and a claimed source2 trade leaves the candidate
    /// pool before the next source1 trade is scored. Persisted
    /// normalization, match state, and breaks commit in one transaction;
    /// any storage error rolls everything back.
    pub async fn run_reconciliation(
        &self,
        trade_date: DateTime<Utc>,
        source1: TradeSource,
        source2: TradeSource,
    ) -> Result<ReconciliationStats, ReconError> {
        tracing::info!(
            "Starting reconciliation {} vs {} for {}",
            source1,
            source2,
            trade_date.date_naive()
        );

        let window_start = trade_date
            .date_naive()
            .and_time(chrono::NaiveTime::MIN)
            .and_utc();
        let window_end = window_start + Duration::days(1);

        let mut trades1 = self
            .db
            .fetch_unmatched_trades(source1, window_start, window_end)
            .await?;
        let mut trades2 = self
            .db
            .fetch_unmatched_trades(source2, window_start, window_end)
            .await?;

        for trade in trades1.iter_mut().chain(trades2.iter_mut()) {
            normalize_trade_fields(trade);
        }

        let mut tx = self.db.pool().begin().await?;

        for trade in trades1.iter().chain(trades2.iter()) {
            persist_normalization(
                &mut *tx,
                trade.id,
                &trade.symbol,
                trade.counterparty_normalized.as_deref(),
            )
            .await?;
        }

        let deriver = BreakDeriver::new(&self.config);
        let now = Utc::now();
        let mut stats = ReconciliationStats::default();
        let mut claimed = vec![false; trades2.len()];

        for i in 0..trades1.len() {
            // Candidate pool excludes every already-claimed source2 trade
            let mut index_map = Vec::new();
            let mut candidates = Vec::new();
            for (j, candidate) in trades2.iter().enumerate() {
                if !claimed[j] {
                    index_map.push(j);
                    candidates.push(candidate.clone());
                }
            }

            let Some((pos, score)) = self.matcher.find_best_match(&trades1[i], &candidates, None)
            else {
                continue;
            };
            let j = index_map[pos];
            claimed[j] = true;

            mark_pair(&mut trades1[i], &mut trades2[j], score.overall_score);
            set_trade_matched(&mut *tx, trades1[i].id, trades2[j].id, score.overall_score).await?;
            set_trade_matched(&mut *tx, trades2[j].id, trades1[i].id, score.overall_score).await?;

            if score.confidence_level == crate::fuzzy::MatchConfidence::Auto {
                stats.auto_matched += 1;
            } else {
                stats.manual_review += 1;
            }

            for brk in deriver.identify_breaks(&trades1[i], &trades2[j], &score.field_scores, now)
            {
                insert_break_in_tx(&mut *tx, &brk).await?;
                stats.breaks_identified += 1;
            }
        }

        for trade in trades1.iter().filter(|t| !t.is_matched) {
            let brk = deriver.missing_trade_break(trade, source2, now);
            insert_break_in_tx(&mut *tx, &brk).await?;
            stats.unmatched_source1 += 1;
        }
        for trade in trades2.iter().filter(|t| !t.is_matched) {
            let brk = deriver.missing_trade_break(trade, source1, now);
            insert_break_in_tx(&mut *tx, &brk).await?;
            stats.unmatched_source2 += 1;
        }

        tx.commit().await?;

        tracing::info!(
            "Reconciliation complete: auto={} review={} breaks={} unmatched=({}, {})",
            stats.auto_matched,
            stats.manual_review,
            stats.breaks_identified,
            stats.unmatched_source1,
            stats.unmatched_source2
        );
        Ok(stats)
    }
}

/// Canonicalize comparison fields in place. The symbol rewrite is always
/// applied; the counterparty is normalized only when a raw name exists and
/// no normalized form has been stored yet.
fn normalize_trade_fields(trade: &mut Trade) {
    trade.symbol = normalizers::normalize_symbol(&trade.symbol);

    let needs_normalized = trade
        .counterparty_normalized
        .as_deref()
        .map_or(true, str::is_empty);
    if needs_normalized {
        if let Some(raw) = trade.counterparty.as_deref() {
            trade.counterparty_normalized = Some(normalizers::normalize_counterparty(raw));
        }
    }
}

fn mark_pair(trade1: &mut Trade, trade2: &mut Trade, confidence: f64) {
    trade1.is_matched = true;
    trade1.matched_trade_id = Some(trade2.id);
    trade1.match_confidence = Some(confidence);

    trade2.is_matched = true;
    trade2.matched_trade_id = Some(trade1.id);
    trade2.match_confidence = Some(confidence);
}
