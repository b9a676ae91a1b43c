//! Per-player reports for a batch of players.
//!
//! Deliveries are fetched up front, one player at a time; the reports are
//! then built in parallel, each from its own delivery set only.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::aggregate::{
    BattingAggregate, BowlingAggregate, PlayerRole, compute_batting_stats, compute_bowling_stats,
};
use crate::config::EngineConfig;
use crate::delivery::Delivery;
use crate::error::EngineResult;
use crate::event_store::{DeliveryFilter, EventStore, PlayerScope};
use crate::form::{FormSummary, summarize_form};
use crate::partnership::{Partnership, partnerships_for_player};
use crate::phase::{PhaseAnalysis, analyze_phases};

/// Everything known about one player's involvement: balls faced, balls at
/// the non-striker's end and balls bowled.
#[derive(Debug, Clone, Default)]
pub struct PlayerDeliveries {
    pub player: String,
    pub deliveries: Vec<Delivery>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerReport {
    pub player: String,
    pub batting: BattingAggregate,
    pub bowling: BowlingAggregate,
    pub batting_phases: PhaseAnalysis,
    pub partnerships: Vec<Partnership>,
    pub batting_form: FormSummary,
    pub bowling_form: FormSummary,
}

pub fn fetch_player_deliveries(
    store: &impl EventStore,
    player: &str,
    filters: &DeliveryFilter,
) -> EngineResult<PlayerDeliveries> {
    let mut deliveries = store.fetch_deliveries(&PlayerScope::OnField(player.to_string()), filters)?;
    deliveries.extend(store.fetch_deliveries(&PlayerScope::Bowler(player.to_string()), filters)?);
    deliveries.sort_by_key(|d| (d.match_id, d.inning, d.over, d.ball));
    Ok(PlayerDeliveries {
        player: player.to_string(),
        deliveries,
    })
}

pub fn build_player_report(input: &PlayerDeliveries, cfg: &EngineConfig) -> PlayerReport {
    let player = input.player.as_str();
    let faced: Vec<Delivery> = input
        .deliveries
        .iter()
        .filter(|d| d.striker == player)
        .cloned()
        .collect();
    let bowled: Vec<Delivery> = input
        .deliveries
        .iter()
        .filter(|d| d.bowler == player)
        .cloned()
        .collect();
    let on_field: Vec<Delivery> = input
        .deliveries
        .iter()
        .filter(|d| d.striker == player || d.non_striker == player)
        .cloned()
        .collect();

    PlayerReport {
        player: player.to_string(),
        batting: compute_batting_stats(&faced),
        bowling: compute_bowling_stats(&bowled),
        batting_phases: analyze_phases(&faced),
        partnerships: partnerships_for_player(&on_field, player, &cfg.partnership),
        batting_form: summarize_form(player, PlayerRole::Batter, &faced, cfg.form_window),
        bowling_form: summarize_form(player, PlayerRole::Bowler, &bowled, cfg.form_window),
    }
}

/// Reports in the same order as `batch`.
pub fn build_player_reports(batch: &[PlayerDeliveries], cfg: &EngineConfig) -> Vec<PlayerReport> {
    let pool = build_report_pool(cfg.report_parallelism);
    let reports = with_report_pool(&pool, || {
        batch
            .par_iter()
            .map(|input| build_player_report(input, cfg))
            .collect::<Vec<_>>()
    });
    tracing::info!(players = reports.len(), "player reports built");
    reports
}

fn build_report_pool(threads: usize) -> Option<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.clamp(1, 32))
        .build()
        .ok()
}

fn with_report_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(match_id: i64, seq: u32, striker: &str, non_striker: &str, bowler: &str, runs: u32) -> Delivery {
        Delivery {
            match_id,
            inning: 1,
            over: seq / 6,
            ball: seq % 6 + 1,
            striker: striker.to_string(),
            non_striker: non_striker.to_string(),
            bowler: bowler.to_string(),
            batter_runs: runs,
            total_runs: runs,
            ..Delivery::default()
        }
    }

    #[test]
    fn batch_reports_match_serial_computation() {
        let mut all = Vec::new();
        for seq in 0..12 {
            all.push(ball(1, seq, "Samson", "Hetmyer", "Shami", seq % 4));
            all.push(ball(2, seq, "Shami", "Rahul", "Samson", 1));
        }
        let batch = ["Samson", "Shami", "Nobody"]
            .iter()
            .map(|p| PlayerDeliveries {
                player: p.to_string(),
                deliveries: all
                    .iter()
                    .filter(|d| d.striker == *p || d.non_striker == *p || d.bowler == *p)
                    .cloned()
                    .collect(),
            })
            .collect::<Vec<_>>();

        let cfg = EngineConfig::default();
        let reports = build_player_reports(&batch, &cfg);
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].player, "Samson");
        assert_eq!(reports[0], build_player_report(&batch[0], &cfg));
        assert_eq!(reports[0].batting.balls_faced, 12);
        assert_eq!(reports[0].bowling.balls_bowled, 12);
        assert_eq!(reports[0].partnerships.len(), 1);
        assert_eq!(reports[1].batting.runs, 12);
        assert_eq!(reports[2].batting, BattingAggregate::default());
        assert_eq!(reports[2].batting_form.matches_played, 0);
    }
}
