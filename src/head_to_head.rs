use serde::{Deserialize, Serialize};

use crate::aggregate::{
    BattingAggregate, BowlingAggregate, PlayerRole, compute_batting_stats, compute_bowling_stats,
};
use crate::breakdown::{SeasonLine, VenueLine, venue_breakdown, yearly_breakdown};
use crate::delivery::Delivery;
use crate::error::{Analysis, EngineResult};
use crate::event_store::{DeliveryFilter, EventStore, PlayerScope};
use crate::phase::{Phase, PhaseAnalysis, analyze_phases};

const PRESSURE_MOMENTS_SHOWN: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PressureMoment {
    pub match_id: i64,
    pub over: u32,
    pub striker: String,
    pub non_striker: String,
    pub runs: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PressureMoments {
    pub total: usize,
    pub moments: Vec<PressureMoment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadToHead {
    pub batter: String,
    pub bowler: String,
    pub total_deliveries: usize,
    pub batting: BattingAggregate,
    pub bowling: BowlingAggregate,
    pub phases: PhaseAnalysis,
    pub yearly_breakdown: Vec<SeasonLine>,
    pub venue_breakdown: Vec<VenueLine>,
    pub pressure: PressureMoments,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "stats", rename_all = "snake_case")]
pub enum RoleStats {
    Batting(BattingAggregate),
    Bowling(BowlingAggregate),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player: String,
    pub total_deliveries: usize,
    #[serde(flatten)]
    pub stats: RoleStats,
}

/// Death-over deliveries, first ten shown.
pub fn pressure_moments(deliveries: &[Delivery]) -> PressureMoments {
    let death: Vec<&Delivery> = deliveries
        .iter()
        .filter(|d| Phase::Death.contains(d.over))
        .collect();
    PressureMoments {
        total: death.len(),
        moments: death
            .iter()
            .take(PRESSURE_MOMENTS_SHOWN)
            .map(|d| PressureMoment {
                match_id: d.match_id,
                over: d.over,
                striker: d.striker.clone(),
                non_striker: d.non_striker.clone(),
                runs: d.batter_runs,
            })
            .collect(),
    }
}

pub fn head_to_head(batter: &str, bowler: &str, deliveries: &[Delivery]) -> HeadToHead {
    HeadToHead {
        batter: batter.to_string(),
        bowler: bowler.to_string(),
        total_deliveries: deliveries.len(),
        batting: compute_batting_stats(deliveries),
        bowling: compute_bowling_stats(deliveries),
        phases: analyze_phases(deliveries),
        yearly_breakdown: yearly_breakdown(deliveries),
        venue_breakdown: venue_breakdown(deliveries),
        pressure: pressure_moments(deliveries),
    }
}

pub fn compute_head_to_head(
    store: &impl EventStore,
    batter: &str,
    bowler: &str,
    filters: &DeliveryFilter,
) -> EngineResult<Analysis<HeadToHead>> {
    let scope = PlayerScope::Matchup {
        batter: batter.to_string(),
        bowler: bowler.to_string(),
    };
    let deliveries = store.fetch_deliveries(&scope, filters)?;
    if deliveries.is_empty() {
        tracing::debug!(batter, bowler, "no deliveries for matchup");
        return Ok(Analysis::Empty);
    }
    Ok(Analysis::Data(head_to_head(batter, bowler, &deliveries)))
}

pub fn compute_player_stats(
    store: &impl EventStore,
    player: &str,
    role: PlayerRole,
    filters: &DeliveryFilter,
) -> EngineResult<Analysis<PlayerStats>> {
    let scope = match role {
        PlayerRole::Batter => PlayerScope::Batter(player.to_string()),
        PlayerRole::Bowler => PlayerScope::Bowler(player.to_string()),
    };
    let deliveries = store.fetch_deliveries(&scope, filters)?;
    if deliveries.is_empty() {
        return Ok(Analysis::Empty);
    }
    let stats = match role {
        PlayerRole::Batter => RoleStats::Batting(compute_batting_stats(&deliveries)),
        PlayerRole::Bowler => RoleStats::Bowling(compute_bowling_stats(&deliveries)),
    };
    Ok(Analysis::Data(PlayerStats {
        player: player.to_string(),
        total_deliveries: deliveries.len(),
        stats,
    }))
}
