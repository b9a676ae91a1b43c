use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::aggregate::{BattingAggregate, BowlingAggregate, compute_batting_stats, compute_bowling_stats, round2};
use crate::classify::batting_dismissal;
use crate::delivery::Delivery;
use crate::error::{Analysis, EngineError, EngineResult};
use crate::event_store::{DeliveryFilter, EventStore, PlayerScope};

/// Innings phase over zero-based over numbers (20-over convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Powerplay,
    Middle,
    Death,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Powerplay, Phase::Middle, Phase::Death];

    /// The single predicate that partitions every over into exactly one phase.
    pub fn of_over(over: u32) -> Phase {
        match over {
            0..=5 => Phase::Powerplay,
            6..=14 => Phase::Middle,
            _ => Phase::Death,
        }
    }

    pub fn contains(self, over: u32) -> bool {
        Phase::of_over(over) == self
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Powerplay => "Powerplay",
            Phase::Middle => "Middle Overs",
            Phase::Death => "Death Overs",
        }
    }

    /// Over range as shown on a scorecard (one-based).
    pub fn overs_range(self) -> &'static str {
        match self {
            Phase::Powerplay => "1-6",
            Phase::Middle => "7-15",
            Phase::Death => "16-20",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = match self {
            Phase::Powerplay => "powerplay",
            Phase::Middle => "middle",
            Phase::Death => "death",
        };
        f.write_str(key)
    }
}

impl FromStr for Phase {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "powerplay" | "pp" => Ok(Phase::Powerplay),
            "middle" | "middleovers" => Ok(Phase::Middle),
            "death" | "deathovers" => Ok(Phase::Death),
            _ => Err(EngineError::invalid(
                "phase",
                format!("unsupported phase `{raw}` (expected powerplay, middle or death)"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: Phase,
    pub phase_name: String,
    pub overs_range: String,
    pub total_deliveries: usize,
    pub batting: BattingAggregate,
    pub bowling: BowlingAggregate,
    /// Batter runs per six balls faced.
    pub run_rate: f64,
    pub wickets_lost: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseAnalysis {
    pub powerplay: PhaseReport,
    pub middle: PhaseReport,
    pub death: PhaseReport,
}

impl PhaseAnalysis {
    pub fn get(&self, phase: Phase) -> &PhaseReport {
        match phase {
            Phase::Powerplay => &self.powerplay,
            Phase::Middle => &self.middle,
            Phase::Death => &self.death,
        }
    }

    pub fn total_deliveries(&self) -> usize {
        Phase::ALL.iter().map(|p| self.get(*p).total_deliveries).sum()
    }
}

/// Partition deliveries into phase buckets, preserving input order within
/// each bucket.
pub fn split_by_phase(deliveries: &[Delivery]) -> [Vec<Delivery>; 3] {
    let mut buckets: [Vec<Delivery>; 3] = Default::default();
    for d in deliveries {
        let idx = match Phase::of_over(d.over) {
            Phase::Powerplay => 0,
            Phase::Middle => 1,
            Phase::Death => 2,
        };
        buckets[idx].push(d.clone());
    }
    buckets
}

pub fn analyze_phases(deliveries: &[Delivery]) -> PhaseAnalysis {
    let [powerplay, middle, death] = split_by_phase(deliveries);
    PhaseAnalysis {
        powerplay: phase_report(Phase::Powerplay, &powerplay),
        middle: phase_report(Phase::Middle, &middle),
        death: phase_report(Phase::Death, &death),
    }
}

pub fn phase_report(phase: Phase, deliveries: &[Delivery]) -> PhaseReport {
    let batting = compute_batting_stats(deliveries);
    let bowling = compute_bowling_stats(deliveries);
    let run_rate = if batting.balls_faced > 0 {
        round2(batting.runs as f64 / (batting.balls_faced as f64 / 6.0))
    } else {
        0.0
    };
    let wickets_lost = deliveries
        .iter()
        .filter(|d| batting_dismissal(d, &d.striker))
        .count() as u32;

    PhaseReport {
        phase,
        phase_name: phase.label().to_string(),
        overs_range: phase.overs_range().to_string(),
        total_deliveries: deliveries.len(),
        batting,
        bowling,
        run_rate,
        wickets_lost,
    }
}

/// Phase-wise batter-vs-bowler analysis. A phase in `filters` restricts the
/// fetch, leaving the other two buckets zeroed.
pub fn compute_phase_analysis(
    store: &impl EventStore,
    batter: &str,
    bowler: &str,
    filters: &DeliveryFilter,
) -> EngineResult<Analysis<PhaseAnalysis>> {
    let scope = PlayerScope::Matchup {
        batter: batter.to_string(),
        bowler: bowler.to_string(),
    };
    let deliveries = store.fetch_deliveries(&scope, filters)?;
    tracing::debug!(batter, bowler, deliveries = deliveries.len(), "phase analysis fetched");
    if deliveries.is_empty() {
        return Ok(Analysis::Empty);
    }
    Ok(Analysis::Data(analyze_phases(&deliveries)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_over(over: u32, runs: u32) -> Delivery {
        Delivery {
            match_id: 7,
            inning: 1,
            over,
            ball: 1,
            striker: "Gill".to_string(),
            non_striker: "Saha".to_string(),
            bowler: "Rashid".to_string(),
            batter_runs: runs,
            total_runs: runs,
            ..Delivery::default()
        }
    }

    #[test]
    fn boundaries_between_phases() {
        assert_eq!(Phase::of_over(0), Phase::Powerplay);
        assert_eq!(Phase::of_over(5), Phase::Powerplay);
        assert_eq!(Phase::of_over(6), Phase::Middle);
        assert_eq!(Phase::of_over(14), Phase::Middle);
        assert_eq!(Phase::of_over(15), Phase::Death);
        assert_eq!(Phase::of_over(49), Phase::Death);
    }

    #[test]
    fn every_over_lands_in_exactly_one_phase() {
        for over in 0..60 {
            let hits = Phase::ALL.iter().filter(|p| p.contains(over)).count();
            assert_eq!(hits, 1, "over {over}");
        }
    }

    #[test]
    fn split_partitions_input() {
        let balls = (0..20).map(|o| at_over(o, 1)).collect::<Vec<_>>();
        let [pp, mid, death] = split_by_phase(&balls);
        assert_eq!(pp.len(), 6);
        assert_eq!(mid.len(), 9);
        assert_eq!(death.len(), 5);

        let analysis = analyze_phases(&balls);
        assert_eq!(analysis.total_deliveries(), 20);
        assert_eq!(analysis.death.batting.runs, 5);
        assert_eq!(analysis.powerplay.run_rate, 6.0);
        assert_eq!(analysis.middle.overs_range, "7-15");
        assert_eq!(analysis.death.phase, Phase::Death);

        // an empty bucket is still labelled with its own phase
        let empty = analyze_phases(&[]);
        assert_eq!(empty.middle.phase, Phase::Middle);
        assert_eq!(empty.middle.total_deliveries, 0);
        assert_eq!(empty.middle.batting.strike_rate, 0.0);
    }

    #[test]
    fn phase_names_parse() {
        assert_eq!("Powerplay".parse::<Phase>().unwrap(), Phase::Powerplay);
        assert_eq!("middle_overs".parse::<Phase>().unwrap(), Phase::Middle);
        assert_eq!("death".parse::<Phase>().unwrap(), Phase::Death);
        let err = "super-over".parse::<Phase>().unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter { name: "phase", .. }));
    }
}
