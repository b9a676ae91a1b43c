//! Read-only access to the ordered delivery log.
//!
//! The engine only ever sees materialized `Vec<Delivery>` values; how they
//! are stored is the implementor's business. `SqliteEventStore` is the
//! production backend, `MemoryEventStore` serves tests and benches.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::classify::is_legal_for_bowling;
use crate::delivery::Delivery;
use crate::phase::Phase;

pub const DEFAULT_CHASE_OVERS: f64 = 20.0;
pub const WICKETS_PER_INNINGS: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerScope {
    /// Deliveries faced by the player as striker.
    Batter(String),
    /// Deliveries bowled by the player.
    Bowler(String),
    Matchup { batter: String, bowler: String },
    /// Deliveries with the player at either end of the pitch.
    OnField(String),
}

impl PlayerScope {
    pub fn matches(&self, d: &Delivery) -> bool {
        match self {
            PlayerScope::Batter(p) => d.striker == *p,
            PlayerScope::Bowler(p) => d.bowler == *p,
            PlayerScope::Matchup { batter, bowler } => d.striker == *batter && d.bowler == *bowler,
            PlayerScope::OnField(p) => d.striker == *p || d.non_striker == *p,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryFilter {
    pub season: Option<String>,
    pub venue: Option<String>,
    pub match_type: Option<String>,
    pub phase: Option<Phase>,
}

impl DeliveryFilter {
    pub fn with_season(mut self, season: impl Into<String>) -> Self {
        self.season = Some(season.into());
        self
    }

    pub fn with_venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }

    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Metadata criteria. A criterion set on the filter never matches a
    /// delivery without metadata.
    pub fn matches_meta(&self, d: &Delivery) -> bool {
        let meta = d.meta.as_deref();
        let check = |want: &Option<String>, have: Option<&String>| match want {
            None => true,
            Some(w) => have.is_some_and(|h| h == w),
        };
        check(&self.season, meta.and_then(|m| m.season.as_ref()))
            && check(&self.venue, meta.and_then(|m| m.venue.as_ref()))
            && check(&self.match_type, meta.and_then(|m| m.match_type.as_ref()))
    }

    pub fn matches_phase(&self, d: &Delivery) -> bool {
        self.phase.is_none_or(|p| p.contains(d.over))
    }

    pub fn matches(&self, d: &Delivery) -> bool {
        self.matches_meta(d) && self.matches_phase(d)
    }
}

/// Tolerance box around a live chase state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChaseWindow {
    pub runs_needed: RangeInclusive<i64>,
    pub balls_remaining: RangeInclusive<i64>,
    pub wickets_left: RangeInclusive<i64>,
}

impl ChaseWindow {
    pub fn around(
        runs_needed: i64,
        balls_remaining: i64,
        wickets_left: i64,
        runs_tolerance: i64,
        balls_tolerance: i64,
        wickets_tolerance: i64,
    ) -> Self {
        Self {
            runs_needed: (runs_needed - runs_tolerance).max(1)..=runs_needed + runs_tolerance,
            balls_remaining: (balls_remaining - balls_tolerance).max(1)
                ..=balls_remaining + balls_tolerance,
            wickets_left: (wickets_left - wickets_tolerance).max(1)
                ..=(wickets_left + wickets_tolerance).min(WICKETS_PER_INNINGS),
        }
    }

    pub fn contains(&self, runs_needed: i64, balls_remaining: i64, wickets_left: i64) -> bool {
        self.runs_needed.contains(&runs_needed)
            && self.balls_remaining.contains(&balls_remaining)
            && self.wickets_left.contains(&wickets_left)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaseOutcome {
    pub match_id: i64,
    pub target: u32,
    pub chasing_team: String,
    pub winner: Option<String>,
}

impl ChaseOutcome {
    pub fn chased_successfully(&self) -> bool {
        self.winner.as_deref() == Some(self.chasing_team.as_str())
    }
}

pub trait EventStore {
    /// Deliveries for `scope` passing `filter`, ordered match -> inning ->
    /// over -> ball, overs already zero-based.
    fn fetch_deliveries(&self, scope: &PlayerScope, filter: &DeliveryFilter)
    -> Result<Vec<Delivery>>;

    /// Historical second innings that passed through a state inside `window`.
    fn fetch_chase_outcomes(&self, window: &ChaseWindow) -> Result<Vec<ChaseOutcome>>;
}

/// Replay second-innings deliveries (any match order, chronological within a
/// match) and report every chase that entered `window` while still live.
/// Matches without a recorded target are skipped.
pub fn chase_outcomes_from_innings(
    deliveries: &[Delivery],
    window: &ChaseWindow,
) -> Vec<ChaseOutcome> {
    let mut by_match: BTreeMap<i64, Vec<&Delivery>> = BTreeMap::new();
    for d in deliveries.iter().filter(|d| d.inning == 2) {
        by_match.entry(d.match_id).or_default().push(d);
    }

    let mut out = Vec::new();
    for (match_id, balls) in by_match {
        let Some(first) = balls.first() else {
            continue;
        };
        let Some(meta) = first.meta.as_deref() else {
            continue;
        };
        let Some(target) = meta.target_runs else {
            continue;
        };
        let max_balls = (meta.target_overs.unwrap_or(DEFAULT_CHASE_OVERS) * 6.0).round() as i64;

        let mut scored = 0i64;
        let mut legal = 0i64;
        let mut wickets = 0i64;
        let mut hit = window.contains(target as i64, max_balls, WICKETS_PER_INNINGS);
        for d in &balls {
            if hit {
                break;
            }
            scored += d.total_runs as i64;
            if is_legal_for_bowling(d) {
                legal += 1;
            }
            if d.is_wicket {
                wickets += 1;
            }
            let runs_needed = target as i64 - scored;
            let balls_remaining = max_balls - legal;
            let wickets_left = WICKETS_PER_INNINGS - wickets;
            if runs_needed <= 0 || balls_remaining <= 0 || wickets_left <= 0 {
                break;
            }
            hit = window.contains(runs_needed, balls_remaining, wickets_left);
        }

        if hit {
            out.push(ChaseOutcome {
                match_id,
                target,
                chasing_team: first.batting_team.clone(),
                winner: meta.winner.clone(),
            });
        }
    }
    out
}

/// Vector-backed store. Keeps deliveries sorted on construction.
#[derive(Debug, Clone, Default)]
pub struct MemoryEventStore {
    deliveries: Vec<Delivery>,
}

impl MemoryEventStore {
    pub fn new(mut deliveries: Vec<Delivery>) -> Self {
        deliveries.sort_by_key(|d| (d.match_id, d.inning, d.over, d.ball));
        Self { deliveries }
    }

    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }
}

impl EventStore for MemoryEventStore {
    fn fetch_deliveries(
        &self,
        scope: &PlayerScope,
        filter: &DeliveryFilter,
    ) -> Result<Vec<Delivery>> {
        Ok(self
            .deliveries
            .iter()
            .filter(|d| scope.matches(d) && filter.matches(d))
            .cloned()
            .collect())
    }

    fn fetch_chase_outcomes(&self, window: &ChaseWindow) -> Result<Vec<ChaseOutcome>> {
        Ok(chase_outcomes_from_innings(&self.deliveries, window))
    }
}
