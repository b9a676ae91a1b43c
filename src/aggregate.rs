use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::classify::{
    batting_dismissal, bowler_credited_dismissal, is_boundary, is_dot_ball, is_legal_for_batting,
    is_legal_for_bowling,
};
use crate::delivery::Delivery;
use crate::error::EngineError;

/// Which side of the ball a player-level report looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerRole {
    Batter,
    Bowler,
}

impl fmt::Display for PlayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PlayerRole::Batter => "batter",
            PlayerRole::Bowler => "bowler",
        })
    }
}

impl FromStr for PlayerRole {
    type Err = EngineError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "batter" | "batting" | "batsman" => Ok(PlayerRole::Batter),
            "bowler" | "bowling" => Ok(PlayerRole::Bowler),
            _ => Err(EngineError::invalid(
                "role",
                format!("unsupported role `{raw}` (expected batter or bowler)"),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BattingAggregate {
    pub runs: u32,
    pub balls_faced: u32,
    pub innings: u32,
    pub dismissals: u32,
    pub not_outs: u32,
    pub boundaries: u32,
    pub fours: u32,
    pub sixes: u32,
    pub dot_balls: u32,
    pub strike_rate: f64,
    /// Runs per dismissal; equals total runs while never dismissed.
    pub average: f64,
    pub boundary_percent: f64,
    pub dot_ball_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BowlingAggregate {
    pub runs_conceded: u32,
    pub balls_bowled: u32,
    pub wickets: u32,
    pub maidens: u32,
    pub economy: f64,
    pub average: f64,
    pub strike_rate: f64,
    pub dot_balls: u32,
    pub boundaries_conceded: u32,
    pub extras: u32,
}

impl BowlingAggregate {
    /// Cricket over notation, e.g. 22 balls -> "3.4".
    pub fn overs_display(&self) -> String {
        format!("{}.{}", self.balls_bowled / 6, self.balls_bowled % 6)
    }
}

pub fn compute_batting_stats(deliveries: &[Delivery]) -> BattingAggregate {
    let mut acc = BattingAccumulator::default();
    for d in deliveries {
        acc.absorb(d);
    }
    acc.finish()
}

pub fn compute_bowling_stats(deliveries: &[Delivery]) -> BowlingAggregate {
    let mut acc = BowlingAccumulator::default();
    for d in deliveries {
        acc.absorb(d);
    }
    acc.finish()
}

/// Folds deliveries faced into a [`BattingAggregate`]. Each delivery is
/// credited to its striker; an innings counts as "out" when any of its
/// deliveries dismisses that striker.
#[derive(Debug, Default)]
pub struct BattingAccumulator {
    stats: BattingAggregate,
    innings_out: BTreeMap<(i64, u8), bool>,
}

impl BattingAccumulator {
    pub fn absorb(&mut self, d: &Delivery) {
        let s = &mut self.stats;
        if is_legal_for_batting(d) {
            s.balls_faced += 1;
            if is_dot_ball(d) {
                s.dot_balls += 1;
            }
        }
        s.runs += d.batter_runs;
        if is_boundary(d) {
            s.boundaries += 1;
            if d.batter_runs == 4 {
                s.fours += 1;
            } else {
                s.sixes += 1;
            }
        }

        let out = self.innings_out.entry(d.innings_key()).or_insert(false);
        if batting_dismissal(d, &d.striker) {
            *out = true;
        }
    }

    pub fn finish(self) -> BattingAggregate {
        let mut s = self.stats;
        s.innings = self.innings_out.len() as u32;
        s.dismissals = self.innings_out.values().filter(|out| **out).count() as u32;
        s.not_outs = s.innings - s.dismissals;

        s.strike_rate = ratio(s.runs, s.balls_faced, 100.0);
        s.boundary_percent = ratio(s.boundaries, s.balls_faced, 100.0);
        s.dot_ball_percent = ratio(s.dot_balls, s.balls_faced, 100.0);
        s.average = if s.dismissals > 0 {
            round2(s.runs as f64 / s.dismissals as f64)
        } else {
            s.runs as f64
        };
        s
    }
}

#[derive(Debug, Default)]
pub struct BowlingAccumulator {
    stats: BowlingAggregate,
    // (match, inning, over) -> (legal balls, runs conceded)
    overs: BTreeMap<(i64, u8, u32), (u32, u32)>,
}

impl BowlingAccumulator {
    pub fn absorb(&mut self, d: &Delivery) {
        let s = &mut self.stats;
        let legal = is_legal_for_bowling(d);
        let over = self
            .overs
            .entry((d.match_id, d.inning, d.over))
            .or_insert((0, 0));

        if legal {
            s.balls_bowled += 1;
            over.0 += 1;
        }
        s.runs_conceded += d.total_runs;
        over.1 += d.total_runs;

        if bowler_credited_dismissal(d) {
            s.wickets += 1;
        }
        if d.extra_runs > 0 {
            s.extras += d.extra_runs;
        }
        if is_boundary(d) {
            s.boundaries_conceded += 1;
        }
        if legal && is_dot_ball(d) {
            s.dot_balls += 1;
        }
    }

    pub fn finish(self) -> BowlingAggregate {
        let mut s = self.stats;
        s.maidens = self
            .overs
            .values()
            .filter(|(legal, runs)| *legal >= 6 && *runs == 0)
            .count() as u32;

        if s.balls_bowled > 0 {
            s.economy = round2(s.runs_conceded as f64 / (s.balls_bowled as f64 / 6.0));
        }
        if s.wickets > 0 {
            s.average = round2(s.runs_conceded as f64 / s.wickets as f64);
            s.strike_rate = round2(s.balls_bowled as f64 / s.wickets as f64);
        }
        s
    }
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn ratio(num: u32, den: u32, scale: f64) -> f64 {
    if den == 0 {
        0.0
    } else {
        round2(num as f64 / den as f64 * scale)
    }
}
