//! Partnership segmentation.
//!
//! Each (match, inning) is cut into stands at every delivery that dismisses
//! one of the two batters at the crease. The dismissal ball belongs to the
//! stand it ends. Stand runs are total runs, extras included.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::aggregate::round2;
use crate::classify::{ends_partnership, is_boundary, is_dot_ball, is_legal_for_batting};
use crate::config::PartnershipConfig;
use crate::delivery::Delivery;
use crate::error::{Analysis, EngineError, EngineResult};
use crate::event_store::{DeliveryFilter, EventStore, PlayerScope};

/// One stand inside one innings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InningsPartnership {
    pub match_id: i64,
    pub inning: u8,
    /// 1 for the opening stand, 2 after the first wicket, ...
    pub wicket: u32,
    pub batter_one: String,
    pub batter_two: String,
    pub runs: u32,
    pub balls: u32,
    pub boundaries: u32,
    pub dot_balls: u32,
    pub strike_rate: f64,
    pub first_ball_seq: usize,
    pub last_ball_seq: usize,
    pub ended_by_dismissal: bool,
}

/// A pair's stands accumulated across matches and innings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Partnership {
    pub batter_one: String,
    pub batter_two: String,
    pub partner: String,
    pub runs: u32,
    pub balls: u32,
    pub strike_rate: f64,
    /// Boundaries struck by the queried player while paired.
    pub boundaries: u32,
    pub dot_balls: u32,
    pub partnership_instances: u32,
    pub highest: u32,
    pub dismissals: u32,
    pub unbroken: u32,
}

struct Stand<'a> {
    match_id: i64,
    inning: u8,
    first_seq: usize,
    balls: Vec<&'a Delivery>,
    ended_by_dismissal: bool,
}

impl Stand<'_> {
    fn last_seq(&self) -> usize {
        self.first_seq + self.balls.len().saturating_sub(1)
    }

    /// Most frequent (sorted) pair at the crease during the stand.
    fn pair(&self) -> Option<(String, String)> {
        let mut counts: Vec<((&str, &str), usize)> = Vec::new();
        for d in &self.balls {
            let key = sorted_pair(&d.striker, &d.non_striker);
            match counts.iter_mut().find(|(k, _)| *k == key) {
                Some((_, n)) => *n += 1,
                None => counts.push((key, 1)),
            }
        }
        let mut best: Option<((&str, &str), usize)> = None;
        for (key, n) in counts {
            if best.is_none_or(|(_, top)| n > top) {
                best = Some((key, n));
            }
        }
        best.map(|((a, b), _)| (a.to_string(), b.to_string()))
    }

    fn runs(&self) -> u32 {
        self.balls.iter().map(|d| d.total_runs).sum()
    }

    fn legal_balls(&self) -> u32 {
        self.balls.iter().filter(|d| is_legal_for_batting(d)).count() as u32
    }

    fn dot_balls(&self) -> u32 {
        self.balls
            .iter()
            .filter(|d| is_legal_for_batting(d) && is_dot_ball(d))
            .count() as u32
    }

    fn boundaries_by(&self, striker: Option<&str>) -> u32 {
        self.balls
            .iter()
            .filter(|d| is_boundary(d) && striker.is_none_or(|s| d.striker == s))
            .count() as u32
    }
}

fn sorted_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Cut deliveries into stands. Input order across innings does not matter;
/// within an innings, balls are put in (over, ball) order and numbered.
fn segment<'a>(deliveries: &'a [Delivery]) -> Vec<Stand<'a>> {
    let mut innings: BTreeMap<(i64, u8), Vec<&'a Delivery>> = BTreeMap::new();
    let mut malformed = 0usize;
    for d in deliveries {
        if d.striker == d.non_striker {
            malformed += 1;
            continue;
        }
        innings.entry(d.innings_key()).or_default().push(d);
    }
    if malformed > 0 {
        tracing::warn!(malformed, "dropped deliveries with identical striker and non-striker");
    }

    let mut stands = Vec::new();
    for ((match_id, inning), mut balls) in innings {
        balls.sort_by_key(|d| (d.over, d.ball));
        let mut current = Stand {
            match_id,
            inning,
            first_seq: 0,
            balls: Vec::new(),
            ended_by_dismissal: false,
        };
        for (seq, d) in balls.into_iter().enumerate() {
            if current.balls.is_empty() {
                current.first_seq = seq;
            }
            current.balls.push(d);
            if ends_partnership(d) {
                current.ended_by_dismissal = true;
                let next = Stand {
                    match_id,
                    inning,
                    first_seq: seq + 1,
                    balls: Vec::new(),
                    ended_by_dismissal: false,
                };
                stands.push(std::mem::replace(&mut current, next));
            }
        }
        // Whatever is left runs to the end of the data and is still a stand.
        if !current.balls.is_empty() {
            stands.push(current);
        }
    }
    stands
}

/// Every stand of every innings present in `deliveries`, in innings order
/// then batting order. No significance filter is applied, so the stand runs
/// of an innings add up to its total.
pub fn segment_innings(deliveries: &[Delivery]) -> Vec<InningsPartnership> {
    let mut out = Vec::new();
    let mut wicket = 0u32;
    let mut last_innings = None;
    for stand in segment(deliveries) {
        let key = (stand.match_id, stand.inning);
        if last_innings != Some(key) {
            wicket = 0;
            last_innings = Some(key);
        }
        wicket += 1;
        let (batter_one, batter_two) = stand.pair().unwrap_or_default();
        let runs = stand.runs();
        let balls = stand.legal_balls();
        out.push(InningsPartnership {
            match_id: stand.match_id,
            inning: stand.inning,
            wicket,
            batter_one,
            batter_two,
            runs,
            balls,
            boundaries: stand.boundaries_by(None),
            dot_balls: stand.dot_balls(),
            strike_rate: strike_rate(runs, balls),
            first_ball_seq: stand.first_seq,
            last_ball_seq: stand.last_seq(),
            ended_by_dismissal: stand.ended_by_dismissal,
        });
    }
    out
}

/// Aggregate `player`'s significant stands by partner, best first.
pub fn partnerships_for_player(
    deliveries: &[Delivery],
    player: &str,
    cfg: &PartnershipConfig,
) -> Vec<Partnership> {
    let stands = segment(deliveries);
    let total_stands = stands.len();
    let mut by_pair: HashMap<(String, String), Partnership> = HashMap::new();

    for stand in stands {
        let Some((one, two)) = stand.pair() else {
            continue;
        };
        let partner = if one == player {
            two.clone()
        } else if two == player {
            one.clone()
        } else {
            continue;
        };
        if partner.trim().is_empty() {
            continue;
        }
        let runs = stand.runs();
        let balls = stand.legal_balls();
        if balls < cfg.min_balls || runs == 0 {
            continue;
        }

        let entry = by_pair
            .entry((one.clone(), two.clone()))
            .or_insert_with(|| Partnership {
                batter_one: one,
                batter_two: two,
                partner,
                ..Partnership::default()
            });
        entry.runs += runs;
        entry.balls += balls;
        entry.boundaries += stand.boundaries_by(Some(player));
        entry.dot_balls += stand.dot_balls();
        entry.partnership_instances += 1;
        entry.highest = entry.highest.max(runs);
        if stand.ended_by_dismissal {
            entry.dismissals += 1;
        } else {
            entry.unbroken += 1;
        }
    }

    let mut out: Vec<Partnership> = by_pair
        .into_values()
        .map(|mut p| {
            p.strike_rate = strike_rate(p.runs, p.balls);
            p
        })
        .collect();
    out.sort_by(|a, b| {
        b.runs
            .cmp(&a.runs)
            .then(a.balls.cmp(&b.balls))
            .then_with(|| a.partner.cmp(&b.partner))
    });
    out.truncate(cfg.limit);
    tracing::debug!(
        player,
        stands = total_stands,
        partners = out.len(),
        "partnerships aggregated"
    );
    out
}

pub fn compute_partnerships(
    store: &impl EventStore,
    player: &str,
    filters: &DeliveryFilter,
    cfg: &PartnershipConfig,
) -> EngineResult<Analysis<Vec<Partnership>>> {
    if player.trim().is_empty() {
        return Err(EngineError::invalid("player", "player name is empty"));
    }
    let deliveries = store.fetch_deliveries(&PlayerScope::OnField(player.to_string()), filters)?;
    if deliveries.is_empty() {
        return Ok(Analysis::Empty);
    }
    Ok(Analysis::Data(partnerships_for_player(&deliveries, player, cfg)))
}

fn strike_rate(runs: u32, balls: u32) -> f64 {
    if balls == 0 {
        0.0
    } else {
        round2(runs as f64 / balls as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DismissalKind;

    fn ball(seq: u32, striker: &str, non_striker: &str, runs: u32) -> Delivery {
        Delivery {
            match_id: 3,
            inning: 1,
            over: seq / 6,
            ball: seq % 6 + 1,
            striker: striker.to_string(),
            non_striker: non_striker.to_string(),
            bowler: "Starc".to_string(),
            batter_runs: runs,
            total_runs: runs,
            ..Delivery::default()
        }
    }

    fn dismiss(mut d: Delivery, who: &str) -> Delivery {
        d.is_wicket = true;
        d.player_dismissed = Some(who.to_string());
        d.dismissal_kind = Some(DismissalKind::Caught);
        d
    }

    fn cfg() -> PartnershipConfig {
        PartnershipConfig::default()
    }

    #[test]
    fn stands_split_at_dismissals_and_close_at_end_of_data() {
        let mut balls = Vec::new();
        for i in 0..8 {
            balls.push(ball(i, "Rohit", "Kishan", 1));
        }
        balls.push(dismiss(ball(8, "Kishan", "Rohit", 2), "Kishan"));
        for i in 9..20 {
            balls.push(ball(i, "Rohit", "Surya", 2));
        }

        let stands = segment_innings(&balls);
        assert_eq!(stands.len(), 2);
        assert_eq!(stands[0].wicket, 1);
        assert_eq!(stands[0].runs, 10);
        assert!(stands[0].ended_by_dismissal);
        assert_eq!(stands[0].last_ball_seq, 8);
        assert_eq!(stands[1].first_ball_seq, 9);
        assert_eq!(stands[1].runs, 22);
        assert!(!stands[1].ended_by_dismissal);

        let total: u32 = balls.iter().map(|d| d.total_runs).sum();
        assert_eq!(stands.iter().map(|s| s.runs).sum::<u32>(), total);
    }

    #[test]
    fn short_and_scoreless_stands_are_dropped() {
        let mut balls = Vec::new();
        for i in 0..3 {
            balls.push(ball(i, "Rohit", "Kishan", 4));
        }
        balls.push(dismiss(ball(3, "Rohit", "Kishan", 0), "Kishan"));
        for i in 4..12 {
            balls.push(ball(i, "Rohit", "Surya", 0));
        }
        balls.push(dismiss(ball(12, "Surya", "Rohit", 0), "Surya"));
        for i in 13..20 {
            balls.push(ball(i, "Rohit", "Pollard", 1));
        }

        let out = partnerships_for_player(&balls, "Rohit", &cfg());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].partner, "Pollard");
        assert_eq!(out[0].runs, 7);
        assert_eq!(out[0].unbroken, 1);
    }

    #[test]
    fn same_pair_accumulates_across_matches() {
        let mut balls = Vec::new();
        for i in 0..6 {
            balls.push(ball(i, "Rohit", "Kishan", 2));
        }
        for i in 0..10 {
            let mut d = ball(i, "Kishan", "Rohit", if i == 0 { 6 } else { 1 });
            d.match_id = 4;
            balls.push(d);
        }

        let out = partnerships_for_player(&balls, "Rohit", &cfg());
        assert_eq!(out.len(), 1);
        let p = &out[0];
        assert_eq!((p.batter_one.as_str(), p.batter_two.as_str()), ("Kishan", "Rohit"));
        assert_eq!(p.partnership_instances, 2);
        assert_eq!(p.runs, 12 + 15);
        assert_eq!(p.balls, 16);
        assert_eq!(p.highest, 15);
        // the six was Kishan's, so Rohit's boundary tally stays at zero
        assert_eq!(p.boundaries, 0);
        assert_eq!(p.strike_rate, 168.75);
    }

    #[test]
    fn malformed_pairing_is_ignored() {
        let mut balls = (0..7).map(|i| ball(i, "Rohit", "Kishan", 1)).collect::<Vec<_>>();
        balls.push(ball(7, "Rohit", "Rohit", 50));
        let out = partnerships_for_player(&balls, "Rohit", &cfg());
        assert_eq!(out[0].runs, 7);
    }

    #[test]
    fn list_is_capped() {
        let mut balls = Vec::new();
        for m in 0..5i64 {
            for i in 0..6 {
                let mut d = ball(i, "Rohit", &format!("Partner{m}"), m as u32 + 1);
                d.match_id = m;
                balls.push(d);
            }
        }
        let capped = PartnershipConfig {
            limit: 3,
            ..PartnershipConfig::default()
        };
        let out = partnerships_for_player(&balls, "Rohit", &capped);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].partner, "Partner4");
        assert!(out.windows(2).all(|w| w[0].runs >= w[1].runs));
    }
}
