//! Season-by-season and venue-by-venue batting splits of a delivery set.
//! Deliveries without the relevant match metadata are left out.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::aggregate::{BattingAccumulator, round2};
use crate::classify::{batting_dismissal, is_legal_for_batting};
use crate::delivery::Delivery;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeasonLine {
    pub season: String,
    pub runs: u32,
    pub balls: u32,
    pub dismissals: u32,
    pub dots: u32,
    pub fours: u32,
    pub sixes: u32,
    pub strike_rate: f64,
    /// `None` until the batter has been dismissed in the season.
    pub average: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VenueLine {
    pub venue: String,
    pub matches: usize,
    pub runs: u32,
    pub balls: u32,
    pub strike_rate: f64,
    pub dismissals: u32,
}

/// Seasons in ascending order.
pub fn yearly_breakdown(deliveries: &[Delivery]) -> Vec<SeasonLine> {
    let mut seasons: BTreeMap<&str, BattingAccumulator> = BTreeMap::new();
    for d in deliveries {
        let Some(season) = d.season() else {
            continue;
        };
        seasons.entry(season).or_default().absorb(d);
    }

    seasons
        .into_iter()
        .map(|(season, acc)| {
            let s = acc.finish();
            SeasonLine {
                season: season.to_string(),
                runs: s.runs,
                balls: s.balls_faced,
                dismissals: s.dismissals,
                dots: s.dot_balls,
                fours: s.fours,
                sixes: s.sixes,
                strike_rate: s.strike_rate,
                average: (s.dismissals > 0).then_some(s.average),
            }
        })
        .collect()
}

#[derive(Default)]
struct VenueTally {
    matches: BTreeSet<i64>,
    runs: u32,
    balls: u32,
    dismissals: u32,
}

/// Venues with at least one ball faced, highest run total first.
pub fn venue_breakdown(deliveries: &[Delivery]) -> Vec<VenueLine> {
    let mut venues: BTreeMap<&str, VenueTally> = BTreeMap::new();
    for d in deliveries {
        let Some(venue) = d.venue() else {
            continue;
        };
        let tally = venues.entry(venue).or_default();
        tally.matches.insert(d.match_id);
        tally.runs += d.batter_runs;
        if is_legal_for_batting(d) {
            tally.balls += 1;
        }
        if batting_dismissal(d, &d.striker) {
            tally.dismissals += 1;
        }
    }

    let mut out: Vec<VenueLine> = venues
        .into_iter()
        .filter(|(_, t)| t.balls > 0)
        .map(|(venue, t)| VenueLine {
            venue: venue.to_string(),
            matches: t.matches.len(),
            runs: t.runs,
            balls: t.balls,
            strike_rate: round2(t.runs as f64 / t.balls as f64 * 100.0),
            dismissals: t.dismissals,
        })
        .collect();
    // Stable sort keeps venue name order among equal run totals.
    out.sort_by(|a, b| b.runs.cmp(&a.runs));
    out
}
