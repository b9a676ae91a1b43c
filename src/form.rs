use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{PlayerRole, round2};
use crate::classify::{bowler_credited_dismissal, is_legal_for_batting, is_legal_for_bowling};
use crate::delivery::Delivery;
use crate::error::{Analysis, EngineError, EngineResult};
use crate::event_store::{DeliveryFilter, EventStore, PlayerScope};

const TREND_RECENT_MATCHES: usize = 3;
const TREND_MIN_MATCHES: usize = 4;
const TREND_MARGIN: f64 = 0.15;
const CONSISTENCY_MIN_MATCHES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormTrend {
    Improving,
    Stable,
    Declining,
    InsufficientData,
}

/// One player's figures in one match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormRecord {
    pub match_id: i64,
    /// Canonical `YYYY-MM-DD`, `None` when missing or unparseable.
    pub date: Option<String>,
    pub season: Option<String>,
    /// Runs scored (batter) or conceded (bowler).
    pub runs: u32,
    pub balls: u32,
    pub fours: u32,
    pub sixes: u32,
    pub boundaries: u32,
    pub dismissed: bool,
    pub wickets: u32,
    /// Strike rate for batters, economy for bowlers.
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSummary {
    pub player: String,
    pub role: PlayerRole,
    pub matches_played: usize,
    pub runs: u32,
    pub balls: u32,
    pub dismissals: u32,
    pub wickets: u32,
    pub fours: u32,
    pub sixes: u32,
    pub boundaries: u32,
    pub average: f64,
    pub strike_rate: f64,
    pub economy: f64,
    pub form_trend: FormTrend,
    pub consistency_rating: f64,
    /// Runs per match for batters, wickets per match for bowlers, most
    /// recent first.
    pub recent_scores: Vec<u32>,
    pub recent_matches: Vec<FormRecord>,
}

/// Normalize a source date to `YYYY-MM-DD`.
///
/// Year-first dates are taken as written. A slash or dash date ending in a
/// four-digit year is always read day-first (`05/04/2019` is 5 April).
/// A trailing time component is ignored.
pub fn normalize_date(raw: &str) -> Option<String> {
    let day_part = raw.trim().split([' ', 'T']).next()?;
    let parts: Vec<&str> = day_part.split(['-', '/']).collect();
    let [a, b, c] = parts.as_slice() else {
        return None;
    };
    let (year, month, day) = if a.len() == 4 {
        (a, b, c)
    } else if c.len() == 4 {
        (c, b, a)
    } else {
        return None;
    };
    let date = NaiveDate::from_ymd_opt(
        year.parse().ok()?,
        month.parse().ok()?,
        day.parse().ok()?,
    )?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// One record per match with at least one legal ball for `role`, most recent
/// first: dated matches by date then match id (both descending), undated
/// matches after them by match id descending.
pub fn form_records(deliveries: &[Delivery], player: &str, role: PlayerRole) -> Vec<FormRecord> {
    let mut by_match: BTreeMap<i64, FormRecord> = BTreeMap::new();
    for d in deliveries {
        let involved = match role {
            PlayerRole::Batter => d.striker == player,
            PlayerRole::Bowler => d.bowler == player,
        };
        if !involved {
            continue;
        }
        let rec = by_match.entry(d.match_id).or_insert_with(|| FormRecord {
            match_id: d.match_id,
            date: d.match_date().and_then(|raw| {
                let date = normalize_date(raw);
                if date.is_none() {
                    tracing::warn!(match_id = d.match_id, raw, "unparseable match date");
                }
                date
            }),
            season: d.season().map(str::to_string),
            ..FormRecord::default()
        });
        match role {
            PlayerRole::Batter => {
                rec.runs += d.batter_runs;
                if is_legal_for_batting(d) {
                    rec.balls += 1;
                }
                match d.batter_runs {
                    4 => rec.fours += 1,
                    6 => rec.sixes += 1,
                    _ => {}
                }
                if bowler_credited_dismissal(d) && d.player_dismissed.as_deref() == Some(player) {
                    rec.dismissed = true;
                }
            }
            PlayerRole::Bowler => {
                rec.runs += d.total_runs;
                if is_legal_for_bowling(d) {
                    rec.balls += 1;
                }
                if bowler_credited_dismissal(d) {
                    rec.wickets += 1;
                }
            }
        }
    }

    let mut records: Vec<FormRecord> = by_match
        .into_values()
        .filter(|r| r.balls > 0)
        .map(|mut r| {
            r.boundaries = r.fours + r.sixes;
            r.rate = match role {
                PlayerRole::Batter => round2(r.runs as f64 / r.balls as f64 * 100.0),
                PlayerRole::Bowler => round2(r.runs as f64 / (r.balls as f64 / 6.0)),
            };
            r
        })
        .collect();
    records.sort_by(|a, b| match (&a.date, &b.date) {
        (Some(x), Some(y)) => y.cmp(x).then(b.match_id.cmp(&a.match_id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => b.match_id.cmp(&a.match_id),
    });
    records
}

/// Leading three matches against the rest of the window.
pub fn classify_trend(scores: &[u32]) -> FormTrend {
    if scores.len() < TREND_MIN_MATCHES {
        return FormTrend::InsufficientData;
    }
    let (recent, older) = scores.split_at(TREND_RECENT_MATCHES);
    let recent_avg = mean(recent);
    let older_avg = mean(older);
    if recent_avg > older_avg * (1.0 + TREND_MARGIN) {
        FormTrend::Improving
    } else if recent_avg < older_avg * (1.0 - TREND_MARGIN) {
        FormTrend::Declining
    } else {
        FormTrend::Stable
    }
}

/// 100 minus the coefficient of variation (as a percentage), floored at 0.
pub fn consistency_rating(scores: &[u32]) -> f64 {
    if scores.len() < CONSISTENCY_MIN_MATCHES {
        return 0.0;
    }
    let m = mean(scores);
    if m == 0.0 {
        return 0.0;
    }
    let variance = scores
        .iter()
        .map(|s| (*s as f64 - m).powi(2))
        .sum::<f64>()
        / scores.len() as f64;
    let cv = variance.sqrt() / m;
    round2((100.0 - cv * 100.0).max(0.0))
}

fn mean(values: &[u32]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64
    }
}

pub fn summarize_form(
    player: &str,
    role: PlayerRole,
    deliveries: &[Delivery],
    last_n: usize,
) -> FormSummary {
    let mut records = form_records(deliveries, player, role);
    records.truncate(last_n);

    let runs: u32 = records.iter().map(|r| r.runs).sum();
    let balls: u32 = records.iter().map(|r| r.balls).sum();
    let dismissals = records.iter().filter(|r| r.dismissed).count() as u32;
    let wickets: u32 = records.iter().map(|r| r.wickets).sum();
    let fours: u32 = records.iter().map(|r| r.fours).sum();
    let sixes: u32 = records.iter().map(|r| r.sixes).sum();

    let recent_scores: Vec<u32> = records
        .iter()
        .map(|r| match role {
            PlayerRole::Batter => r.runs,
            PlayerRole::Bowler => r.wickets,
        })
        .collect();

    let (average, strike_rate, economy) = match role {
        PlayerRole::Batter => {
            let average = if dismissals > 0 {
                round2(runs as f64 / dismissals as f64)
            } else {
                runs as f64
            };
            let sr = if balls > 0 {
                round2(runs as f64 / balls as f64 * 100.0)
            } else {
                0.0
            };
            (average, sr, 0.0)
        }
        PlayerRole::Bowler => {
            let average = if wickets > 0 {
                round2(runs as f64 / wickets as f64)
            } else {
                0.0
            };
            let sr = if wickets > 0 {
                round2(balls as f64 / wickets as f64)
            } else {
                0.0
            };
            let economy = if balls > 0 {
                round2(runs as f64 / (balls as f64 / 6.0))
            } else {
                0.0
            };
            (average, sr, economy)
        }
    };

    FormSummary {
        player: player.to_string(),
        role,
        matches_played: records.len(),
        runs,
        balls,
        dismissals,
        wickets,
        fours,
        sixes,
        boundaries: fours + sixes,
        average,
        strike_rate,
        economy,
        form_trend: classify_trend(&recent_scores),
        consistency_rating: consistency_rating(&recent_scores),
        recent_scores,
        recent_matches: records,
    }
}

pub fn compute_recent_form(
    store: &impl EventStore,
    player: &str,
    role: PlayerRole,
    last_n: usize,
    filters: &DeliveryFilter,
) -> EngineResult<Analysis<FormSummary>> {
    if last_n == 0 {
        return Err(EngineError::invalid("last_n", "form window must be at least one match"));
    }
    let scope = match role {
        PlayerRole::Batter => PlayerScope::Batter(player.to_string()),
        PlayerRole::Bowler => PlayerScope::Bowler(player.to_string()),
    };
    let deliveries = store.fetch_deliveries(&scope, filters)?;
    let summary = summarize_form(player, role, &deliveries, last_n);
    tracing::debug!(
        player,
        %role,
        matches = summary.matches_played,
        trend = ?summary.form_trend,
        "recent form computed"
    );
    if summary.matches_played == 0 {
        return Ok(Analysis::Empty);
    }
    Ok(Analysis::Data(summary))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::delivery::{DismissalKind, ExtrasKind, MatchMeta};

    fn faced(match_id: i64, date: Option<&str>, runs: &[u32]) -> Vec<Delivery> {
        let meta = Arc::new(MatchMeta {
            match_id,
            date: date.map(str::to_string),
            ..MatchMeta::default()
        });
        runs.iter()
            .enumerate()
            .map(|(i, r)| Delivery {
                match_id,
                inning: 1,
                over: i as u32 / 6,
                ball: i as u32 % 6 + 1,
                striker: "Buttler".to_string(),
                non_striker: "Jaiswal".to_string(),
                bowler: "Chahar".to_string(),
                batter_runs: *r,
                total_runs: *r,
                meta: Some(meta.clone()),
                ..Delivery::default()
            })
            .collect()
    }

    #[test]
    fn dates_normalize_to_iso() {
        assert_eq!(normalize_date("2019-04-05").as_deref(), Some("2019-04-05"));
        assert_eq!(normalize_date("2019/4/5").as_deref(), Some("2019-04-05"));
        assert_eq!(normalize_date("05/04/2019").as_deref(), Some("2019-04-05"));
        assert_eq!(normalize_date("5-4-2019").as_deref(), Some("2019-04-05"));
        assert_eq!(normalize_date("2019-04-05 19:30:00").as_deref(), Some("2019-04-05"));
        assert_eq!(normalize_date("31/02/2019"), None);
        assert_eq!(normalize_date("Unknown"), None);
        assert_eq!(normalize_date("05/04/19"), None);
    }

    #[test]
    fn records_order_dated_first_then_undated_by_id() {
        let mut balls = Vec::new();
        balls.extend(faced(1, Some("10/04/2019"), &[1]));
        balls.extend(faced(2, Some("2019-04-01"), &[2]));
        balls.extend(faced(3, None, &[3]));
        balls.extend(faced(4, Some("garbage"), &[4]));
        let ids: Vec<i64> = form_records(&balls, "Buttler", PlayerRole::Batter)
            .iter()
            .map(|r| r.match_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 4, 3]);
    }

    #[test]
    fn matches_without_legal_balls_are_skipped() {
        let mut wide = faced(9, Some("2020-01-01"), &[0]);
        wide[0].extras = ExtrasKind::Wide;
        let records = form_records(&wide, "Buttler", PlayerRole::Batter);
        assert!(records.is_empty());
    }

    #[test]
    fn trend_compares_leading_three_with_rest() {
        assert_eq!(classify_trend(&[30, 30, 30, 10, 10]), FormTrend::Improving);
        assert_eq!(classify_trend(&[10, 10, 10, 30]), FormTrend::Declining);
        assert_eq!(classify_trend(&[20, 22, 18, 20]), FormTrend::Stable);
        assert_eq!(classify_trend(&[50, 0, 0]), FormTrend::InsufficientData);
    }

    #[test]
    fn consistency_rating_edges() {
        assert_eq!(consistency_rating(&[10, 20, 30]), 59.18);
        assert_eq!(consistency_rating(&[25, 25, 25, 25]), 100.0);
        assert_eq!(consistency_rating(&[0, 0, 0]), 0.0);
        assert_eq!(consistency_rating(&[40, 10]), 0.0);
        assert_eq!(consistency_rating(&[100, 0, 0, 0]), 0.0);
    }

    #[test]
    fn summary_totals_over_window() {
        let mut balls = Vec::new();
        balls.extend(faced(1, Some("2019-04-01"), &[4, 6, 0]));
        balls.extend(faced(2, Some("2019-04-03"), &[1, 1]));
        let mut out = faced(3, Some("2019-04-05"), &[4, 0]);
        out[1].is_wicket = true;
        out[1].player_dismissed = Some("Buttler".to_string());
        out[1].dismissal_kind = Some(DismissalKind::Bowled);
        balls.extend(out);

        let s = summarize_form("Buttler", PlayerRole::Batter, &balls, 2);
        assert_eq!(s.matches_played, 2);
        assert_eq!(s.recent_scores, vec![4, 2]);
        assert_eq!(s.runs, 6);
        assert_eq!(s.balls, 4);
        assert_eq!(s.dismissals, 1);
        assert_eq!(s.average, 6.0);
        assert_eq!(s.strike_rate, 150.0);
        assert_eq!(s.recent_matches[0].date.as_deref(), Some("2019-04-05"));
        assert_eq!(s.form_trend, FormTrend::InsufficientData);
    }

    #[test]
    fn bowling_form_scores_wickets() {
        let mut balls = faced(1, Some("2021-05-01"), &[0, 0, 1, 0, 0, 0]);
        balls[0].is_wicket = true;
        balls[0].player_dismissed = Some("Buttler".to_string());
        balls[0].dismissal_kind = Some(DismissalKind::Caught);
        balls[2].extras = ExtrasKind::NoBall;
        balls[2].batter_runs = 0;
        balls[2].extra_runs = 1;

        let s = summarize_form("Chahar", PlayerRole::Bowler, &balls, 10);
        assert_eq!(s.wickets, 1);
        assert_eq!(s.balls, 5);
        assert_eq!(s.runs, 1);
        assert_eq!(s.economy, 1.2);
        assert_eq!(s.recent_scores, vec![1]);
    }
}
