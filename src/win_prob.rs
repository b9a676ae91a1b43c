use serde::{Deserialize, Serialize};

use crate::aggregate::round2;
use crate::config::WinProbConfig;
use crate::error::{EngineError, EngineResult};
use crate::event_store::{ChaseOutcome, ChaseWindow, EventStore, WICKETS_PER_INNINGS};

const RULE_FLOOR: f64 = 5.0;
const RULE_CEIL: f64 = 95.0;
const MODEL_FLOOR: f64 = 1.0;
const MODEL_CEIL: f64 = 99.0;
const DEATH_OVERS_BALLS: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Situation {
    TargetAchieved,
    Impossible,
    Comfortable,
    Achievable,
    Challenging,
    Difficult,
}

impl Situation {
    fn from_rrr(rrr: f64) -> Self {
        if rrr <= 6.0 {
            Situation::Comfortable
        } else if rrr <= 9.0 {
            Situation::Achievable
        } else if rrr <= 12.0 {
            Situation::Challenging
        } else {
            Situation::Difficult
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinProbabilityResult {
    pub win_probability: f64,
    pub runs_needed: i64,
    pub balls_remaining: i64,
    pub wickets_left: i64,
    /// `None` once the chase can no longer be won.
    pub required_run_rate: Option<f64>,
    pub situation: Situation,
    pub factors: Vec<String>,
    pub historical_samples: usize,
    pub historical_success_rate: Option<f64>,
}

/// A validated chase position. `balls_remaining` is `overs * 6` and may be
/// fractional; it is only rounded for display and for the history window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChaseState {
    pub runs_needed: i64,
    pub balls_remaining: f64,
    pub wickets_left: i64,
}

impl ChaseState {
    pub fn new(
        current_score: i64,
        target: i64,
        overs_remaining: f64,
        wickets_left: i64,
    ) -> EngineResult<Self> {
        if current_score < 0 {
            return Err(EngineError::invalid("current_score", "score cannot be negative"));
        }
        if target <= 0 {
            return Err(EngineError::invalid("target", "target must be positive"));
        }
        if !overs_remaining.is_finite() || overs_remaining < 0.0 {
            return Err(EngineError::invalid(
                "overs_remaining",
                format!("expected a non-negative number of overs, got {overs_remaining}"),
            ));
        }
        if !(0..=WICKETS_PER_INNINGS).contains(&wickets_left) {
            return Err(EngineError::invalid(
                "wickets_left",
                format!("expected 0..=10 wickets, got {wickets_left}"),
            ));
        }
        Ok(Self {
            runs_needed: target - current_score,
            balls_remaining: overs_remaining * 6.0,
            wickets_left,
        })
    }

    fn is_live(&self) -> bool {
        self.runs_needed > 0 && self.balls_remaining > 0.0 && self.wickets_left > 0
    }

    /// Runs needed per over remaining.
    pub fn required_run_rate(&self) -> f64 {
        self.runs_needed as f64 / self.balls_remaining * 6.0
    }

    /// Whole balls left as shown to callers; a part-ball still to come counts.
    pub fn display_balls(&self) -> i64 {
        self.balls_remaining.max(0.0).ceil() as i64
    }

    pub fn window(&self, cfg: &WinProbConfig) -> ChaseWindow {
        ChaseWindow::around(
            self.runs_needed,
            self.balls_remaining.round() as i64,
            self.wickets_left,
            cfg.runs_tolerance,
            cfg.balls_tolerance,
            cfg.wickets_tolerance,
        )
    }
}

/// Terminal positions resolve without any modelling.
fn terminal(state: &ChaseState) -> Option<WinProbabilityResult> {
    let (probability, situation, rrr, factor) = if state.runs_needed <= 0 {
        (100.0, Situation::TargetAchieved, Some(0.0), "Target already reached".to_string())
    } else if state.balls_remaining <= 0.0 || state.wickets_left <= 0 {
        let why = if state.wickets_left <= 0 {
            "No wickets left"
        } else {
            "No balls left"
        };
        (0.0, Situation::Impossible, None, why.to_string())
    } else {
        return None;
    };
    Some(WinProbabilityResult {
        win_probability: probability,
        runs_needed: state.runs_needed.max(0),
        balls_remaining: state.display_balls(),
        wickets_left: state.wickets_left,
        required_run_rate: rrr,
        situation,
        factors: vec![factor],
        historical_samples: 0,
        historical_success_rate: None,
    })
}

fn base_from_rrr(rrr: f64) -> f64 {
    if rrr <= 6.0 {
        85.0
    } else if rrr <= 8.0 {
        70.0
    } else if rrr <= 10.0 {
        55.0
    } else if rrr <= 12.0 {
        35.0
    } else {
        15.0
    }
}

fn wicket_multiplier(wickets_left: i64) -> f64 {
    (0.5 + wickets_left as f64 * 0.1).min(1.5)
}

fn pressure_multiplier(rrr: f64, wickets_left: i64, balls_remaining: f64) -> f64 {
    let mut factor = if rrr > 15.0 {
        0.6
    } else if rrr > 12.0 {
        0.8
    } else {
        1.0
    };
    if wickets_left <= 2 {
        factor *= 0.7;
    } else if wickets_left <= 4 {
        factor *= 0.9;
    }
    let time = if balls_remaining >= 60.0 {
        1.0
    } else if balls_remaining >= 36.0 {
        0.95
    } else if balls_remaining >= 12.0 {
        0.9
    } else {
        0.8
    };
    factor * time
}

/// Rule-based estimate for a live chase, before any historical blend.
pub fn rule_based_probability(state: &ChaseState) -> f64 {
    let rrr = state.required_run_rate();
    let base = clamp(
        base_from_rrr(rrr) * wicket_multiplier(state.wickets_left),
        RULE_FLOOR,
        RULE_CEIL,
    );
    base * pressure_multiplier(rrr, state.wickets_left, state.balls_remaining)
}

fn rrr_factor(rrr: f64) -> String {
    let qualifier = if rrr <= 6.0 {
        "comfortable"
    } else if rrr <= 9.0 {
        "manageable"
    } else if rrr <= 12.0 {
        "demanding"
    } else {
        "very steep"
    };
    format!("Required rate {rrr:.2} is {qualifier}")
}

fn wickets_factor(wickets_left: i64) -> String {
    match wickets_left {
        7.. => format!("{wickets_left} wickets in hand"),
        4..=6 => format!("{wickets_left} wickets left, middle order exposed"),
        _ => format!("Only {wickets_left} wickets left, tail exposed"),
    }
}

/// Estimate against a pre-fetched set of comparable historical chases.
pub fn estimate_from_history(
    state: &ChaseState,
    history: &[ChaseOutcome],
    cfg: &WinProbConfig,
) -> WinProbabilityResult {
    if let Some(done) = terminal(state) {
        return done;
    }

    let rrr = state.required_run_rate();
    let rule = rule_based_probability(state);
    let mut factors = vec![
        format!(
            "{} runs needed from {} balls",
            state.runs_needed,
            state.display_balls()
        ),
        rrr_factor(rrr),
        wickets_factor(state.wickets_left),
    ];
    if state.balls_remaining <= DEATH_OVERS_BALLS {
        factors.push("Death-overs pressure".to_string());
    }

    let samples = history.len();
    let success_rate = (samples > 0).then(|| {
        history.iter().filter(|c| c.chased_successfully()).count() as f64 / samples as f64
    });
    let probability = match success_rate {
        Some(rate) if samples >= cfg.min_samples => {
            factors.push(format!(
                "Blended with {samples} similar chases ({:.0}% successful)",
                rate * 100.0
            ));
            rule * (1.0 - cfg.history_weight) + rate * 100.0 * cfg.history_weight
        }
        _ => rule,
    };

    WinProbabilityResult {
        win_probability: round2(clamp(probability, MODEL_FLOOR, MODEL_CEIL)),
        runs_needed: state.runs_needed,
        balls_remaining: state.display_balls(),
        wickets_left: state.wickets_left,
        required_run_rate: Some(round2(rrr)),
        situation: Situation::from_rrr(rrr),
        factors,
        historical_samples: samples,
        historical_success_rate: success_rate.map(|r| round2(r * 100.0)),
    }
}

pub fn estimate_win_probability(
    store: &impl EventStore,
    current_score: i64,
    target: i64,
    overs_remaining: f64,
    wickets_left: i64,
    cfg: &WinProbConfig,
) -> EngineResult<WinProbabilityResult> {
    let state = ChaseState::new(current_score, target, overs_remaining, wickets_left)?;
    if !state.is_live() {
        return Ok(estimate_from_history(&state, &[], cfg));
    }
    let history = store.fetch_chase_outcomes(&state.window(cfg))?;
    let result = estimate_from_history(&state, &history, cfg);
    tracing::debug!(
        runs_needed = state.runs_needed,
        balls_remaining = state.balls_remaining,
        wickets_left = state.wickets_left,
        samples = history.len(),
        probability = result.win_probability,
        "win probability estimated"
    );
    Ok(result)
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}
