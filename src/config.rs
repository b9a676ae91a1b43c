use std::env;
use std::path::PathBuf;

use crate::delivery::OverNumbering;

const CACHE_DIR: &str = "cricket_analytics";
const DB_FILE: &str = "ipl_data.sqlite";

#[derive(Debug, Clone, PartialEq)]
pub struct PartnershipConfig {
    /// Legal balls a stand needs before it is reported.
    pub min_balls: u32,
    pub limit: usize,
}

impl Default for PartnershipConfig {
    fn default() -> Self {
        Self {
            min_balls: 6,
            limit: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WinProbConfig {
    /// Share of the blended estimate taken from historical chases.
    pub history_weight: f64,
    pub min_samples: usize,
    pub runs_tolerance: i64,
    pub balls_tolerance: i64,
    pub wickets_tolerance: i64,
}

impl Default for WinProbConfig {
    fn default() -> Self {
        Self {
            history_weight: 0.30,
            min_samples: 5,
            runs_tolerance: 10,
            balls_tolerance: 6,
            wickets_tolerance: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub partnership: PartnershipConfig,
    pub win_prob: WinProbConfig,
    pub form_window: usize,
    pub report_parallelism: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            partnership: PartnershipConfig::default(),
            win_prob: WinProbConfig::default(),
            form_window: 10,
            report_parallelism: 4,
        }
    }
}

/// Process settings. The binary loads `.env.local` / `.env` before calling
/// [`Settings::from_env`]; bad values fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_path: Option<PathBuf>,
    pub over_numbering: OverNumbering,
    pub engine: EngineConfig,
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = EngineConfig::default();
        let database_path = env::var("DATABASE_PATH")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .or_else(default_db_path);
        let over_numbering = env::var("OVER_NUMBERING")
            .ok()
            .and_then(|v| OverNumbering::parse(&v))
            .unwrap_or_default();

        let engine = EngineConfig {
            partnership: PartnershipConfig {
                min_balls: env_parse("PARTNERSHIP_MIN_BALLS")
                    .unwrap_or(defaults.partnership.min_balls)
                    .clamp(1, 120),
                limit: env_parse("PARTNERSHIP_LIMIT")
                    .unwrap_or(defaults.partnership.limit)
                    .clamp(1, 500),
            },
            win_prob: WinProbConfig {
                history_weight: env_parse::<f64>("WIN_PROB_HISTORY_WEIGHT")
                    .filter(|w| w.is_finite())
                    .unwrap_or(defaults.win_prob.history_weight)
                    .clamp(0.0, 1.0),
                min_samples: env_parse("WIN_PROB_MIN_SAMPLES")
                    .unwrap_or(defaults.win_prob.min_samples)
                    .max(1),
                ..defaults.win_prob
            },
            form_window: env_parse("FORM_WINDOW")
                .unwrap_or(defaults.form_window)
                .clamp(1, 200),
            report_parallelism: env_parse("REPORT_PARALLELISM")
                .unwrap_or(defaults.report_parallelism)
                .clamp(1, 32),
        };

        Self {
            database_path,
            over_numbering,
            engine,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<T>().ok())
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

pub fn default_db_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(DB_FILE))
}
