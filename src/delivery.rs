use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Extras category recorded against a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrasKind {
    #[default]
    None,
    Wide,
    NoBall,
    Bye,
    LegBye,
    Penalty,
}

impl ExtrasKind {
    /// Lenient parse of the spellings found in ball-by-ball sources
    /// (`wides`, `noballs`, `leg-bye`, ...). Unknown values have no effect.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return ExtrasKind::None;
        };
        let key: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match key.as_str() {
            "wide" | "wides" | "wd" => ExtrasKind::Wide,
            "noball" | "noballs" | "nb" => ExtrasKind::NoBall,
            "bye" | "byes" | "b" => ExtrasKind::Bye,
            "legbye" | "legbyes" | "lb" => ExtrasKind::LegBye,
            "penalty" | "penalties" | "pen" => ExtrasKind::Penalty,
            _ => ExtrasKind::None,
        }
    }

    pub fn as_source_str(self) -> Option<&'static str> {
        match self {
            ExtrasKind::None => None,
            ExtrasKind::Wide => Some("wides"),
            ExtrasKind::NoBall => Some("noballs"),
            ExtrasKind::Bye => Some("byes"),
            ExtrasKind::LegBye => Some("legbyes"),
            ExtrasKind::Penalty => Some("penalty"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissalKind {
    Bowled,
    Caught,
    CaughtAndBowled,
    Lbw,
    Stumped,
    HitWicket,
    RunOut,
    RetiredHurt,
    RetiredOut,
    ObstructingTheField,
    TimedOut,
    HandledTheBall,
    HitTheBallTwice,
    Other,
}

impl DismissalKind {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let raw = raw?.trim();
        if raw.is_empty() {
            return None;
        }
        let key: String = raw
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        let kind = match key.as_str() {
            "bowled" => DismissalKind::Bowled,
            "caught" => DismissalKind::Caught,
            "caughtandbowled" => DismissalKind::CaughtAndBowled,
            "lbw" | "legbeforewicket" => DismissalKind::Lbw,
            "stumped" => DismissalKind::Stumped,
            "hitwicket" => DismissalKind::HitWicket,
            "runout" => DismissalKind::RunOut,
            "retiredhurt" => DismissalKind::RetiredHurt,
            "retiredout" => DismissalKind::RetiredOut,
            "obstructingthefield" | "obstructingfield" => DismissalKind::ObstructingTheField,
            "timedout" => DismissalKind::TimedOut,
            "handledtheball" | "handledball" => DismissalKind::HandledTheBall,
            "hittheballtwice" | "hitballtwice" => DismissalKind::HitTheBallTwice,
            _ => DismissalKind::Other,
        };
        Some(kind)
    }

    /// Kinds that count toward the bowler's wicket tally.
    pub fn credits_bowler(self) -> bool {
        matches!(
            self,
            DismissalKind::Bowled
                | DismissalKind::Caught
                | DismissalKind::CaughtAndBowled
                | DismissalKind::Lbw
                | DismissalKind::Stumped
                | DismissalKind::HitWicket
        )
    }

    pub fn as_source_str(self) -> &'static str {
        match self {
            DismissalKind::Bowled => "bowled",
            DismissalKind::Caught => "caught",
            DismissalKind::CaughtAndBowled => "caught and bowled",
            DismissalKind::Lbw => "lbw",
            DismissalKind::Stumped => "stumped",
            DismissalKind::HitWicket => "hit wicket",
            DismissalKind::RunOut => "run out",
            DismissalKind::RetiredHurt => "retired hurt",
            DismissalKind::RetiredOut => "retired out",
            DismissalKind::ObstructingTheField => "obstructing the field",
            DismissalKind::TimedOut => "timed out",
            DismissalKind::HandledTheBall => "handled the ball",
            DismissalKind::HitTheBallTwice => "hit the ball twice",
            DismissalKind::Other => "other",
        }
    }
}

/// Match-level metadata joined onto deliveries. Read-only; shared per match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchMeta {
    pub match_id: i64,
    pub season: Option<String>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub date: Option<String>,
    pub match_type: Option<String>,
    pub winner: Option<String>,
    pub target_runs: Option<u32>,
    pub target_overs: Option<f64>,
}

/// One ball bowled. `over` is always zero-based once materialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub match_id: i64,
    pub inning: u8,
    pub batting_team: String,
    pub bowling_team: String,
    pub over: u32,
    pub ball: u32,
    pub striker: String,
    pub non_striker: String,
    pub bowler: String,
    pub batter_runs: u32,
    pub extra_runs: u32,
    pub total_runs: u32,
    pub extras: ExtrasKind,
    pub is_wicket: bool,
    pub player_dismissed: Option<String>,
    pub dismissal_kind: Option<DismissalKind>,
    pub fielder: Option<String>,
    #[serde(skip)]
    pub meta: Option<Arc<MatchMeta>>,
}

impl Delivery {
    pub fn innings_key(&self) -> (i64, u8) {
        (self.match_id, self.inning)
    }

    pub fn season(&self) -> Option<&str> {
        self.meta.as_deref().and_then(|m| m.season.as_deref())
    }

    pub fn venue(&self) -> Option<&str> {
        self.meta.as_deref().and_then(|m| m.venue.as_deref())
    }

    pub fn match_date(&self) -> Option<&str> {
        self.meta.as_deref().and_then(|m| m.date.as_deref())
    }
}

/// Over-numbering convention of a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverNumbering {
    #[default]
    ZeroBased,
    OneBased,
}

impl OverNumbering {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "0" | "zero" | "zero_based" | "zero-based" => Some(OverNumbering::ZeroBased),
            "1" | "one" | "one_based" | "one-based" => Some(OverNumbering::OneBased),
            _ => None,
        }
    }

    /// Map a source over number onto the canonical zero-based numbering.
    pub fn normalize(self, raw_over: i64) -> u32 {
        let shifted = match self {
            OverNumbering::ZeroBased => raw_over,
            OverNumbering::OneBased => raw_over - 1,
        };
        u32::try_from(shifted.max(0)).unwrap_or(u32::MAX)
    }

    /// Inverse of [`OverNumbering::normalize`], used when writing.
    pub fn to_source(self, over: u32) -> i64 {
        match self {
            OverNumbering::ZeroBased => over as i64,
            OverNumbering::OneBased => over as i64 + 1,
        }
    }
}
