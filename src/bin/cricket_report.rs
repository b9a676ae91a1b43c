use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;

use cricket_analytics::aggregate::PlayerRole;
use cricket_analytics::config::Settings;
use cricket_analytics::event_store::DeliveryFilter;
use cricket_analytics::form::compute_recent_form;
use cricket_analytics::head_to_head::{compute_head_to_head, compute_player_stats};
use cricket_analytics::partnership::compute_partnerships;
use cricket_analytics::phase::{Phase, compute_phase_analysis};
use cricket_analytics::report::{build_player_reports, fetch_player_deliveries};
use cricket_analytics::sqlite_store::SqliteEventStore;
use cricket_analytics::telemetry::init_tracing;
use cricket_analytics::win_prob::estimate_win_probability;
use cricket_analytics::Analysis;

const USAGE: &str = "usage: cricket_report <batting|bowling|partnerships|form-batting|form-bowling|phases|head-to-head|win-prob|batch> [--db PATH] [--player NAME] [--players A,B] [--bowler NAME] [--season S] [--venue V] [--match-type T] [--phase P] [--matches N] [--score N --target N --overs F --wickets N]";

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing()?;

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let Some(mode) = args.first().filter(|a| !a.starts_with("--")).cloned() else {
        bail!("{USAGE}");
    };

    let settings = Settings::from_env();
    let db_path = arg_value(&args, "--db")
        .map(PathBuf::from)
        .or_else(|| settings.database_path.clone())
        .context("unable to resolve sqlite path")?;
    let store = SqliteEventStore::open(&db_path, settings.over_numbering)?;
    let filters = parse_filters(&args)?;
    let engine = &settings.engine;

    match mode.as_str() {
        "batting" | "bowling" => {
            let role: PlayerRole = mode.parse()?;
            let player = required(&args, "--player")?;
            emit(compute_player_stats(&store, &player, role, &filters)?, &player)
        }
        "partnerships" => {
            let player = required(&args, "--player")?;
            emit(
                compute_partnerships(&store, &player, &filters, &engine.partnership)?,
                &player,
            )
        }
        "form-batting" | "form-bowling" => {
            let role = if mode == "form-batting" {
                PlayerRole::Batter
            } else {
                PlayerRole::Bowler
            };
            let player = required(&args, "--player")?;
            let last_n = match arg_value(&args, "--matches") {
                Some(raw) => raw
                    .parse::<usize>()
                    .with_context(|| format!("invalid --matches value `{raw}`"))?,
                None => engine.form_window,
            };
            emit(
                compute_recent_form(&store, &player, role, last_n, &filters)?,
                &player,
            )
        }
        "phases" => {
            let batter = required(&args, "--player")?;
            let bowler = required(&args, "--bowler")?;
            emit(
                compute_phase_analysis(&store, &batter, &bowler, &filters)?,
                &format!("{batter} vs {bowler}"),
            )
        }
        "head-to-head" => {
            let batter = required(&args, "--player")?;
            let bowler = required(&args, "--bowler")?;
            emit(
                compute_head_to_head(&store, &batter, &bowler, &filters)?,
                &format!("{batter} vs {bowler}"),
            )
        }
        "win-prob" => {
            let score = parse_required::<i64>(&args, "--score")?;
            let target = parse_required::<i64>(&args, "--target")?;
            let overs = parse_required::<f64>(&args, "--overs")?;
            let wickets = parse_required::<i64>(&args, "--wickets")?;
            let result =
                estimate_win_probability(&store, score, target, overs, wickets, &engine.win_prob)?;
            print_json(&result)
        }
        "batch" => {
            let players = required(&args, "--players")?
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>();
            if players.is_empty() {
                bail!("--players needs at least one name");
            }
            let batch = players
                .iter()
                .map(|p| fetch_player_deliveries(&store, p, &filters))
                .collect::<Result<Vec<_>, _>>()?;
            print_json(&build_player_reports(&batch, engine))
        }
        other => Err(anyhow!("unknown mode `{other}`\n{USAGE}")),
    }
}

fn emit<T: Serialize>(analysis: Analysis<T>, subject: &str) -> Result<()> {
    match analysis {
        Analysis::Data(data) => print_json(&data),
        Analysis::Empty => Err(anyhow!("no deliveries found for {subject}")),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize report")?;
    println!("{text}");
    Ok(())
}

fn parse_filters(args: &[String]) -> Result<DeliveryFilter> {
    let phase = match arg_value(args, "--phase") {
        Some(raw) => Some(raw.parse::<Phase>()?),
        None => None,
    };
    Ok(DeliveryFilter {
        season: arg_value(args, "--season"),
        venue: arg_value(args, "--venue"),
        match_type: arg_value(args, "--match-type"),
        phase,
    })
}

fn required(args: &[String], flag: &str) -> Result<String> {
    arg_value(args, flag).with_context(|| format!("missing {flag}\n{USAGE}"))
}

fn parse_required<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<T> {
    let raw = required(args, flag)?;
    raw.parse::<T>()
        .map_err(|_| anyhow!("invalid {flag} value `{raw}`"))
}

/// `--flag value` or `--flag=value`; blank values count as absent.
fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() && !next.starts_with("--") {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
