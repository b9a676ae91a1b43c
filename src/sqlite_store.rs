use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::types::Value;
use rusqlite::{Connection, params, params_from_iter};

use crate::delivery::{Delivery, DismissalKind, ExtrasKind, MatchMeta, OverNumbering};
use crate::event_store::{
    ChaseOutcome, ChaseWindow, DeliveryFilter, EventStore, PlayerScope, chase_outcomes_from_innings,
};

const DELIVERY_COLUMNS: &str = r#"
    d.match_id, d.inning, d.batting_team, d.bowling_team, d.over, d.ball,
    d.batter, d.bowler, d.non_striker, d.batsman_runs, d.extra_runs, d.total_runs,
    d.extras_type, d.is_wicket, d.player_dismissed, d.dismissal_kind, d.fielder,
    m.id, m.season, m.venue, m.city, m.date, m.match_type, m.winner,
    m.target_runs, m.target_overs
"#;

pub struct SqliteEventStore {
    conn: Connection,
    numbering: OverNumbering,
}

impl SqliteEventStore {
    pub fn open(path: &Path, numbering: OverNumbering) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        tracing::debug!(path = %path.display(), ?numbering, "event store opened");
        Ok(Self { conn, numbering })
    }

    pub fn open_in_memory(numbering: OverNumbering) -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self { conn, numbering })
    }

    pub fn numbering(&self) -> OverNumbering {
        self.numbering
    }

    pub fn upsert_match(&self, meta: &MatchMeta) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO matches (
                    id, season, city, date, match_type, venue, winner, target_runs, target_overs
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ON CONFLICT(id) DO UPDATE SET
                    season = excluded.season,
                    city = excluded.city,
                    date = excluded.date,
                    match_type = excluded.match_type,
                    venue = excluded.venue,
                    winner = excluded.winner,
                    target_runs = excluded.target_runs,
                    target_overs = excluded.target_overs
                "#,
                params![
                    meta.match_id,
                    meta.season,
                    meta.city,
                    meta.date,
                    meta.match_type,
                    meta.venue,
                    meta.winner,
                    meta.target_runs,
                    meta.target_overs,
                ],
            )
            .context("upsert match")?;
        Ok(())
    }

    /// Append deliveries in one transaction, writing overs in the store's
    /// own numbering convention.
    pub fn insert_deliveries(&mut self, deliveries: &[Delivery]) -> Result<usize> {
        let numbering = self.numbering;
        let tx = self.conn.transaction().context("begin delivery insert")?;
        {
            let mut stmt = tx
                .prepare(
                    r#"
                    INSERT INTO deliveries (
                        match_id, inning, batting_team, bowling_team, over, ball,
                        batter, bowler, non_striker, batsman_runs, extra_runs, total_runs,
                        extras_type, is_wicket, player_dismissed, dismissal_kind, fielder
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
                    "#,
                )
                .context("prepare delivery insert")?;
            for d in deliveries {
                stmt.execute(params![
                    d.match_id,
                    d.inning,
                    d.batting_team,
                    d.bowling_team,
                    numbering.to_source(d.over),
                    d.ball,
                    d.striker,
                    d.bowler,
                    d.non_striker,
                    d.batter_runs,
                    d.extra_runs,
                    d.total_runs,
                    d.extras.as_source_str(),
                    d.is_wicket as i64,
                    d.player_dismissed,
                    d.dismissal_kind.map(|k| k.as_source_str()),
                    d.fielder,
                ])
                .context("insert delivery")?;
            }
        }
        tx.commit().context("commit delivery insert")?;
        Ok(deliveries.len())
    }

    fn query_deliveries(&self, sql: &str, args: &[Value]) -> Result<Vec<Delivery>> {
        let mut stmt = self.conn.prepare(sql).context("prepare delivery query")?;
        let mut rows = stmt
            .query(params_from_iter(args.iter()))
            .context("query deliveries")?;

        let mut metas: HashMap<i64, Arc<MatchMeta>> = HashMap::new();
        let mut out = Vec::new();
        while let Some(row) = rows.next().context("read delivery row")? {
            let cell = |idx: usize| row.get::<_, Value>(idx);
            let match_id = value_i64(&cell(0)?).context("delivery without match_id")?;

            let meta = match value_i64(&cell(17)?) {
                Some(id) => Some(
                    metas
                        .entry(id)
                        .or_insert_with(|| {
                            Arc::new(MatchMeta {
                                match_id: id,
                                season: cell(18).ok().and_then(|v| value_string(&v)),
                                venue: cell(19).ok().and_then(|v| value_string(&v)),
                                city: cell(20).ok().and_then(|v| value_string(&v)),
                                date: cell(21).ok().and_then(|v| value_string(&v)),
                                match_type: cell(22).ok().and_then(|v| value_string(&v)),
                                winner: cell(23).ok().and_then(|v| value_string(&v)),
                                target_runs: cell(24)
                                    .ok()
                                    .and_then(|v| value_i64(&v))
                                    .and_then(|n| u32::try_from(n).ok()),
                                target_overs: cell(25).ok().and_then(|v| value_f64(&v)),
                            })
                        })
                        .clone(),
                ),
                None => None,
            };

            let runs = |idx: usize| -> Result<u32> {
                Ok(value_i64(&cell(idx)?)
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(0))
            };

            out.push(Delivery {
                match_id,
                inning: value_i64(&cell(1)?)
                    .and_then(|n| u8::try_from(n).ok())
                    .unwrap_or(1),
                batting_team: value_string(&cell(2)?).unwrap_or_default(),
                bowling_team: value_string(&cell(3)?).unwrap_or_default(),
                over: self.numbering.normalize(value_i64(&cell(4)?).unwrap_or(0)),
                ball: runs(5)?,
                striker: value_string(&cell(6)?).unwrap_or_default(),
                bowler: value_string(&cell(7)?).unwrap_or_default(),
                non_striker: value_string(&cell(8)?).unwrap_or_default(),
                batter_runs: runs(9)?,
                extra_runs: runs(10)?,
                total_runs: runs(11)?,
                extras: ExtrasKind::parse(value_string(&cell(12)?).as_deref()),
                is_wicket: value_i64(&cell(13)?).unwrap_or(0) != 0,
                player_dismissed: value_string(&cell(14)?),
                dismissal_kind: DismissalKind::parse(value_string(&cell(15)?).as_deref()),
                fielder: value_string(&cell(16)?),
                meta,
            });
        }
        Ok(out)
    }
}

impl EventStore for SqliteEventStore {
    fn fetch_deliveries(
        &self,
        scope: &PlayerScope,
        filter: &DeliveryFilter,
    ) -> Result<Vec<Delivery>> {
        let mut sql = format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries d LEFT JOIN matches m ON d.match_id = m.id WHERE "
        );
        let mut args: Vec<Value> = Vec::new();
        match scope {
            PlayerScope::Batter(p) => {
                sql.push_str("d.batter = ?");
                args.push(Value::Text(p.clone()));
            }
            PlayerScope::Bowler(p) => {
                sql.push_str("d.bowler = ?");
                args.push(Value::Text(p.clone()));
            }
            PlayerScope::Matchup { batter, bowler } => {
                sql.push_str("d.batter = ? AND d.bowler = ?");
                args.push(Value::Text(batter.clone()));
                args.push(Value::Text(bowler.clone()));
            }
            PlayerScope::OnField(p) => {
                sql.push_str("(d.batter = ? OR d.non_striker = ?)");
                args.push(Value::Text(p.clone()));
                args.push(Value::Text(p.clone()));
            }
        }
        for (column, value) in [
            ("m.season", &filter.season),
            ("m.venue", &filter.venue),
            ("m.match_type", &filter.match_type),
        ] {
            if let Some(value) = value {
                sql.push_str(&format!(" AND CAST({column} AS TEXT) = ?"));
                args.push(Value::Text(value.clone()));
            }
        }
        sql.push_str(" ORDER BY d.match_id, d.inning, d.over, d.ball, d.id");

        let mut deliveries = self.query_deliveries(&sql, &args)?;
        // Phase is judged on normalized overs, so it cannot go into the SQL.
        if filter.phase.is_some() {
            deliveries.retain(|d| filter.matches_phase(d));
        }
        tracing::debug!(?scope, count = deliveries.len(), "deliveries fetched");
        Ok(deliveries)
    }

    fn fetch_chase_outcomes(&self, window: &ChaseWindow) -> Result<Vec<ChaseOutcome>> {
        let sql = format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries d JOIN matches m ON d.match_id = m.id \
             WHERE d.inning = 2 AND m.target_runs IS NOT NULL AND m.target_runs >= ? \
             ORDER BY d.match_id, d.over, d.ball, d.id"
        );
        let min_target = *window.runs_needed.start();
        let deliveries = self.query_deliveries(&sql, &[Value::Integer(min_target)])?;
        let outcomes = chase_outcomes_from_innings(&deliveries, window);
        tracing::debug!(
            scanned = deliveries.len(),
            matched = outcomes.len(),
            "historical chases replayed"
        );
        Ok(outcomes)
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS matches (
            id INTEGER PRIMARY KEY,
            season TEXT,
            city TEXT,
            date TEXT,
            match_type TEXT,
            player_of_match TEXT,
            venue TEXT,
            team1 TEXT,
            team2 TEXT,
            toss_winner TEXT,
            toss_decision TEXT,
            winner TEXT,
            result TEXT,
            result_margin INTEGER,
            target_runs INTEGER,
            target_overs REAL,
            super_over TEXT,
            method TEXT,
            umpire1 TEXT,
            umpire2 TEXT
        );

        CREATE TABLE IF NOT EXISTS deliveries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            match_id INTEGER,
            inning INTEGER,
            batting_team TEXT,
            bowling_team TEXT,
            over INTEGER,
            ball INTEGER,
            batter TEXT,
            bowler TEXT,
            non_striker TEXT,
            batsman_runs INTEGER,
            extra_runs INTEGER,
            total_runs INTEGER,
            extras_type TEXT,
            is_wicket INTEGER,
            player_dismissed TEXT,
            dismissal_kind TEXT,
            fielder TEXT,
            FOREIGN KEY (match_id) REFERENCES matches (id)
        );

        CREATE INDEX IF NOT EXISTS idx_deliveries_match_id ON deliveries(match_id);
        CREATE INDEX IF NOT EXISTS idx_deliveries_batter_bowler ON deliveries(batter, bowler);
        CREATE INDEX IF NOT EXISTS idx_deliveries_non_striker ON deliveries(non_striker);
        CREATE INDEX IF NOT EXISTS idx_deliveries_bowler ON deliveries(bowler);
        CREATE INDEX IF NOT EXISTS idx_matches_season ON matches(season);
        CREATE INDEX IF NOT EXISTS idx_matches_venue ON matches(venue);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}

// CSV-loaded tables store blanks as '' and numbers sometimes as text.

fn value_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Integer(n) => Some(*n),
        Value::Real(f) if f.is_finite() => Some(*f as i64),
        Value::Text(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64))
        }
        _ => None,
    }
}

fn value_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Integer(n) => Some(*n as f64),
        Value::Real(f) => Some(*f),
        Value::Text(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

fn value_string(v: &Value) -> Option<String> {
    let s = match v {
        Value::Text(s) => s.trim().to_string(),
        Value::Integer(n) => n.to_string(),
        Value::Real(f) => f.to_string(),
        _ => return None,
    };
    if s.is_empty() || s.eq_ignore_ascii_case("na") || s.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(s)
    }
}
