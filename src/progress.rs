//! Progress store
//!
//! Append-only log of tutoring sessions in a single SQLite file. Every
//! operation opens its own connection and writes one logical row.

use crate::error::{TutorError, TutorResult};
use crate::model::{Difficulty, Feedback, InteractionId, LessonKind, Role, SessionId};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const METRIC_INTERACTIONS: &str = "interaction_count";
pub const METRIC_USER_TURNS: &str = "user_turns";
pub const METRIC_GRAMMAR: &str = "average_grammar_score";
pub const METRIC_CONFIDENCE: &str = "average_confidence";

/// A tutoring session row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub language: String,
    pub difficulty: Difficulty,
    pub lesson_type: LessonKind,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_secs: Option<i64>,
    pub score: Option<i64>,
}

impl Session {
    pub fn is_closed(&self) -> bool {
        self.end_time.is_some()
    }
}

/// One turn of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub session_id: SessionId,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub metrics: Option<Feedback>,
}

/// A named measurement; newer rows with the same name supersede older ones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressMetric {
    pub session_id: SessionId,
    pub metric_name: String,
    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Closed sessions grouped by language, lesson type and difficulty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionGroup {
    pub language: String,
    pub lesson_type: String,
    pub difficulty: String,
    pub session_count: i64,
    pub average_score: f64,
    pub time_spent_secs: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub groups: Vec<SessionGroup>,
    pub total_sessions: i64,
    pub total_time_secs: i64,
    pub average_score: f64,
}

/// Handle on the progress database file
#[derive(Debug, Clone)]
pub struct ProgressStore {
    db_path: PathBuf,
}

impl ProgressStore {
    /// Open (creating if needed) the store at `db_path`
    pub fn open(db_path: impl Into<PathBuf>) -> TutorResult<Self> {
        let store = Self {
            db_path: db_path.into(),
        };
        store.init_db()?;
        info!("📒 Progress store at {}", store.db_path.display());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> TutorResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(conn)
    }

    fn init_db(&self) -> TutorResult<()> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| TutorError::Storage(format!("cannot create {}: {e}", parent.display())))?;
        }
        let conn = self.connect()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                language TEXT NOT NULL,
                difficulty TEXT NOT NULL,
                lesson_type TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                duration_secs INTEGER,
                score INTEGER
            );
            CREATE TABLE IF NOT EXISTS interactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL REFERENCES sessions (id),
                role TEXT NOT NULL,
                text TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                metrics TEXT
            );
            CREATE TABLE IF NOT EXISTS progress_metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL REFERENCES sessions (id),
                metric_name TEXT NOT NULL,
                value REAL NOT NULL,
                recorded_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_interactions_session ON interactions (session_id);
            CREATE INDEX IF NOT EXISTS idx_metrics_session ON progress_metrics (session_id, metric_name);",
        )?;
        Ok(())
    }

    /// Start a new session and return its id
    pub fn create_session(
        &self,
        language: &str,
        difficulty: Difficulty,
        lesson_type: LessonKind,
    ) -> TutorResult<SessionId> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO sessions (language, difficulty, lesson_type, start_time)
             VALUES (?1, ?2, ?3, ?4)",
            params![language, difficulty.as_str(), lesson_type.label(), now_string()],
        )?;
        let id = conn.last_insert_rowid();
        debug!("Created session {} ({} / {} / {})", id, language, difficulty, lesson_type);
        Ok(id)
    }

    /// Append one turn to a session. Unknown sessions are rejected.
    pub fn log_interaction(
        &self,
        session_id: SessionId,
        role: Role,
        text: &str,
        metrics: Option<&Feedback>,
    ) -> TutorResult<InteractionId> {
        let conn = self.connect()?;
        if !session_exists(&conn, session_id)? {
            return Err(TutorError::Storage(format!(
                "cannot log interaction for unknown session {session_id}"
            )));
        }
        let metrics_json = metrics.map(serde_json::to_string).transpose()?;
        conn.execute(
            "INSERT INTO interactions (session_id, role, text, timestamp, metrics)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![session_id, role.as_str(), text, now_string(), metrics_json],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Close a session without a score
    pub fn close_session(&self, session_id: SessionId) -> TutorResult<()> {
        self.close_session_with_score(session_id, None)
    }

    /// Close a session. Closing an already closed session changes nothing.
    pub fn close_session_with_score(
        &self,
        session_id: SessionId,
        score: Option<i64>,
    ) -> TutorResult<()> {
        let conn = self.connect()?;
        let row: Option<(String, Option<String>)> = conn
            .query_row(
                "SELECT start_time, end_time FROM sessions WHERE id = ?1",
                [session_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (start_raw, end_raw) = row.ok_or_else(|| {
            TutorError::Storage(format!("cannot close unknown session {session_id}"))
        })?;
        if end_raw.is_some() {
            debug!("Session {} already closed", session_id);
            return Ok(());
        }

        let start = parse_time(&start_raw)?;
        let end = Utc::now().max(start);
        let duration = (end - start).num_seconds();
        conn.execute(
            "UPDATE sessions SET end_time = ?1, duration_secs = ?2, score = ?3
             WHERE id = ?4 AND end_time IS NULL",
            params![format_time(&end), duration, score, session_id],
        )?;
        drop(conn);

        self.aggregate_metrics(session_id)?;
        info!("✅ Session {} closed after {}s", session_id, duration);
        Ok(())
    }

    /// Append a metric row
    pub fn record_metric(&self, session_id: SessionId, name: &str, value: f64) -> TutorResult<()> {
        let conn = self.connect()?;
        if !session_exists(&conn, session_id)? {
            return Err(TutorError::Storage(format!(
                "cannot record metric for unknown session {session_id}"
            )));
        }
        conn.execute(
            "INSERT INTO progress_metrics (session_id, metric_name, value, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![session_id, name, value, now_string()],
        )?;
        Ok(())
    }

    /// Newest value of every metric recorded for the session
    pub fn get_progress(&self, session_id: SessionId) -> TutorResult<Vec<ProgressMetric>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT m.session_id, m.metric_name, m.value, m.recorded_at
             FROM progress_metrics m
             WHERE m.session_id = ?1
               AND m.id = (
                   SELECT latest.id FROM progress_metrics latest
                   WHERE latest.session_id = m.session_id
                     AND latest.metric_name = m.metric_name
                   ORDER BY latest.recorded_at DESC, latest.id DESC
                   LIMIT 1
               )
             ORDER BY m.metric_name",
        )?;
        let rows = stmt.query_map([session_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut metrics = Vec::new();
        for row in rows {
            let (session_id, metric_name, value, recorded_at) = row?;
            metrics.push(ProgressMetric {
                session_id,
                metric_name,
                value,
                recorded_at: parse_time(&recorded_at)?,
            });
        }
        Ok(metrics)
    }

    /// Derive summary metrics from a session's interactions and append them
    pub fn aggregate_metrics(&self, session_id: SessionId) -> TutorResult<Vec<ProgressMetric>> {
        let interactions = self.interactions(session_id)?;
        let user_turns: Vec<&Interaction> = interactions
            .iter()
            .filter(|i| i.role == Role::User)
            .collect();

        let mut derived = vec![
            (METRIC_INTERACTIONS, interactions.len() as f64),
            (METRIC_USER_TURNS, user_turns.len() as f64),
        ];
        let grammar: Vec<f64> = user_turns
            .iter()
            .filter_map(|i| i.metrics.as_ref().and_then(|m| m.grammar_score))
            .collect();
        if let Some(avg) = average(&grammar) {
            derived.push((METRIC_GRAMMAR, avg));
        }
        let confidence: Vec<f64> = user_turns
            .iter()
            .filter_map(|i| i.metrics.as_ref().and_then(|m| m.confidence))
            .collect();
        if let Some(avg) = average(&confidence) {
            derived.push((METRIC_CONFIDENCE, avg));
        }

        for (name, value) in &derived {
            self.record_metric(session_id, name, *value)?;
        }
        self.get_progress(session_id)
    }

    pub fn session(&self, session_id: SessionId) -> TutorResult<Option<Session>> {
        let conn = self.connect()?;
        let row = conn
            .query_row(
                "SELECT id, language, difficulty, lesson_type, start_time, end_time, duration_secs, score
                 FROM sessions WHERE id = ?1",
                [session_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Option<String>>(5)?,
                        row.get::<_, Option<i64>>(6)?,
                        row.get::<_, Option<i64>>(7)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, language, difficulty, lesson_type, start, end, duration_secs, score)) = row
        else {
            return Ok(None);
        };
        Ok(Some(Session {
            id,
            language,
            difficulty: difficulty
                .parse()
                .map_err(|_| TutorError::Storage(format!("bad difficulty '{difficulty}' in session {id}")))?,
            lesson_type: lesson_type
                .parse()
                .map_err(|_| TutorError::Storage(format!("bad lesson type '{lesson_type}' in session {id}")))?,
            start_time: parse_time(&start)?,
            end_time: end.as_deref().map(parse_time).transpose()?,
            duration_secs,
            score,
        }))
    }

    /// Every persisted turn of a session, oldest first
    pub fn interactions(&self, session_id: SessionId) -> TutorResult<Vec<Interaction>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, text, timestamp, metrics
             FROM interactions WHERE session_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([session_id], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut interactions = Vec::new();
        for row in rows {
            let (id, session_id, role, text, timestamp, metrics) = row?;
            interactions.push(Interaction {
                id,
                session_id,
                role: role.parse()?,
                text,
                timestamp: parse_time(&timestamp)?,
                metrics: metrics
                    .as_deref()
                    .map(serde_json::from_str::<Feedback>)
                    .transpose()?,
            });
        }
        Ok(interactions)
    }

    /// Totals over closed sessions, optionally for one language
    pub fn summary(&self, language: Option<&str>) -> TutorResult<ProgressSummary> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT language, lesson_type, difficulty, AVG(score), COUNT(*), SUM(duration_secs)
             FROM sessions
             WHERE end_time IS NOT NULL AND (?1 IS NULL OR language = ?1)
             GROUP BY language, lesson_type, difficulty
             ORDER BY language, lesson_type, difficulty",
        )?;
        let rows = stmt.query_map([language], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<f64>>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, Option<i64>>(5)?,
            ))
        })?;

        let mut summary = ProgressSummary::default();
        let mut weighted_score = 0.0;
        for row in rows {
            let (language, lesson_type, difficulty, avg_score, count, time) = row?;
            let avg_score = avg_score.unwrap_or(0.0);
            let time = time.unwrap_or(0);
            summary.total_sessions += count;
            summary.total_time_secs += time;
            weighted_score += avg_score * count as f64;
            summary.groups.push(SessionGroup {
                language,
                lesson_type,
                difficulty,
                session_count: count,
                average_score: avg_score,
                time_spent_secs: time,
            });
        }
        if summary.total_sessions > 0 {
            summary.average_score = weighted_score / summary.total_sessions as f64;
        }
        Ok(summary)
    }
}

fn session_exists(conn: &Connection, session_id: SessionId) -> TutorResult<bool> {
    let mut stmt = conn.prepare("SELECT 1 FROM sessions WHERE id = ?1 LIMIT 1")?;
    Ok(stmt.exists([session_id])?)
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn now_string() -> String {
    format_time(&Utc::now())
}

fn parse_time(raw: &str) -> TutorResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| TutorError::Storage(format!("bad timestamp '{raw}': {e}")))
}
