//! SQLite-based habit storage.
//!
//! Every write runs inside `BEGIN IMMEDIATE`, so the revision check and the
//! write it guards are atomic even when several processes share the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use super::data_dir;
use super::migrations;
use super::store::HabitStore;
use super::Config;
use crate::error::{CoreError, DatabaseError, Result};
use crate::habit::Habit;
use crate::streak::{parse_history_entries, BadgeSet};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const HABIT_COLUMNS: &str = "id, title, description, created_at, history, last_completed,
     streak, best_streak, badges, revision";

/// Parse an RFC 3339 column, reporting failures as a conversion error on `idx`.
fn parse_datetime_column(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Decode a JSON string array, treating corrupt data as empty.
fn parse_json_list(column: &str, habit_id: &str, value: &str) -> Vec<String> {
    serde_json::from_str(value).unwrap_or_else(|e| {
        tracing::warn!(habit = habit_id, column, error = %e, "discarding corrupt column");
        Vec::new()
    })
}

fn format_history(history: &[DateTime<Utc>]) -> Result<String> {
    let raw: Vec<String> = history.iter().map(|t| t.to_rfc3339()).collect();
    Ok(serde_json::to_string(&raw)?)
}

/// Build a Habit from a row selected with `HABIT_COLUMNS`.
fn row_to_habit(row: &rusqlite::Row) -> rusqlite::Result<Habit> {
    let id: String = row.get(0)?;

    let created_at_str: String = row.get(3)?;
    let created_at = parse_datetime_column(3, &created_at_str)?;

    let history_raw = parse_json_list("history", &id, &row.get::<_, String>(4)?);
    let history = parse_history_entries(&history_raw);

    let last_completed = row
        .get::<_, Option<String>>(5)?
        .and_then(|s| match DateTime::parse_from_rfc3339(&s) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(e) => {
                tracing::warn!(habit = %id, error = %e, "ignoring corrupt last_completed");
                None
            }
        });

    let badge_ids = parse_json_list("badges", &id, &row.get::<_, String>(8)?);

    Ok(Habit {
        title: row.get(1)?,
        description: row.get(2)?,
        created_at,
        history,
        last_completed,
        streak: row.get(6)?,
        best_streak: row.get(7)?,
        badges: BadgeSet::from_ids_lossy(&badge_ids),
        revision: row.get(9)?,
        id,
    })
}

/// SQLite database for habits.
pub struct HabitDb {
    conn: Connection,
}

impl HabitDb {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database named by `config.storage.db_file` in the data directory.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(config: &Config) -> Result<Self> {
        let path = data_dir()?.join(&config.storage.db_file);
        Self::open_at(path)
    }

    /// Open (or create) the database at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(path),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        tracing::debug!(path = %path.display(), "opened habit database");
        Self::init(conn)
    }

    /// Open an in-memory database.
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Run `f` inside an immediate transaction, rolling back on error.
    fn immediate<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        match f(&self.conn) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT;")?;
                Ok(value)
            }
            Err(err) => {
                if let Err(e) = self.conn.execute_batch("ROLLBACK;") {
                    tracing::warn!(error = %e, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

impl HabitStore for HabitDb {
    fn insert(&self, habit: &Habit) -> Result<()> {
        let history = format_history(&habit.history)?;
        let badges = serde_json::to_string(&habit.badges)?;
        self.immediate(|conn| {
            conn.execute(
                "INSERT INTO habits (id, title, description, created_at, history, last_completed,
                                     streak, best_streak, badges, revision)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    habit.id,
                    habit.title,
                    habit.description,
                    habit.created_at.to_rfc3339(),
                    history,
                    habit.last_completed.map(|t| t.to_rfc3339()),
                    habit.streak,
                    habit.best_streak,
                    badges,
                    habit.revision,
                ],
            )?;
            Ok(())
        })?;
        tracing::info!(habit = %habit.id, title = %habit.title, "habit created");
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<Habit>> {
        let sql = format!("SELECT {HABIT_COLUMNS} FROM habits WHERE id = ?1");
        let habit = self
            .conn
            .query_row(&sql, params![id], row_to_habit)
            .optional()?;
        Ok(habit)
    }

    fn list(&self) -> Result<Vec<Habit>> {
        let sql = format!("SELECT {HABIT_COLUMNS} FROM habits ORDER BY created_at DESC, id");
        let mut stmt = self.conn.prepare(&sql)?;
        let habits = stmt
            .query_map([], row_to_habit)?
            .collect::<rusqlite::Result<Vec<Habit>>>()?;
        Ok(habits)
    }

    fn update(&self, habit: &Habit) -> Result<Habit> {
        let history = format_history(&habit.history)?;
        let badges = serde_json::to_string(&habit.badges)?;
        let next_revision = habit.revision + 1;

        self.immediate(|conn| {
            let stored: Option<u64> = conn
                .query_row(
                    "SELECT revision FROM habits WHERE id = ?1",
                    params![habit.id],
                    |row| row.get(0),
                )
                .optional()?;

            match stored {
                None => return Err(CoreError::not_found(&habit.id)),
                Some(rev) if rev != habit.revision => {
                    return Err(CoreError::Conflict {
                        id: habit.id.clone(),
                        expected: habit.revision,
                    })
                }
                Some(_) => {}
            }

            conn.execute(
                "UPDATE habits
                 SET title = ?1, description = ?2, history = ?3, last_completed = ?4,
                     streak = ?5, best_streak = ?6, badges = ?7, revision = ?8
                 WHERE id = ?9 AND revision = ?10",
                params![
                    habit.title,
                    habit.description,
                    history,
                    habit.last_completed.map(|t| t.to_rfc3339()),
                    habit.streak,
                    habit.best_streak,
                    badges,
                    next_revision,
                    habit.id,
                    habit.revision,
                ],
            )?;
            Ok(())
        })?;

        tracing::info!(
            habit = %habit.id,
            revision = next_revision,
            streak = habit.streak,
            best_streak = habit.best_streak,
            "habit updated"
        );

        Ok(Habit {
            revision: next_revision,
            ..habit.clone()
        })
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let deleted = self.immediate(|conn| {
            Ok(conn.execute("DELETE FROM habits WHERE id = ?1", params![id])?)
        })?;
        if deleted > 0 {
            tracing::info!(habit = id, "habit deleted");
        }
        Ok(deleted > 0)
    }
}
