//! Habit model and the completion / reset handlers.
//!
//! A [`Habit`] carries its raw completion history plus cached derived values
//! (streak, best streak, badges). Every path that touches the derived values
//! goes through [`StreakSnapshot::derive`], so write-time (`complete`) and
//! read-time (`refresh`) derivation cannot drift apart.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::streak::{
    compute_badges, longest_run, next_badge, normalize_history, Badge, BadgeSet, CalendarDay,
    StreakSnapshot,
};

/// A tracked habit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Completion instants, in insertion order.
    #[serde(default)]
    pub history: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub last_completed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub best_streak: u32,
    #[serde(default)]
    pub badges: BadgeSet,
    /// Write counter maintained by the store.
    #[serde(default)]
    pub revision: u64,
}

/// Outcome of a completion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    /// A new history entry was appended.
    Recorded,
    /// The day already had a completion; history is unchanged.
    AlreadyCompleted,
}

impl Habit {
    /// Create a habit with an empty history.
    ///
    /// # Errors
    /// Returns an error if the title is blank.
    pub fn new(
        title: &str,
        description: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyField {
                field: "title".into(),
            });
        }
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            description,
            created_at,
            history: Vec::new(),
            last_completed: None,
            streak: 0,
            best_streak: 0,
            badges: BadgeSet::new(),
            revision: 0,
        })
    }

    pub fn last_completed_date(&self) -> Option<CalendarDay> {
        self.last_completed.as_ref().map(CalendarDay::of)
    }

    /// Whether any history entry falls on `day`.
    pub fn completed_on(&self, day: CalendarDay) -> bool {
        self.history.iter().any(|t| CalendarDay::of(t) == day)
    }

    /// Distinct completion days, most recent first.
    pub fn completion_days(&self) -> Vec<CalendarDay> {
        normalize_history(&self.history)
    }

    /// Record a completion at `at` and recompute the derived values.
    ///
    /// A second completion on the same calendar day does not add a history
    /// entry; it only re-derives streak and badges.
    ///
    /// Derived values are evaluated at the latest completion in the history,
    /// so a back-dated `at` fills a gap without rolling the streak back.
    pub fn complete(&mut self, at: DateTime<Utc>) -> Completion {
        let day = CalendarDay::of(&at);
        let outcome = if self.completed_on(day) {
            Completion::AlreadyCompleted
        } else {
            self.history.push(at);
            self.last_completed = Some(match self.last_completed {
                Some(previous) => previous.max(at),
                None => at,
            });
            Completion::Recorded
        };

        let evaluated_at = self.history.iter().fold(at, |latest, t| latest.max(*t));
        self.refresh(evaluated_at);
        tracing::debug!(
            habit = %self.id,
            ?outcome,
            streak = self.streak,
            best_streak = self.best_streak,
            "completion handled"
        );
        outcome
    }

    /// Clear history and every derived value.
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_completed = None;
        self.streak = 0;
        self.best_streak = 0;
        self.badges = BadgeSet::new();
    }

    /// Re-derive streak, best streak and badges as of `now`.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        let snapshot = StreakSnapshot::derive(&self.history, self.best_streak, &self.badges, now);
        self.apply(snapshot);
    }

    pub fn refreshed(mut self, now: DateTime<Utc>) -> Self {
        self.refresh(now);
        self
    }

    /// Re-derive everything from the full history, including runs that are
    /// no longer live. Repairs a habit whose cached values fell behind its
    /// history (e.g. after a manual edit of the store).
    pub fn rebuild(&mut self, now: DateTime<Utc>) {
        let historical = longest_run(&self.completion_days());
        self.best_streak = self.best_streak.max(historical);
        self.badges = compute_badges(historical, &self.badges);
        self.last_completed = self.history.iter().max().copied();
        self.refresh(now);
    }

    /// Next badge within reach of the current streak, with days remaining.
    pub fn next_badge(&self) -> Option<(Badge, u32)> {
        next_badge(self.streak)
    }

    fn apply(&mut self, snapshot: StreakSnapshot) {
        self.streak = snapshot.streak;
        self.best_streak = snapshot.best_streak;
        self.badges = snapshot.badges;
    }
}
