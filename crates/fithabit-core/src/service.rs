//! Habit service: the operations a client calls.
//!
//! Each mutating operation is a read-modify-write against the store. If a
//! concurrent writer bumps the revision in between, the service reloads
//! and re-applies the change, so every attempt derives from fresh state.

use chrono::{DateTime, Utc};

use crate::error::{CoreError, Result};
use crate::habit::{Completion, Habit};
use crate::storage::{Config, HabitStore};
use crate::summary::{summarize, Summary};

pub struct HabitService<S> {
    store: S,
    max_write_attempts: u32,
}

impl<S: HabitStore> HabitService<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, &Config::default())
    }

    pub fn with_config(store: S, config: &Config) -> Self {
        Self {
            store,
            max_write_attempts: config.service.max_write_attempts.max(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a habit with an empty history.
    ///
    /// # Errors
    /// `CoreError::Validation` if the title is blank.
    pub fn create(
        &self,
        title: &str,
        description: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Habit> {
        let habit = Habit::new(title, description, now)?;
        self.store.insert(&habit)?;
        Ok(habit)
    }

    /// Record a completion at `at`.
    pub fn complete(&self, id: &str, at: DateTime<Utc>) -> Result<(Habit, Completion)> {
        self.modify(id, |habit| habit.complete(at))
    }

    /// Clear history, streaks and badges.
    pub fn reset(&self, id: &str) -> Result<Habit> {
        self.modify(id, Habit::reset).map(|(habit, ())| habit)
    }

    /// Re-derive every cached value from the full history and persist it.
    pub fn rebuild(&self, id: &str, now: DateTime<Utc>) -> Result<Habit> {
        self.modify(id, |habit| habit.rebuild(now))
            .map(|(habit, ())| habit)
    }

    /// # Errors
    /// `CoreError::NotFound` if no habit has this id.
    pub fn delete(&self, id: &str) -> Result<()> {
        if self.store.delete(id)? {
            Ok(())
        } else {
            Err(CoreError::not_found(id))
        }
    }

    /// One habit with streak and badges derived as of `now`.
    pub fn get(&self, id: &str, now: DateTime<Utc>) -> Result<Habit> {
        self.load(id).map(|h| h.refreshed(now))
    }

    /// All habits, newest first, with streak and badges derived as of `now`.
    ///
    /// The derived values are not written back.
    pub fn list(&self, now: DateTime<Utc>) -> Result<Vec<Habit>> {
        Ok(self
            .store
            .list()?
            .into_iter()
            .map(|h| h.refreshed(now))
            .collect())
    }

    /// Summary over the persisted values of every habit.
    pub fn summary(&self, top_n: usize) -> Result<Summary> {
        Ok(summarize(&self.store.list()?, top_n))
    }

    fn load(&self, id: &str) -> Result<Habit> {
        self.store
            .get(id)?
            .ok_or_else(|| CoreError::not_found(id))
    }

    fn modify<T>(&self, id: &str, mut change: impl FnMut(&mut Habit) -> T) -> Result<(Habit, T)> {
        let mut attempt = 1;
        loop {
            let mut habit = self.load(id)?;
            let outcome = change(&mut habit);
            match self.store.update(&habit) {
                Ok(saved) => return Ok((saved, outcome)),
                Err(CoreError::Conflict { .. }) if attempt < self.max_write_attempts => {
                    tracing::warn!(habit = id, attempt, "concurrent update, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::HabitDb;
    use crate::streak::Badge;
    use chrono::{Duration, TimeZone};
    use std::cell::Cell;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 1, 6, 0, 0).unwrap()
    }

    fn service() -> HabitService<HabitDb> {
        HabitService::new(HabitDb::open_memory().unwrap())
    }

    #[test]
    fn create_rejects_blank_title() {
        let svc = service();
        let err = svc.create("", None, t0()).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(svc.list(t0()).unwrap().is_empty());
    }

    #[test]
    fn complete_twice_same_day() {
        let svc = service();
        let habit = svc.create("Meditate", None, t0()).unwrap();

        let (first, outcome) = svc.complete(&habit.id, t0()).unwrap();
        assert_eq!(outcome, Completion::Recorded);
        let (second, outcome) = svc.complete(&habit.id, t0() + Duration::hours(3)).unwrap();
        assert_eq!(outcome, Completion::AlreadyCompleted);

        assert_eq!(first.history.len(), second.history.len());
        assert_eq!(first.streak, second.streak);
        assert_eq!(second.revision, 2);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let svc = service();
        assert!(matches!(svc.complete("nope", t0()), Err(CoreError::NotFound { .. })));
        assert!(matches!(svc.reset("nope"), Err(CoreError::NotFound { .. })));
        assert!(matches!(svc.delete("nope"), Err(CoreError::NotFound { .. })));
        assert!(matches!(svc.get("nope", t0()), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn reset_persists_cleared_state() {
        let svc = service();
        let habit = svc.create("Meditate", None, t0()).unwrap();
        for d in 0..7 {
            svc.complete(&habit.id, t0() + Duration::days(d)).unwrap();
        }
        let reset = svc.reset(&habit.id).unwrap();
        assert_eq!(reset.best_streak, 0);

        let stored = svc.store().get(&habit.id).unwrap().unwrap();
        assert!(stored.history.is_empty());
        assert!(stored.badges.is_empty());
        assert_eq!(stored.streak, 0);
        assert_eq!(stored.best_streak, 0);
        assert!(stored.last_completed.is_none());
    }

    #[test]
    fn backfilled_completion_persists_current_streak() {
        let svc = service();
        let habit = svc.create("Meditate", None, t0()).unwrap();
        for d in [0, 1, 3, 4, 5, 6] {
            svc.complete(&habit.id, t0() + Duration::days(d)).unwrap();
        }
        svc.complete(&habit.id, t0() + Duration::days(2)).unwrap();

        let stored = svc.store().get(&habit.id).unwrap().unwrap();
        assert_eq!(stored.streak, 7);
        assert_eq!(stored.best_streak, 7);
        assert!(stored.badges.contains(Badge::Week));

        let read = svc.get(&habit.id, t0() + Duration::days(6)).unwrap();
        assert_eq!(read.streak, stored.streak);
        assert_eq!(read.badges, stored.badges);
    }

    #[test]
    fn list_derives_at_read_time_without_persisting() {
        let svc = service();
        let habit = svc.create("Meditate", None, t0()).unwrap();
        svc.complete(&habit.id, t0()).unwrap();

        let listed = svc.list(t0() + Duration::days(3)).unwrap();
        assert_eq!(listed[0].streak, 0);
        assert_eq!(listed[0].best_streak, 1);

        let stored = svc.store().get(&habit.id).unwrap().unwrap();
        assert_eq!(stored.streak, 1);
    }

    #[test]
    fn rebuild_restores_badges_from_history() {
        let svc = service();
        let habit = svc.create("Meditate", None, t0()).unwrap();
        let mut raw = svc.store().get(&habit.id).unwrap().unwrap();
        raw.history = (0..30).map(|d| t0() + Duration::days(d)).collect();
        svc.store().update(&raw).unwrap();

        let rebuilt = svc.rebuild(&habit.id, t0() + Duration::days(60)).unwrap();
        assert_eq!(rebuilt.streak, 0);
        assert_eq!(rebuilt.best_streak, 30);
        assert!(rebuilt.badges.contains(Badge::Month));
    }

    /// Store that reports a conflict on the first `conflicts` updates.
    struct Contended {
        inner: HabitDb,
        conflicts: Cell<u32>,
    }

    impl HabitStore for Contended {
        fn insert(&self, habit: &Habit) -> Result<()> {
            self.inner.insert(habit)
        }
        fn get(&self, id: &str) -> Result<Option<Habit>> {
            self.inner.get(id)
        }
        fn list(&self) -> Result<Vec<Habit>> {
            self.inner.list()
        }
        fn update(&self, habit: &Habit) -> Result<Habit> {
            if self.conflicts.get() > 0 {
                self.conflicts.set(self.conflicts.get() - 1);
                return Err(CoreError::Conflict {
                    id: habit.id.clone(),
                    expected: habit.revision,
                });
            }
            self.inner.update(habit)
        }
        fn delete(&self, id: &str) -> Result<bool> {
            self.inner.delete(id)
        }
    }

    fn contended(conflicts: u32) -> HabitService<Contended> {
        HabitService::new(Contended {
            inner: HabitDb::open_memory().unwrap(),
            conflicts: Cell::new(conflicts),
        })
    }

    #[test]
    fn conflicts_are_retried() {
        let svc = contended(2);
        let habit = svc.create("Meditate", None, t0()).unwrap();
        let (saved, _) = svc.complete(&habit.id, t0()).unwrap();
        assert_eq!(saved.history.len(), 1);
        assert_eq!(saved.revision, 1);
    }

    #[test]
    fn conflicts_surface_after_budget() {
        let svc = contended(3);
        let habit = svc.create("Meditate", None, t0()).unwrap();
        let err = svc.complete(&habit.id, t0()).unwrap_err();
        assert!(matches!(err, CoreError::Conflict { .. }));
        assert!(svc.store().get(&habit.id).unwrap().unwrap().history.is_empty());
    }
}
