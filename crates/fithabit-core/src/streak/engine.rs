//! Streak computation.
//!
//! A streak is the run of consecutive calendar days with a completion,
//! ending on the evaluation day or the day before it. Ending yesterday still
//! counts: the user simply hasn't checked in today yet. Any older gap breaks
//! the streak.
//!
//! The evaluation instant is always passed in; nothing here reads the clock.

use std::borrow::Borrow;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::badges::{compute_badges, BadgeSet};
use super::history::{normalize_history, CalendarDay};

/// Current streak of a raw completion history, evaluated at `now`.
pub fn compute_streak<I>(history: I, now: DateTime<Utc>) -> u32
where
    I: IntoIterator,
    I::Item: Borrow<DateTime<Utc>>,
{
    let days = normalize_history(history);
    streak_from_days(&days, CalendarDay::of(&now))
}

/// Current streak of a set of completion days, evaluated on `today`.
///
/// Days after `today` are ignored, so evaluating in the past gives the
/// streak as it stood then.
pub fn streak_from_days(days: &[CalendarDay], today: CalendarDay) -> u32 {
    let completed: BTreeSet<CalendarDay> = days.iter().copied().filter(|d| *d <= today).collect();

    let Some(&latest) = completed.iter().next_back() else {
        return 0;
    };

    if latest != today && Some(latest) != today.pred() {
        tracing::debug!(%latest, %today, "streak broken");
        return 0;
    }

    let mut streak = 0u32;
    let mut pointer = Some(latest);
    while let Some(day) = pointer {
        if !completed.contains(&day) {
            break;
        }
        streak += 1;
        pointer = day.pred();
    }
    streak
}

/// Longest run of consecutive days anywhere in the history.
pub fn longest_run(days: &[CalendarDay]) -> u32 {
    let ascending: BTreeSet<CalendarDay> = days.iter().copied().collect();

    let mut best = 0u32;
    let mut run = 0u32;
    let mut previous: Option<CalendarDay> = None;
    for day in ascending {
        run = match previous {
            Some(p) if p.succ() == Some(day) => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(day);
    }
    best
}

/// Derived progress values for a habit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StreakSnapshot {
    pub streak: u32,
    pub best_streak: u32,
    pub badges: BadgeSet,
}

impl StreakSnapshot {
    /// Derive fresh values from a history, carrying forward the previous
    /// best streak and badges so neither ever shrinks.
    pub fn derive(
        history: &[DateTime<Utc>],
        previous_best: u32,
        previous_badges: &BadgeSet,
        now: DateTime<Utc>,
    ) -> Self {
        let streak = compute_streak(history, now);
        Self {
            streak,
            best_streak: previous_best.max(streak),
            badges: compute_badges(streak, previous_badges),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streak::Badge;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 14, 30, 0).unwrap()
    }

    fn days_ago(n: i64) -> DateTime<Utc> {
        now() - Duration::days(n)
    }

    #[test]
    fn empty_history_has_no_streak() {
        let history: Vec<DateTime<Utc>> = Vec::new();
        assert_eq!(compute_streak(&history, now()), 0);
    }

    #[test]
    fn completed_today_counts_one() {
        assert_eq!(compute_streak(&[now()], now()), 1);
    }

    #[test]
    fn three_consecutive_days_ending_today() {
        let history = [days_ago(2), now(), days_ago(1)];
        assert_eq!(compute_streak(&history, now()), 3);
    }

    #[test]
    fn completed_yesterday_is_still_live() {
        assert_eq!(compute_streak(&[days_ago(1)], now()), 1);
    }

    #[test]
    fn two_day_gap_breaks_streak() {
        assert_eq!(compute_streak(&[days_ago(2)], now()), 0);
    }

    #[test]
    fn stale_history_ignores_earlier_runs() {
        let history: Vec<_> = (3..20).map(days_ago).collect();
        assert_eq!(compute_streak(&history, now()), 0);
    }

    #[test]
    fn run_stops_at_first_gap() {
        // today, yesterday, gap, then a long older run
        let mut history = vec![now(), days_ago(1)];
        history.extend((3..10).map(days_ago));
        assert_eq!(compute_streak(&history, now()), 2);
    }

    #[test]
    fn streak_ending_yesterday_counts_whole_run() {
        let history: Vec<_> = (1..=5).map(days_ago).collect();
        assert_eq!(compute_streak(&history, now()), 5);
    }

    #[test]
    fn time_of_day_does_not_matter() {
        let today = CalendarDay::of(&now());
        let late_yesterday = today.start() - Duration::seconds(1);
        let early_today = today.start();
        let history = [late_yesterday, early_today];
        assert_eq!(compute_streak(&history, now()), 2);
        // Evaluated one second before midnight, only yesterday exists so far.
        assert_eq!(compute_streak(&history, late_yesterday), 1);
    }

    #[test]
    fn future_days_are_ignored() {
        let history = [days_ago(-1), days_ago(0), days_ago(1)];
        assert_eq!(compute_streak(&history, now()), 2);
    }

    #[test]
    fn duplicates_do_not_inflate_streak() {
        let history = [now(), now(), days_ago(1), days_ago(1)];
        assert_eq!(compute_streak(&history, now()), 2);
    }

    #[test]
    fn longest_run_finds_older_runs() {
        let days: Vec<_> = [0, 1, 5, 6, 7, 8, 20]
            .into_iter()
            .map(|n| CalendarDay::of(&days_ago(n)))
            .collect();
        assert_eq!(longest_run(&days), 4);
        assert_eq!(longest_run(&[]), 0);
    }

    #[test]
    fn snapshot_never_lowers_best_or_badges() {
        let previous: BadgeSet = [Badge::Week].into_iter().collect();
        let snap = StreakSnapshot::derive(&[days_ago(1)], 12, &previous, now());
        assert_eq!(snap.streak, 1);
        assert_eq!(snap.best_streak, 12);
        assert_eq!(snap.badges, previous);
    }

    #[test]
    fn snapshot_unlocks_badges_from_live_streak() {
        let history: Vec<_> = (0..30).map(days_ago).collect();
        let snap = StreakSnapshot::derive(&history, 0, &BadgeSet::new(), now());
        assert_eq!(snap.streak, 30);
        assert_eq!(snap.best_streak, 30);
        assert_eq!(snap.badges.ids(), vec!["7-day", "30-day"]);
    }

    proptest! {
        #[test]
        fn streak_bounded_by_distinct_days(offsets in prop::collection::vec(-3i64..60, 0..40)) {
            let history: Vec<_> = offsets.iter().map(|n| days_ago(*n)).collect();
            let streak = compute_streak(&history, now());
            let days = normalize_history(&history);
            prop_assert!(streak as usize <= days.len());
            prop_assert!(streak <= longest_run(&days));

            let today = CalendarDay::of(&now());
            let live = days
                .iter()
                .any(|d| *d == today || Some(*d) == today.pred());
            prop_assert_eq!(streak == 0, !live);
        }
    }
}
