//! Completion history normalization.
//!
//! A habit's history is a bag of completion instants. Streak counting only
//! cares about which UTC calendar days have at least one completion, so the
//! first step is always to collapse the bag into distinct days.

use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A UTC calendar date, the unit of streak counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarDay(NaiveDate);

impl CalendarDay {
    /// Calendar day an instant falls on, in UTC.
    pub fn of(instant: &DateTime<Utc>) -> Self {
        Self(instant.date_naive())
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// UTC midnight at the start of this day.
    pub fn start(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.0.and_time(NaiveTime::MIN))
    }

    /// The day before, or `None` at the start of the representable range.
    pub fn pred(&self) -> Option<Self> {
        self.0.pred_opt().map(Self)
    }

    pub fn succ(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }
}

impl From<NaiveDate> for CalendarDay {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for CalendarDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Collapse completion instants into distinct calendar days, most recent first.
///
/// Time-of-day is ignored and duplicate days collapse to one entry. The
/// output fed back through [`CalendarDay::start`] normalizes to itself.
pub fn normalize_history<I>(history: I) -> Vec<CalendarDay>
where
    I: IntoIterator,
    I::Item: Borrow<DateTime<Utc>>,
{
    normalize_days(history.into_iter().map(|t| CalendarDay::of(t.borrow())))
}

/// Same as [`normalize_history`] for input that is already day-granular.
pub fn normalize_days<I>(days: I) -> Vec<CalendarDay>
where
    I: IntoIterator<Item = CalendarDay>,
{
    let distinct: BTreeSet<CalendarDay> = days.into_iter().collect();
    distinct.into_iter().rev().collect()
}

/// Parse stored RFC 3339 history entries, skipping anything malformed.
///
/// A corrupt entry must not block future streak tracking, so bad values are
/// logged and dropped instead of failing the whole history.
pub fn parse_history_entries<S: AsRef<str>>(raw: &[S]) -> Vec<DateTime<Utc>> {
    raw.iter()
        .filter_map(|entry| {
            let entry = entry.as_ref();
            match DateTime::parse_from_rfc3339(entry) {
                Ok(dt) => Some(dt.with_timezone(&Utc)),
                Err(e) => {
                    tracing::warn!(entry, error = %e, "skipping malformed history entry");
                    None
                }
            }
        })
        .collect()
}
