//! Streak & badge engine.
//!
//! Pure, synchronous functions over a habit's completion history:
//! normalization into calendar days, current-streak computation, and
//! monotonic badge derivation. No I/O and no clock reads.

mod badges;
mod engine;
mod history;

pub use badges::{compute_badges, next_badge, Badge, BadgeSet, UnknownBadge};
pub use engine::{compute_streak, longest_run, streak_from_days, StreakSnapshot};
pub use history::{normalize_days, normalize_history, parse_history_entries, CalendarDay};
