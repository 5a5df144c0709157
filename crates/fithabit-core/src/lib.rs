//! # FitHabit Core Library
//!
//! Business logic for the FitHabit habit tracker. Every operation is
//! available through the standalone CLI binary, which is a thin layer over
//! this crate.
//!
//! ## Architecture
//!
//! - **Streak engine**: pure functions that turn a completion history into a
//!   current streak and a monotonic badge set. The evaluation instant is
//!   always a parameter.
//! - **Habit model**: completion and reset handlers that keep the cached
//!   streak, best streak and badges consistent with the history.
//! - **Storage**: SQLite habit store with revisioned writes, TOML configuration
//! - **Service**: create / complete / reset / delete / list / summary over a store
//!
//! ## Key Components
//!
//! - [`compute_streak`], [`compute_badges`], [`normalize_history`]
//! - [`Habit`]: habit record and event handlers
//! - [`HabitService`]: client-facing operations
//! - [`HabitDb`]: SQLite implementation of [`HabitStore`]
//! - [`Config`]: Application configuration management

pub mod error;
pub mod habit;
pub mod service;
pub mod storage;
pub mod streak;
pub mod summary;

pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use habit::{Completion, Habit};
pub use service::HabitService;
pub use storage::{Config, HabitDb, HabitStore};
pub use streak::{
    compute_badges, compute_streak, normalize_history, Badge, BadgeSet, CalendarDay,
    StreakSnapshot,
};
pub use summary::{summarize, Summary};
