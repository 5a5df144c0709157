//! Cross-habit summary.

use serde::{Deserialize, Serialize};

use crate::habit::Habit;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    /// Mean of the persisted `streak` values, rounded to two decimals.
    pub avg_streak: f64,
    /// Habits with the highest best streak, descending.
    pub top: Vec<Habit>,
}

/// Count, average streak and top-`top_n` habits by best streak.
///
/// Ties keep the input order.
pub fn summarize(habits: &[Habit], top_n: usize) -> Summary {
    let total = habits.len();
    let sum: u64 = habits.iter().map(|h| u64::from(h.streak)).sum();
    let avg = if total == 0 { 0.0 } else { sum as f64 / total as f64 };

    let mut ranked: Vec<&Habit> = habits.iter().collect();
    ranked.sort_by(|a, b| b.best_streak.cmp(&a.best_streak));

    Summary {
        total,
        avg_streak: (avg * 100.0).round() / 100.0,
        top: ranked.into_iter().take(top_n).cloned().collect(),
    }
}
