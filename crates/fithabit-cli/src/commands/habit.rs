//! Habit commands for CLI.

use chrono::{DateTime, Utc};
use clap::Subcommand;
use fithabit_core::{Badge, Completion, Config, Habit, HabitDb, HabitService};
use serde::Serialize;

#[derive(Subcommand)]
pub enum HabitAction {
    /// Create a new habit
    Create {
        /// Habit title
        title: String,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
    },
    /// List all habits, newest first
    List,
    /// Show one habit with progress toward the next badge
    Show {
        /// Habit ID
        id: String,
    },
    /// Mark a habit as done for the day
    Complete {
        /// Habit ID
        id: String,
        /// Completion time as RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<String>,
    },
    /// Clear history, streaks and badges
    Reset {
        /// Habit ID
        id: String,
    },
    /// Delete a habit permanently
    Delete {
        /// Habit ID
        id: String,
    },
    /// Recompute cached streaks and badges from the full history
    Rebuild {
        /// Habit ID
        id: String,
    },
}

#[derive(Serialize)]
struct NextBadge {
    badge: Badge,
    label: &'static str,
    days_remaining: u32,
}

#[derive(Serialize)]
struct HabitView<'a> {
    #[serde(flatten)]
    habit: &'a Habit,
    badge_labels: Vec<&'static str>,
    next_badge: Option<NextBadge>,
}

impl<'a> HabitView<'a> {
    fn new(habit: &'a Habit) -> Self {
        Self {
            habit,
            badge_labels: habit.badges.iter().map(|b| b.label()).collect(),
            next_badge: habit.next_badge().map(|(badge, days_remaining)| NextBadge {
                badge,
                label: badge.label(),
                days_remaining,
            }),
        }
    }
}

#[derive(Serialize)]
struct CompletionView<'a> {
    outcome: Completion,
    habit: HabitView<'a>,
}

fn parse_instant(value: Option<&str>) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    match value {
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("invalid --at timestamp '{s}': {e}").into()),
        None => Ok(Utc::now()),
    }
}

pub fn run(action: HabitAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let service = HabitService::with_config(HabitDb::open(config)?, config);
    let now = Utc::now();

    match action {
        HabitAction::Create { title, description } => {
            let habit = service.create(&title, description.as_deref(), now)?;
            println!("{}", serde_json::to_string_pretty(&HabitView::new(&habit))?);
        }
        HabitAction::List => {
            let habits = service.list(now)?;
            let views: Vec<_> = habits.iter().map(HabitView::new).collect();
            println!("{}", serde_json::to_string_pretty(&views)?);
        }
        HabitAction::Show { id } => {
            let habit = service.get(&id, now)?;
            println!("{}", serde_json::to_string_pretty(&HabitView::new(&habit))?);
        }
        HabitAction::Complete { id, at } => {
            let at = parse_instant(at.as_deref())?;
            let (habit, outcome) = service.complete(&id, at)?;
            let view = CompletionView {
                outcome,
                habit: HabitView::new(&habit),
            };
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        HabitAction::Reset { id } => {
            let habit = service.reset(&id)?;
            println!("{}", serde_json::to_string_pretty(&HabitView::new(&habit))?);
        }
        HabitAction::Delete { id } => {
            service.delete(&id)?;
            println!("{}", serde_json::json!({ "deleted": id }));
        }
        HabitAction::Rebuild { id } => {
            let habit = service.rebuild(&id, now)?;
            println!("{}", serde_json::to_string_pretty(&HabitView::new(&habit))?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_instant_accepts_offsets() {
        let at = parse_instant(Some("2024-04-01T23:30:00-02:00")).unwrap();
        assert_eq!(at.to_rfc3339(), "2024-04-02T01:30:00+00:00");
    }

    #[test]
    fn parse_instant_rejects_garbage() {
        let err = parse_instant(Some("yesterday")).unwrap_err();
        assert!(err.to_string().contains("invalid --at timestamp"));
    }

    #[test]
    fn view_lists_labels_and_next_badge() {
        let mut habit = Habit::new("Walk", None, Utc::now()).unwrap();
        habit.streak = 8;
        habit.badges.insert(Badge::Week);

        let json = serde_json::to_value(HabitView::new(&habit)).unwrap();
        assert_eq!(json["title"], "Walk");
        assert_eq!(json["badges"], serde_json::json!(["7-day"]));
        assert_eq!(json["badge_labels"], serde_json::json!(["7-day streak"]));
        assert_eq!(json["next_badge"]["badge"], "30-day");
        assert_eq!(json["next_badge"]["days_remaining"], 22);
    }
}
