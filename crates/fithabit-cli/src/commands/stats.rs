use clap::Subcommand;
use fithabit_core::{Config, HabitDb, HabitService};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Habit count, average streak and top habits by best streak
    Summary {
        /// Number of top habits to include (defaults to summary.top_n)
        #[arg(long)]
        top: Option<usize>,
    },
}

pub fn run(action: StatsAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let service = HabitService::with_config(HabitDb::open(config)?, config);

    match action {
        StatsAction::Summary { top } => {
            let summary = service.summary(top.unwrap_or(config.summary.top_n))?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }
    Ok(())
}
