use clap::Subcommand;
use kai_core::{format_duration, DurationConfig, DurationField};

use crate::host;

#[derive(Subcommand)]
pub enum DurationsAction {
    /// Show configured durations
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set one duration field
    Set {
        /// Field name (pomodoro_minutes, short_break_minutes, long_break_minutes,
        /// simple_hours, simple_minutes, simple_seconds)
        field: DurationField,
        /// New value
        value: u32,
    },
}

pub fn run(action: DurationsAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = host::open_store()?;
    match action {
        DurationsAction::Show { json } => {
            let durations = DurationConfig::load(&store);
            if json {
                println!("{}", serde_json::to_string_pretty(&durations)?);
            } else {
                for field in DurationField::ALL {
                    println!("{:<20} {}", field.name(), durations.get(field));
                }
                println!(
                    "simple timer total   {}",
                    format_duration(durations.simple_secs())
                );
            }
        }
        DurationsAction::Set { field, value } => {
            let mut durations = DurationConfig::load(&store);
            durations.set(field, value);
            durations.save(&store)?;
            println!("{} = {}", field.name(), value);
        }
    }
    Ok(())
}
