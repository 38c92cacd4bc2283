use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use clap::Subcommand;
use kai_core::{format_duration, CoreError, Group, SessionKind, SessionLedger};
use uuid::Uuid;

use crate::host;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List recorded sessions grouped by cycle
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a group and all of its sessions
    Delete {
        /// Group ID
        id: Uuid,
    },
    /// Delete all history
    Clear,
}

fn local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn print_group(group: &Group) {
    let kind = match group.kind() {
        SessionKind::Pomodoro => "pomodoro",
        SessionKind::Simple => "simple",
    };
    let end = group
        .end_time
        .map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_else(|| "--:--".to_string());
    println!(
        "{}  {} - {}  {:<8} {:<8} {:>12}  {} completed, {} interrupted",
        group.id,
        local(group.start_time),
        end,
        kind,
        group.label,
        format_duration(group.total_duration_secs()),
        group.completed_count(),
        group.interrupted_count(),
    );
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(host::open_store()?);
    let mut ledger = SessionLedger::load(store);

    match action {
        HistoryAction::List { json } => {
            let groups = ledger.grouped_sessions();
            if json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
            } else if groups.is_empty() {
                println!("No sessions recorded.");
            } else {
                for group in &groups {
                    print_group(group);
                }
            }
        }
        HistoryAction::Delete { id } => {
            let removed = ledger.delete_group(id);
            if removed == 0 {
                return Err(CoreError::GroupNotFound(id).into());
            }
            println!("Deleted {removed} session(s)");
        }
        HistoryAction::Clear => {
            let count = ledger.len();
            ledger.clear_all();
            println!("Deleted {count} session(s)");
        }
    }
    Ok(())
}
