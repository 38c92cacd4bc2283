use std::io::Write;
use std::sync::Arc;

use clap::Args;
use kai_core::{
    format_clock, next_phase_message, ActivityLabel, BackgroundStore, Config, Event, SqliteStore,
    TimerMode,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::host;

#[derive(Args)]
pub struct RunArgs {
    /// Timer mode (pomodoro, simple); defaults to timer.default_mode
    #[arg(long)]
    mode: Option<TimerMode>,
    /// Activity label (study, work, health, leisure, reading)
    #[arg(long)]
    label: Option<ActivityLabel>,
    /// Number of phases to run back to back
    #[arg(long, default_value_t = 1)]
    phases: u32,
    /// Print every event as a JSON line
    #[arg(long)]
    json: bool,
}

pub fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = Arc::new(BackgroundStore::new(host::open_store()?));
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let result = runtime.block_on(drive(&config, Arc::clone(&store), &args));
    // Flush queued history writes before the process exits.
    store.shutdown();
    result
}

async fn drive(
    config: &Config,
    store: Arc<BackgroundStore<SqliteStore>>,
    args: &RunArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = host::build_engine(config, store)?;
    engine.set_mode(args.mode.unwrap_or(config.timer.default_mode));
    engine.set_label(args.label.unwrap_or(config.timer.default_label));

    let mut rx = engine.subscribe();
    engine.start();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut finished = 0u32;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                engine.stop();
                if !args.json {
                    println!();
                }
                break;
            }
            received = rx.recv() => match received {
                Ok(event) => {
                    if args.json {
                        println!("{}", serde_json::to_string(&event)?);
                    }
                    match &event {
                        Event::Tick { remaining_secs, .. } if !args.json => {
                            print!("\r{} ", format_clock(*remaining_secs));
                            std::io::stdout().flush()?;
                        }
                        Event::PhaseCompleted { .. } => {
                            finished += 1;
                            if !args.json {
                                if let Some(message) = next_phase_message(&event) {
                                    println!("\r{message}");
                                }
                            }
                            if finished >= args.phases {
                                break;
                            }
                            engine.start();
                        }
                        _ => {}
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event stream lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
    Ok(())
}
