//! Wiring shared by the commands: store, notifier, engine.

use std::io::Write;
use std::sync::Arc;

use kai_core::{
    BackgroundStore, Config, CoreError, Notifier, NotifyError, NullNotifier, SharedEngine,
    SqliteStore, TimerEngine, TokioScheduler,
};

/// Prints completion notices to the terminal.
pub struct TerminalNotifier {
    bell: bool,
}

impl Notifier for TerminalNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let mut err = std::io::stderr().lock();
        if self.bell {
            write!(err, "\x07").map_err(|e| NotifyError(e.to_string()))?;
        }
        writeln!(err, "[{title}] {body}").map_err(|e| NotifyError(e.to_string()))
    }
}

pub fn notifier_for(config: &Config) -> Arc<dyn Notifier> {
    if config.notifications.enabled {
        Arc::new(TerminalNotifier {
            bell: config.notifications.sound,
        })
    } else {
        Arc::new(NullNotifier)
    }
}

pub fn open_store() -> Result<SqliteStore, CoreError> {
    Ok(SqliteStore::open()?)
}

/// Build the one engine this process owns. Must run inside a tokio
/// runtime so the clock can schedule ticks.
pub fn build_engine(
    config: &Config,
    store: Arc<BackgroundStore<SqliteStore>>,
) -> Result<SharedEngine, Box<dyn std::error::Error>> {
    let scheduler = TokioScheduler::current()?;
    let engine = TimerEngine::new(store, Box::new(scheduler))
        .with_notifier(notifier_for(config))
        .with_auto_open_window(config.window.auto_open);
    Ok(SharedEngine::new(engine))
}
