//! Completion notifications.
//!
//! Delivery is best effort. The engine logs a failed notification and
//! carries on; timer state never depends on it.

use thiserror::Error;

use crate::session::ActivityLabel;

#[derive(Error, Debug)]
#[error("notification not delivered: {0}")]
pub struct NotifyError(pub String);

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError>;
}

/// Drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _title: &str, _body: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

pub const COMPLETION_TITLE: &str = "Session complete";

pub fn completion_body(label: ActivityLabel) -> String {
    format!("Your {label} session has finished!")
}
