use std::cell::RefCell;
use std::rc::Rc;

use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
}

/// User-facing, fire-and-forget feedback. Callers log a returned error and
/// carry on.
pub trait Notifier {
    fn notify(&self, message: &str, kind: NotificationKind) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, kind: NotificationKind) -> anyhow::Result<()> {
        match kind {
            NotificationKind::Success => info!(notice = %message, "notification"),
            NotificationKind::Error => error!(notice = %message, "notification"),
        }
        Ok(())
    }
}

/// Keeps every notification; clones share one log.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    log: Rc<RefCell<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.log.borrow().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .map(|notification| notification.message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str, kind: NotificationKind) -> anyhow::Result<()> {
        self.log.borrow_mut().push(Notification {
            message: message.to_string(),
            kind,
        });
        Ok(())
    }
}
