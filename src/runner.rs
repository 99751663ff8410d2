use log::{debug, error, info};
use std::fmt;
use std::time::Duration;

use crate::monitors::{Change, Monitor};
use crate::notifiers::{Ack, Notification, Notifier};

/// Outcome of the single notification attempt made after a change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent(Ack),
    Failed(String),
}

/// Why and how the monitor stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub change: Change,
    pub delivery: Delivery,
    /// Checks performed, including the one that saw the change
    pub checks: u64,
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} after {} check(s), ", self.change, self.checks)?;
        match &self.delivery {
            Delivery::Sent(ack) => write!(f, "notification {} {}", ack.sid, ack.status),
            Delivery::Failed(reason) => write!(f, "notification failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorState {
    Polling,
    Terminated(Completion),
}

/// Drives a monitor until it sees a change and has tried to announce it
pub struct Runner<'a, M> {
    monitor: M,
    notifier: &'a dyn Notifier,
    /// Message sent on change; cloned for each dispatch
    alert: Notification,
    checks: u64,
}

impl<'a, M: Monitor> Runner<'a, M> {
    pub fn new(monitor: M, notifier: &'a dyn Notifier, alert: Notification) -> Self {
        Self {
            monitor,
            notifier,
            alert,
            checks: 0,
        }
    }

    #[cfg(test)]
    pub fn monitor(&self) -> &M {
        &self.monitor
    }

    /// One loop iteration without the trailing sleep
    pub async fn step(&mut self) -> MonitorState {
        self.checks += 1;
        match self.monitor.check().await {
            Ok(Some(change)) => {
                info!("Change detected: {}", change.message);
                debug!("{}", change.details);
                let delivery = self.dispatch().await;
                MonitorState::Terminated(Completion {
                    change,
                    delivery,
                    checks: self.checks,
                })
            }
            Ok(None) => MonitorState::Polling,
            Err(e) => {
                error!("{}", e);
                MonitorState::Polling
            }
        }
    }

    async fn dispatch(&self) -> Delivery {
        let notification = self.alert.clone();
        match self.notifier.send(&notification).await {
            Ok(ack) => {
                info!(
                    "{} message sent to {} (sid {}, status {})",
                    notification.channel, notification.to, ack.sid, ack.status
                );
                Delivery::Sent(ack)
            }
            Err(e) => {
                error!("{} sending error: {}", notification.channel, e);
                Delivery::Failed(e.to_string())
            }
        }
    }

    /// Poll until a change is seen, sleeping the monitor's interval between checks
    pub async fn run(mut self) -> Completion {
        info!("Starting {}", self.monitor.name());
        loop {
            if let MonitorState::Terminated(completion) = self.step().await {
                return completion;
            }
            tokio::time::sleep(Duration::from_secs(self.monitor.interval())).await;
        }
    }
}
