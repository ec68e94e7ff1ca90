//! # Notifications
//!
//! Workflow transitions hand a [`Notification`] to the [`NotificationQueue`]
//! and return immediately. A single [`Dispatcher`] task drains the queue and
//! passes rendered mail to a [`MailTransport`]. Delivery failures are logged
//! and counted, never retried and never reported to the caller.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::counter;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::MailConfig;
use crate::models::{TimeOffStatus, TimesheetStatus};

/// Something a person should be told about.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    TimesheetSubmitted {
        timesheet_id: i32,
        week_start: NaiveDate,
        employee_name: String,
        manager_email: String,
    },
    TimesheetDecided {
        timesheet_id: i32,
        week_start: NaiveDate,
        owner_email: String,
        status: TimesheetStatus,
        manager_comment: Option<String>,
    },
    TimeOffRequested {
        time_off_id: i32,
        employee_name: String,
        manager_email: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    TimeOffDecided {
        time_off_id: i32,
        owner_email: String,
        status: TimeOffStatus,
        start_date: NaiveDate,
        end_date: NaiveDate,
        manager_comment: Option<String>,
    },
}

impl Notification {
    /// Metric label.
    pub fn kind(&self) -> &'static str {
        match self {
            Notification::TimesheetSubmitted { .. } => "timesheet_submitted",
            Notification::TimesheetDecided { .. } => "timesheet_decided",
            Notification::TimeOffRequested { .. } => "time_off_requested",
            Notification::TimeOffDecided { .. } => "time_off_decided",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Notification::TimesheetSubmitted { manager_email, .. }
            | Notification::TimeOffRequested { manager_email, .. } => manager_email,
            Notification::TimesheetDecided { owner_email, .. }
            | Notification::TimeOffDecided { owner_email, .. } => owner_email,
        }
    }

    pub fn render(&self, from: &str) -> OutboundMail {
        let (subject, mut body) = match self {
            Notification::TimesheetSubmitted {
                timesheet_id,
                week_start,
                employee_name,
                ..
            } => (
                format!("Timesheet submitted for week of {week_start}"),
                format!(
                    "{employee_name} submitted timesheet #{timesheet_id} for the week starting {week_start}. It is waiting for your approval."
                ),
            ),
            Notification::TimesheetDecided {
                timesheet_id,
                week_start,
                status,
                ..
            } => (
                format!("Timesheet {status} for week of {week_start}"),
                format!("Your timesheet #{timesheet_id} for the week starting {week_start} was {status}."),
            ),
            Notification::TimeOffRequested {
                time_off_id,
                employee_name,
                start_date,
                end_date,
                ..
            } => (
                format!("Time-off request from {employee_name}"),
                format!(
                    "{employee_name} requested time off from {start_date} to {end_date} (request #{time_off_id})."
                ),
            ),
            Notification::TimeOffDecided {
                time_off_id,
                status,
                start_date,
                end_date,
                ..
            } => (
                format!("Time-off request {status}"),
                format!(
                    "Your time-off request #{time_off_id} from {start_date} to {end_date} was {status}."
                ),
            ),
        };

        if let Notification::TimesheetDecided {
            manager_comment: Some(comment),
            ..
        }
        | Notification::TimeOffDecided {
            manager_comment: Some(comment),
            ..
        } = self
        {
            body.push_str("\n\nManager comment: ");
            body.push_str(comment);
        }

        OutboundMail {
            from: from.to_string(),
            to: self.recipient().to_string(),
            subject,
            body,
        }
    }
}

/// A rendered plain-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("mail transport unavailable: {0}")]
    Unavailable(String),
    #[error("recipient rejected: {0}")]
    Rejected(String),
}

/// Outbound mail seam.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, mail: &OutboundMail) -> Result<(), DeliveryError>;
}

/// Writes every message to the log instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct LogTransport {
    pub relay: Option<String>,
}

impl LogTransport {
    pub fn from_config(config: &MailConfig) -> Self {
        Self {
            relay: config
                .smtp_host
                .as_ref()
                .map(|host| format!("{host}:{}", config.smtp_port)),
        }
    }
}

#[async_trait]
impl MailTransport for LogTransport {
    async fn deliver(&self, mail: &OutboundMail) -> Result<(), DeliveryError> {
        info!(
            to = %mail.to,
            from = %mail.from,
            subject = %mail.subject,
            relay = self.relay.as_deref().unwrap_or("none"),
            "Outbound mail"
        );
        Ok(())
    }
}

/// Producer side handed to workflows. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: Option<mpsc::Sender<Notification>>,
}

impl NotificationQueue {
    /// A queue that drops everything, used when notifications are disabled.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Requests delivery without waiting. Never fails.
    pub fn request(&self, notification: Notification) {
        let kind = notification.kind();
        let Some(sender) = &self.sender else {
            debug!(kind, "Notifications disabled; dropping");
            return;
        };

        match sender.try_send(notification) {
            Ok(()) => {
                counter!("notifications_enqueued_total", "kind" => kind).increment(1);
            }
            Err(TrySendError::Full(dropped)) => {
                counter!("notifications_dropped_total", "kind" => kind, "reason" => "full")
                    .increment(1);
                warn!(kind, to = %dropped.recipient(), "Notification queue full; dropping");
            }
            Err(TrySendError::Closed(dropped)) => {
                counter!("notifications_dropped_total", "kind" => kind, "reason" => "closed")
                    .increment(1);
                warn!(kind, to = %dropped.recipient(), "Notification dispatcher stopped; dropping");
            }
        }
    }
}

/// Consumer side: owns the receiver and the transport.
pub struct Dispatcher {
    receiver: mpsc::Receiver<Notification>,
    transport: Arc<dyn MailTransport>,
    from: String,
}

/// Creates a bounded queue and its dispatcher. Returns a disabled queue and
/// no dispatcher when notifications are turned off.
pub fn channel(
    config: &MailConfig,
    transport: Arc<dyn MailTransport>,
) -> (NotificationQueue, Option<Dispatcher>) {
    if !config.enabled {
        return (NotificationQueue::disabled(), None);
    }

    let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
    (
        NotificationQueue {
            sender: Some(sender),
        },
        Some(Dispatcher {
            receiver,
            transport,
            from: config.from.clone(),
        }),
    )
}

impl Dispatcher {
    /// Drains the queue until shutdown fires or every producer is dropped.
    #[instrument(skip_all)]
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Notification dispatcher started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Notification dispatcher shutdown requested");
                    break;
                }
                next = self.receiver.recv() => match next {
                    Some(notification) => self.dispatch(notification).await,
                    None => break,
                },
            }
        }
        info!("Notification dispatcher stopped");
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn dispatch(&self, notification: Notification) {
        let kind = notification.kind();
        let mail = notification.render(&self.from);
        match self.transport.deliver(&mail).await {
            Ok(()) => {
                counter!("notifications_sent_total", "kind" => kind).increment(1);
            }
            Err(error) => {
                counter!("notifications_failed_total", "kind" => kind).increment(1);
                warn!(kind, to = %mail.to, error = %error, "Notification delivery failed");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// Keeps delivered mail in memory.
    #[derive(Default)]
    pub struct RecordingTransport {
        pub delivered: Mutex<Vec<OutboundMail>>,
        pub fail: bool,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn deliver(&self, mail: &OutboundMail) -> Result<(), DeliveryError> {
            if self.fail {
                return Err(DeliveryError::Unavailable("relay down".to_string()));
            }
            self.delivered.lock().await.push(mail.clone());
            Ok(())
        }
    }
}
