pub mod twilio;

use std::fmt;

use async_trait::async_trait;
use clap::ValueEnum;

/// Delivery channel of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Channel {
    Sms,
    #[value(name = "whatsapp")]
    WhatsApp,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Sms => write!(f, "sms"),
            Channel::WhatsApp => write!(f, "whatsapp"),
        }
    }
}

/// A message to dispatch, built fresh for every detected change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Recipient phone number (E.164)
    pub to: String,
    /// Message text
    pub body: String,
    pub channel: Channel,
}

/// Receipt returned by the messaging provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Provider-side message id
    pub sid: String,
    /// Provider-side delivery status, e.g. "queued"
    pub status: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("request to messaging API failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("messaging API rejected the message (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),
    #[error("unexpected response from messaging API: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Notification service trait, every messaging backend implements it
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one notification. No retries.
    async fn send(&self, notification: &Notification) -> Result<Ack, NotifyError>;
}
