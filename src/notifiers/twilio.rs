use async_trait::async_trait;
use log::debug;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::notifiers::{Ack, Channel, Notification, Notifier, NotifyError};

pub const TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Twilio Messages API notifier, sends SMS or WhatsApp messages
pub struct TwilioNotifier {
    account_sid: String,
    auth_token: String,
    /// Sender phone number (E.164), also used as the WhatsApp sender
    sender: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    code: Option<i64>,
    message: String,
}

impl TwilioNotifier {
    /// Create a new Twilio notifier
    pub fn new(account_sid: &str, auth_token: &str, sender: &str) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            sender: sender.to_string(),
            base_url: TWILIO_API_BASE.to_string(),
            client,
        })
    }

    /// Point the notifier at another API host
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.base_url, self.account_sid
        )
    }
}

/// Twilio addresses WhatsApp numbers as `whatsapp:+123...`
fn address(channel: Channel, number: &str) -> String {
    match channel {
        Channel::Sms => number.to_string(),
        Channel::WhatsApp => format!("whatsapp:{}", number),
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, notification: &Notification) -> Result<Ack, NotifyError> {
        let from = address(notification.channel, &self.sender);
        let to = address(notification.channel, &notification.to);
        let params = [
            ("From", from.as_str()),
            ("To", to.as_str()),
            ("Body", notification.body.as_str()),
        ];
        let post_data = serde_urlencoded::to_string(params)?;

        debug!("Sending {} message to {}", notification.channel, to);

        let res = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(CONTENT_LENGTH, post_data.len() as u64)
            .body(post_data)
            .send()
            .await?;

        let status = res.status();
        let data = res.text().await?;
        debug!("Messaging API response ({}): {}", status, data);

        if !status.is_success() {
            let message = match serde_json::from_str::<TwilioErrorBody>(&data) {
                Ok(TwilioErrorBody {
                    code: Some(code),
                    message,
                }) => format!("{} (code {})", message, code),
                Ok(TwilioErrorBody { message, .. }) => message,
                Err(_) => data,
            };
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let resource: MessageResource = serde_json::from_str(&data)?;
        Ok(Ack {
            sid: resource.sid,
            status: resource.status,
        })
    }
}
