use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::{DeliveryError, DeliveryReceipt, MessageTransport, NotificationChannel, OutboundMessage};
use crate::config::{ResendConfig, TwilioConfig};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";
const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01/Accounts";
const REQUEST_TIMEOUT_SECS: u64 = 15;

fn http_client(provider: &'static str) -> Result<reqwest::Client, DeliveryError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|err| DeliveryError::Transport {
            provider,
            message: err.to_string(),
        })
}

async fn rejected(provider: &'static str, response: reqwest::Response) -> DeliveryError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    DeliveryError::Rejected {
        provider,
        status,
        body,
    }
}

fn transport_error(provider: &'static str) -> impl Fn(reqwest::Error) -> DeliveryError {
    move |err| DeliveryError::Transport {
        provider,
        message: err.to_string(),
    }
}

/// Transactional email through Resend.
pub struct ResendEmailTransport {
    client: reqwest::Client,
    config: ResendConfig,
}

impl ResendEmailTransport {
    pub fn new(config: ResendConfig) -> Result<Self, DeliveryError> {
        Ok(Self {
            client: http_client("resend")?,
            config,
        })
    }
}

#[derive(Deserialize)]
struct ResendResponse {
    id: String,
}

#[async_trait]
impl MessageTransport for ResendEmailTransport {
    async fn deliver(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError> {
        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "from": &self.config.from_address,
                "to": [&message.recipient],
                "subject": &message.subject,
                "text": &message.body,
            }))
            .send()
            .await
            .map_err(transport_error("resend"))?;

        if !response.status().is_success() {
            return Err(rejected("resend", response).await);
        }

        let payload: ResendResponse = response.json().await.map_err(transport_error("resend"))?;
        Ok(DeliveryReceipt {
            provider: "resend",
            provider_message_id: payload.id,
        })
    }
}

/// SMS and voice calls through Twilio. Voice messages are read out with TwiML `<Say>`.
pub struct TwilioTransport {
    client: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioTransport {
    pub fn new(config: TwilioConfig) -> Result<Self, DeliveryError> {
        Ok(Self {
            client: http_client("twilio")?,
            config,
        })
    }
}

#[derive(Deserialize)]
struct TwilioResponse {
    sid: String,
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[async_trait]
impl MessageTransport for TwilioTransport {
    async fn deliver(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError> {
        let account = &self.config.account_sid;
        let (url, params) = match message.channel {
            NotificationChannel::Voice => (
                format!("{TWILIO_API_BASE}/{account}/Calls.json"),
                vec![
                    ("To", message.recipient.clone()),
                    ("From", self.config.from_number.clone()),
                    (
                        "Twiml",
                        format!(
                            "<Response><Say voice=\"alice\">{}</Say></Response>",
                            escape_xml(&message.body)
                        ),
                    ),
                ],
            ),
            _ => (
                format!("{TWILIO_API_BASE}/{account}/Messages.json"),
                vec![
                    ("To", message.recipient.clone()),
                    ("From", self.config.from_number.clone()),
                    ("Body", message.body.clone()),
                ],
            ),
        };

        debug!(channel = message.channel.label(), "posting to twilio");
        let response = self
            .client
            .post(url)
            .basic_auth(account, Some(&self.config.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(transport_error("twilio"))?;

        if !response.status().is_success() {
            return Err(rejected("twilio", response).await);
        }

        let payload: TwilioResponse = response.json().await.map_err(transport_error("twilio"))?;
        Ok(DeliveryReceipt {
            provider: "twilio",
            provider_message_id: payload.sid,
        })
    }
}

/// Stand-in used when a provider has no credentials configured.
#[derive(Debug, Default)]
pub struct MockTransport {
    counter: AtomicU64,
}

#[async_trait]
impl MessageTransport for MockTransport {
    async fn deliver(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        info!(
            channel = message.channel.label(),
            recipient = %message.recipient,
            subject = %message.subject,
            "mock delivery (provider not configured)"
        );
        Ok(DeliveryReceipt {
            provider: "mock",
            provider_message_id: format!("mock-{}-{n}", message.channel.label()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::escape_xml;

    #[test]
    fn voice_text_is_escaped_for_twiml() {
        assert_eq!(
            escape_xml("EMI <due> & \"overdue\""),
            "EMI &lt;due&gt; &amp; &quot;overdue&quot;"
        );
    }
}
