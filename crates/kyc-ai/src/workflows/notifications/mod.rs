//! Customer communications over email, SMS, and voice.
//!
//! Every attempt is recorded as a [`Notification`] row whether it succeeds or
//! not. Callers decide whether a delivery failure matters; the KYC and loan
//! services log and continue, the EMI sweep collects failures per row.

mod dispatcher;
mod transports;

pub use dispatcher::{ContactDelivery, NotificationDispatcher};
pub use transports::{MockTransport, ResendEmailTransport, TwilioTransport};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    Email,
    Sms,
    Voice,
}

impl NotificationChannel {
    pub const fn label(self) -> &'static str {
        match self {
            NotificationChannel::Email => "email",
            NotificationChannel::Sms => "sms",
            NotificationChannel::Voice => "voice",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

/// Per-customer channel toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(default = "enabled")]
    pub email: bool,
    #[serde(default = "enabled")]
    pub sms: bool,
    #[serde(default)]
    pub voice: bool,
}

fn enabled() -> bool {
    true
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email: true,
            sms: true,
            voice: false,
        }
    }
}

/// Where and how a customer can be reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub preferences: NotificationPreferences,
}

impl ContactDetails {
    /// Channels that are both enabled and reachable.
    pub fn channels(&self) -> Vec<NotificationChannel> {
        let mut channels = Vec::new();
        if self.preferences.email && self.email.is_some() {
            channels.push(NotificationChannel::Email);
        }
        if self.preferences.sms && self.phone.is_some() {
            channels.push(NotificationChannel::Sms);
        }
        if self.preferences.voice && self.phone.is_some() {
            channels.push(NotificationChannel::Voice);
        }
        channels
    }

    fn address_for(&self, channel: NotificationChannel) -> Option<&str> {
        match channel {
            NotificationChannel::Email => self.email.as_deref(),
            NotificationChannel::Sms | NotificationChannel::Voice => self.phone.as_deref(),
        }
    }
}

/// Links a notification back to the row that triggered it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kyc_application_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loan_application_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emi_id: Option<String>,
}

/// A single message ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub channel: NotificationChannel,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub provider: &'static str,
    pub provider_message_id: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DeliveryError {
    #[error("{provider} rejected the message ({status}): {body}")]
    Rejected {
        provider: &'static str,
        status: u16,
        body: String,
    },
    #[error("{provider} transport error: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },
    #[error("contact has no address for {0}")]
    MissingAddress(&'static str),
    #[error("notification log unavailable: {0}")]
    Log(String),
}

/// Provider integration for one channel.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    async fn deliver(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError>;
}

/// One row per attempted communication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient: String,
    pub channel: NotificationChannel,
    pub subject: String,
    pub message: String,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub context: NotificationContext,
    pub created_at: DateTime<Utc>,
}

/// Persistence for notification attempts.
pub trait NotificationLog: Send + Sync {
    fn record(&self, notification: Notification) -> Result<(), DeliveryError>;
    fn recent(&self, limit: usize) -> Result<Vec<Notification>, DeliveryError>;
}
