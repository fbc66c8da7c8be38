use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::{
    ContactDetails, DeliveryError, DeliveryStatus, MessageTransport, Notification,
    NotificationChannel, NotificationContext, NotificationLog, OutboundMessage,
};
use crate::workflows::IdSequence;

/// Outcome of fanning one message out over a contact's channels.
#[derive(Debug, Default)]
pub struct ContactDelivery {
    pub sent: Vec<Notification>,
    pub failures: Vec<(NotificationChannel, DeliveryError)>,
}

impl ContactDelivery {
    /// At least one channel was attempted and none of them delivered.
    pub fn undelivered(&self) -> bool {
        self.sent.is_empty() && !self.failures.is_empty()
    }
}

/// Routes messages to the transport for their channel and records the attempt.
pub struct NotificationDispatcher {
    email: Arc<dyn MessageTransport>,
    sms: Arc<dyn MessageTransport>,
    voice: Arc<dyn MessageTransport>,
    log: Arc<dyn NotificationLog>,
    ids: IdSequence,
}

impl NotificationDispatcher {
    pub fn new(
        email: Arc<dyn MessageTransport>,
        sms: Arc<dyn MessageTransport>,
        voice: Arc<dyn MessageTransport>,
        log: Arc<dyn NotificationLog>,
    ) -> Self {
        Self {
            email,
            sms,
            voice,
            log,
            ids: IdSequence::new("ntf"),
        }
    }

    fn transport(&self, channel: NotificationChannel) -> &Arc<dyn MessageTransport> {
        match channel {
            NotificationChannel::Email => &self.email,
            NotificationChannel::Sms => &self.sms,
            NotificationChannel::Voice => &self.voice,
        }
    }

    /// Deliver one message. The attempt is logged before a failure is returned.
    pub async fn send(
        &self,
        message: OutboundMessage,
        context: NotificationContext,
    ) -> Result<Notification, DeliveryError> {
        let result = self.transport(message.channel).deliver(&message).await;

        let (status, provider_message_id, error) = match &result {
            Ok(receipt) => (
                DeliveryStatus::Sent,
                Some(receipt.provider_message_id.clone()),
                None,
            ),
            Err(err) => (DeliveryStatus::Failed, None, Some(err.to_string())),
        };

        let notification = Notification {
            id: self.ids.next_id(),
            recipient: message.recipient,
            channel: message.channel,
            subject: message.subject,
            message: message.body,
            status,
            provider_message_id,
            error,
            context,
            created_at: Utc::now(),
        };
        self.log.record(notification.clone())?;

        match result {
            Ok(receipt) => {
                info!(
                    channel = notification.channel.label(),
                    provider = receipt.provider,
                    id = %notification.id,
                    "notification delivered"
                );
                Ok(notification)
            }
            Err(err) => Err(err),
        }
    }

    /// Fan out over every enabled channel. A failing channel does not stop
    /// the others.
    pub async fn notify_contact(
        &self,
        contact: &ContactDetails,
        subject: &str,
        body: &str,
        context: NotificationContext,
    ) -> ContactDelivery {
        let channels = contact.channels();
        if channels.is_empty() {
            warn!(contact = %contact.name, "no reachable notification channel");
        }

        let mut delivery = ContactDelivery::default();
        for channel in channels {
            let Some(recipient) = contact.address_for(channel) else {
                continue;
            };
            let message = OutboundMessage {
                channel,
                recipient: recipient.to_string(),
                subject: subject.to_string(),
                body: format!("Dear {}, {}", contact.name, body),
            };
            match self.send(message, context.clone()).await {
                Ok(notification) => delivery.sent.push(notification),
                Err(err) => {
                    warn!(channel = channel.label(), error = %err, "notification failed");
                    delivery.failures.push((channel, err));
                }
            }
        }
        delivery
    }
}
