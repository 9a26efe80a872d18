//! Outbound SMS and topic notifications.
//!
//! Delivery is best effort. The `notify*` helpers log failures and never
//! return them; callers that care can use [`Notifier::send_sms`] and
//! [`Notifier::publish`] directly.

pub mod messages;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use bloodbridge_types::phone;

/// Single SMS segment.
pub const MAX_SMS_CHARS: usize = 160;

/// Returned instead of a gateway id when delivery is disabled.
pub const DEV_MODE_ID: &str = "DEV_MODE_MSG_ID";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway rejected message: {status} {body}")]
    Rejected { status: u16, body: String },
}

/// One message as handed to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Outbound {
    Sms {
        to: String,
        message: String,
        sender_id: String,
        sms_type: String,
    },
    Topic {
        topic: String,
        subject: String,
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub enabled: bool,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub sender_id: String,
    pub alerts_topic: Option<String>,
    pub emergency_topic: Option<String>,
    pub timeout: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_key: None,
            sender_id: "BloodBridge".into(),
            alerts_topic: None,
            emergency_topic: None,
            timeout: Duration::from_secs(10),
        }
    }
}

enum Transport {
    /// Delivery disabled: messages are only logged.
    Log,
    Http {
        client: reqwest::Client,
        endpoint: String,
        api_key: Option<String>,
    },
    /// Messages are kept in memory, newest last.
    Memory(Mutex<Vec<Outbound>>),
}

#[derive(Debug, Deserialize)]
struct GatewayReply {
    message_id: Option<String>,
}

/// Cheap to clone; all clones share one transport.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    transport: Transport,
    sender_id: String,
    alerts_topic: Option<String>,
    emergency_topic: Option<String>,
}

impl Notifier {
    /// Build from config. Delivery stays log-only unless it is enabled and an
    /// endpoint is set.
    pub fn new(config: NotifierConfig) -> Result<Self, NotifyError> {
        let transport = match (config.enabled, config.endpoint) {
            (true, Some(endpoint)) => {
                let client = reqwest::Client::builder().timeout(config.timeout).build()?;
                info!("SMS delivery via {}", endpoint);
                Transport::Http {
                    client,
                    endpoint,
                    api_key: config.api_key,
                }
            }
            (true, None) => {
                warn!("SMS enabled but no endpoint configured, messages will only be logged");
                Transport::Log
            }
            (false, _) => {
                info!("SMS delivery disabled, messages will only be logged");
                Transport::Log
            }
        };

        Ok(Self::with_transport(
            transport,
            config.sender_id,
            config.alerts_topic,
            config.emergency_topic,
        ))
    }

    pub fn disabled() -> Self {
        Self::with_transport(Transport::Log, "BloodBridge".into(), None, None)
    }

    /// Keeps every message in an outbox readable through [`Notifier::outbox`].
    pub fn in_memory() -> Self {
        Self::with_transport(
            Transport::Memory(Mutex::new(Vec::new())),
            "BloodBridge".into(),
            None,
            Some("bloodbridge-emergency".into()),
        )
    }

    fn with_transport(
        transport: Transport,
        sender_id: String,
        alerts_topic: Option<String>,
        emergency_topic: Option<String>,
    ) -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                transport,
                sender_id,
                alerts_topic,
                emergency_topic,
            }),
        }
    }

    /// Messages captured by the in-memory transport. Empty for the others.
    pub fn outbox(&self) -> Vec<Outbound> {
        match &self.inner.transport {
            Transport::Memory(outbox) => outbox.lock().map(|o| o.clone()).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Send one SMS. The number is converted to E.164 and the body truncated
    /// to [`MAX_SMS_CHARS`].
    pub async fn send_sms(&self, phone_number: &str, message: &str) -> Result<String, NotifyError> {
        let msg = Outbound::Sms {
            to: phone::to_e164(phone_number),
            message: truncate(message, MAX_SMS_CHARS),
            sender_id: self.inner.sender_id.clone(),
            sms_type: "Transactional".into(),
        };
        self.deliver(msg).await
    }

    /// Publish to a topic (fan-out is the gateway's job).
    pub async fn publish(&self, topic: &str, subject: &str, message: &str) -> Result<String, NotifyError> {
        let msg = Outbound::Topic {
            topic: topic.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
        };
        self.deliver(msg).await
    }

    async fn deliver(&self, msg: Outbound) -> Result<String, NotifyError> {
        match &self.inner.transport {
            Transport::Log => {
                match &msg {
                    Outbound::Sms { to, message, .. } => {
                        info!("[dev mode] SMS not sent to {}: {}", to, message)
                    }
                    Outbound::Topic { topic, subject, .. } => {
                        info!("[dev mode] topic {} not published: {}", topic, subject)
                    }
                }
                Ok(DEV_MODE_ID.to_string())
            }
            Transport::Memory(outbox) => {
                let mut outbox = outbox
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                outbox.push(msg);
                Ok(format!("mem-{}", outbox.len()))
            }
            Transport::Http {
                client,
                endpoint,
                api_key,
            } => {
                let mut req = client.post(endpoint).json(&msg);
                if let Some(key) = api_key {
                    req = req.bearer_auth(key);
                }
                let resp = req.send().await?;
                let status = resp.status();
                if !status.is_success() {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(NotifyError::Rejected {
                        status: status.as_u16(),
                        body,
                    });
                }
                let id = resp
                    .json::<GatewayReply>()
                    .await
                    .ok()
                    .and_then(|r| r.message_id)
                    .unwrap_or_else(|| "unknown".into());
                debug!("Gateway accepted message {}", id);
                Ok(id)
            }
        }
    }

    /// Send one SMS, logging instead of returning failures.
    pub async fn notify(&self, phone_number: &str, message: &str) -> bool {
        match self.send_sms(phone_number, message).await {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to send SMS to {}: {}", phone_number, e);
                false
            }
        }
    }

    /// Send the same SMS to many numbers concurrently. Returns (sent, failed).
    pub async fn notify_many(&self, phones: &[String], message: &str) -> (usize, usize) {
        let results = join_all(phones.iter().map(|p| self.notify(p, message))).await;
        let sent = results.iter().filter(|ok| **ok).count();
        let failed = results.len() - sent;
        if !phones.is_empty() {
            info!("Batch notification: {} sent, {} failed", sent, failed);
        }
        (sent, failed)
    }

    /// Publish to the emergency topic when one is configured.
    pub async fn broadcast_emergency(&self, subject: &str, message: &str) -> bool {
        let Some(topic) = self.inner.emergency_topic.as_deref() else {
            return false;
        };
        match self.publish(topic, subject, message).await {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to broadcast emergency: {}", e);
                false
            }
        }
    }

    /// Publish to the general alerts topic when one is configured.
    pub async fn alert(&self, subject: &str, message: &str) -> bool {
        let Some(topic) = self.inner.alerts_topic.as_deref() else {
            return false;
        };
        match self.publish(topic, subject, message).await {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to send alert: {}", e);
                false
            }
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_transport_records_e164_and_truncates() {
        let notifier = Notifier::in_memory();
        let long = "x".repeat(300);
        notifier.notify("98765 43210", &long).await;

        let outbox = notifier.outbox();
        assert_eq!(outbox.len(), 1);
        match &outbox[0] {
            Outbound::Sms { to, message, sender_id, .. } => {
                assert_eq!(to, "+919876543210");
                assert_eq!(message.chars().count(), MAX_SMS_CHARS);
                assert_eq!(sender_id, "BloodBridge");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn disabled_transport_reports_dev_id() {
        let notifier = Notifier::disabled();
        let id = notifier.send_sms("+15551234567", "hello").await.unwrap();
        assert_eq!(id, DEV_MODE_ID);
        assert!(notifier.outbox().is_empty());
        assert!(!notifier.broadcast_emergency("s", "m").await);
    }

    #[tokio::test]
    async fn unreachable_gateway_is_swallowed() {
        let notifier = Notifier::new(NotifierConfig {
            enabled: true,
            endpoint: Some("http://127.0.0.1:9/sms".into()),
            timeout: Duration::from_secs(2),
            ..NotifierConfig::default()
        })
        .unwrap();

        assert!(notifier.send_sms("9876543210", "hi").await.is_err());
        let phones = vec!["9876543210".to_string(), "9876543211".to_string()];
        assert_eq!(notifier.notify_many(&phones, "hi").await, (0, 2));
    }

    #[tokio::test]
    async fn emergency_topic_publish() {
        let notifier = Notifier::in_memory();
        assert!(notifier.broadcast_emergency("🆘 EMERGENCY", "O- needed").await);
        assert!(!notifier.alert("subject", "body").await);
        assert!(matches!(
            &notifier.outbox()[0],
            Outbound::Topic { topic, .. } if topic == "bloodbridge-emergency"
        ));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate("🩸🩸🩸", 2), "🩸🩸");
        assert_eq!(truncate("short", 160), "short");
    }
}
