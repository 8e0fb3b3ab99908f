use serde::{Deserialize, Serialize};

/// One recipient browser's push registration, keyed by its endpoint URL.
///
/// The wire shape matches the PushSubscription JSON browsers produce:
/// `{"endpoint": "...", "keys": {"p256dh": "...", "auth": "..."}}`. The key
/// material is opaque here; it is forwarded verbatim to the push transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// The message delivered to every registered endpoint. Immutable once built;
/// one payload fans out to N subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    #[serde(default = "default_notification_url")]
    pub url: String,
}

pub(crate) fn default_notification_url() -> String {
    "/".to_string()
}

impl NotificationPayload {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("notification payload serializes")
    }
}

/// Result of one delivery attempt. Aggregated per dispatch, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub endpoint: String,
    pub succeeded: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub outcomes: Vec<DeliveryOutcome>,
}

#[derive(Debug, Clone)]
pub struct VapidConfig {
    pub private_key: String,
    pub public_key: String,
    pub subject: String,
}
