use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;

use crate::ports;
use crate::ports::push::SendFailure;
use crate::push_types::{Subscription, VapidConfig};

/// In-memory subscription store. Insertion order is preserved so `list`
/// snapshots are stable; a single mutex serializes `add`/`remove`/`list`.
#[derive(Clone, Default)]
pub struct MemorySubscriptionStore {
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
}

impl ports::SubscriptionStore for MemorySubscriptionStore {
    type Error = std::convert::Infallible;
    type AddFut<'a>
        = std::future::Ready<Result<bool, Self::Error>>
    where
        Self: 'a;
    type RemoveFut<'a>
        = std::future::Ready<Result<bool, Self::Error>>
    where
        Self: 'a;
    type ListFut<'a>
        = std::future::Ready<Result<Vec<Subscription>, Self::Error>>
    where
        Self: 'a;

    fn add<'a>(&'a self, subscription: Subscription) -> Self::AddFut<'a> {
        let mut guard = self.subscriptions.lock().expect("subscription store lock");
        if guard.iter().any(|s| s.endpoint == subscription.endpoint) {
            return std::future::ready(Ok(false));
        }
        guard.push(subscription);
        std::future::ready(Ok(true))
    }

    fn remove<'a>(&'a self, endpoint: &'a str) -> Self::RemoveFut<'a> {
        let mut guard = self.subscriptions.lock().expect("subscription store lock");
        let before = guard.len();
        guard.retain(|s| s.endpoint != endpoint);
        std::future::ready(Ok(guard.len() != before))
    }

    fn list<'a>(&'a self) -> Self::ListFut<'a> {
        let guard = self.subscriptions.lock().expect("subscription store lock");
        std::future::ready(Ok(guard.clone()))
    }
}

#[derive(Clone)]
pub struct WebPushSender {
    vapid: VapidConfig,
    client: Arc<web_push::WebPushClient>,
}

impl WebPushSender {
    pub fn new(vapid: VapidConfig) -> Result<Self, web_push::WebPushError> {
        let client = web_push::WebPushClient::new()?;
        Ok(Self {
            vapid,
            client: Arc::new(client),
        })
    }

    async fn deliver(
        &self,
        subscription_info: &web_push::SubscriptionInfo,
        message: &str,
    ) -> Result<(), web_push::WebPushError> {
        let mut builder = web_push::WebPushMessageBuilder::new(subscription_info)?;
        builder.set_payload(web_push::ContentEncoding::Aes128Gcm, message.as_bytes());
        let mut signature_builder = web_push::VapidSignatureBuilder::from_base64(
            &self.vapid.private_key,
            web_push::URL_SAFE_NO_PAD,
            subscription_info,
        )?;
        signature_builder.add_claim("sub", self.vapid.subject.as_str());
        builder.set_vapid_signature(signature_builder.build()?);
        self.client.send(builder.build()?).await?;
        Ok(())
    }
}

// 404/410-class responses mean the push service has discarded the endpoint;
// anything else may succeed on a later dispatch.
fn classify(err: &web_push::WebPushError) -> ports::FailureKind {
    match err {
        web_push::WebPushError::EndpointNotFound
        | web_push::WebPushError::EndpointNotValid
        | web_push::WebPushError::InvalidUri => ports::FailureKind::Permanent,
        _ => ports::FailureKind::Transient,
    }
}

impl ports::PushSender for WebPushSender {
    type Fut<'a>
        = Pin<Box<dyn Future<Output = Result<(), SendFailure>> + Send + 'a>>
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a Subscription, message: &'a str) -> Self::Fut<'a> {
        Box::pin(async move {
            let subscription_info = web_push::SubscriptionInfo::new(
                subscription.endpoint.clone(),
                subscription.keys.p256dh.clone(),
                subscription.keys.auth.clone(),
            );
            self.deliver(&subscription_info, message)
                .await
                .map_err(|err| SendFailure {
                    kind: classify(&err),
                    message: err.to_string(),
                })
        })
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::ports::SubscriptionStore;

    fn subscription(endpoint: &str) -> Subscription {
        Subscription {
            endpoint: endpoint.to_string(),
            keys: crate::push_types::SubscriptionKeys {
                p256dh: "p256".to_string(),
                auth: "auth".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn memory_store__should_ignore_duplicate_endpoints() {
        // Given
        let store = MemorySubscriptionStore::default();

        // When
        let first = store
            .add(subscription("https://push.example/a"))
            .await
            .expect("add");
        let second = store
            .add(subscription("https://push.example/a"))
            .await
            .expect("add");

        // Then
        assert!(first);
        assert!(!second);
        assert_eq!(store.list().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn memory_store__should_preserve_insertion_order() {
        // Given
        let store = MemorySubscriptionStore::default();
        store
            .add(subscription("https://push.example/a"))
            .await
            .expect("add");
        store
            .add(subscription("https://push.example/b"))
            .await
            .expect("add");

        // When
        let listed = store.list().await.expect("list");

        // Then
        let endpoints: Vec<&str> = listed.iter().map(|s| s.endpoint.as_str()).collect();
        assert_eq!(
            endpoints,
            vec!["https://push.example/a", "https://push.example/b"]
        );
    }

    #[tokio::test]
    async fn memory_store__should_treat_removal_of_absent_endpoint_as_noop() {
        // Given
        let store = MemorySubscriptionStore::default();

        // When
        let removed = store.remove("https://push.example/missing").await.expect("remove");

        // Then
        assert!(!removed);
    }

    #[test]
    fn classify__should_mark_gone_endpoints_permanent() {
        assert_eq!(
            classify(&web_push::WebPushError::EndpointNotFound),
            ports::FailureKind::Permanent
        );
        assert_eq!(
            classify(&web_push::WebPushError::EndpointNotValid),
            ports::FailureKind::Permanent
        );
        assert_eq!(
            classify(&web_push::WebPushError::Unauthorized),
            ports::FailureKind::Transient
        );
    }
}
