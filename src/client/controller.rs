use crate::ports::client::{PermissionState, PushPlatform, RegistryClient, TabSync};
use crate::push_types::Subscription;

/// Projection of the platform's permission and subscription status, plus one
/// derived fact: whether the server registry holds this endpoint. The
/// platform is the source of truth; this is re-derived, never inferred from
/// incidental reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    /// The platform has no push machinery at all.
    Unsupported,
    PermissionUnasked,
    /// Terminal until the user changes browser settings.
    PermissionDenied,
    /// Permission granted, no active subscription.
    Unsubscribed,
    /// A platform subscription exists but the server registry has no record
    /// of it, so this client must not claim to be subscribed. Reached when
    /// the registration network call fails; retryable.
    SubscribedUnregistered(Subscription),
    Subscribed(Subscription),
}

#[derive(Debug)]
pub enum SubscribeError {
    Unsupported,
    InvalidTransition(&'static str),
    PermissionDenied,
    Platform(String),
    Registration(String),
}

impl std::fmt::Display for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscribeError::Unsupported => f.write_str("push is not supported on this platform"),
            SubscribeError::InvalidTransition(reason) => f.write_str(reason),
            SubscribeError::PermissionDenied => f.write_str("notification permission was denied"),
            SubscribeError::Platform(err) => write!(f, "platform error: {err}"),
            SubscribeError::Registration(err) => write!(f, "registration failed: {err}"),
        }
    }
}

#[derive(Debug)]
pub enum UnsubscribeError {
    InvalidTransition(&'static str),
    Platform(String),
}

impl std::fmt::Display for UnsubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnsubscribeError::InvalidTransition(reason) => f.write_str(reason),
            UnsubscribeError::Platform(err) => write!(f, "platform error: {err}"),
        }
    }
}

/// Per-tab subscription state machine. Single-threaded and cooperative: the
/// suspension points are the permission prompt and the registry network
/// calls, with no timeout of its own.
pub struct SubscriptionController<P, R, T> {
    platform: P,
    registry: R,
    tabs: T,
    state: ClientState,
}

impl<P, R, T> SubscriptionController<P, R, T>
where
    P: PushPlatform,
    R: RegistryClient,
    T: TabSync,
{
    /// Builds the controller and derives the initial state from the platform.
    pub async fn start(platform: P, registry: R, tabs: T) -> Self {
        let mut controller = Self {
            platform,
            registry,
            tabs,
            state: ClientState::Unsupported,
        };
        controller.state = controller.derive_state().await;
        controller
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    /// Re-derives the state from the platform. Used at startup and whenever a
    /// peer tab signals a change; does not broadcast, since peers derive
    /// their own projections.
    pub async fn refresh(&mut self) -> &ClientState {
        self.state = self.derive_state().await;
        &self.state
    }

    pub async fn on_peer_change(&mut self) -> &ClientState {
        self.refresh().await
    }

    /// Drives the full subscribe transition: permission prompt if needed,
    /// platform subscription, then registration with the server. The state
    /// becomes `Subscribed` only once the server has the record; a failed
    /// registration leaves `SubscribedUnregistered`, from which `subscribe`
    /// retries the registration alone.
    pub async fn subscribe(&mut self) -> Result<&ClientState, SubscribeError> {
        let resumed = match &self.state {
            ClientState::PermissionUnasked | ClientState::Unsubscribed => None,
            ClientState::SubscribedUnregistered(subscription) => Some(subscription.clone()),
            ClientState::Unsupported => return Err(SubscribeError::Unsupported),
            ClientState::PermissionDenied => return Err(SubscribeError::PermissionDenied),
            ClientState::Subscribed(_) => {
                return Err(SubscribeError::InvalidTransition("already subscribed"));
            }
        };

        let subscription = match resumed {
            Some(subscription) => subscription,
            None => {
                if self.state == ClientState::PermissionUnasked {
                    match self.platform.request_permission().await {
                        PermissionState::Granted => self.set_state(ClientState::Unsubscribed),
                        PermissionState::Denied => {
                            self.set_state(ClientState::PermissionDenied);
                            return Err(SubscribeError::PermissionDenied);
                        }
                        // Prompt dismissed: the platform still reports
                        // unasked, so the user can be asked again.
                        PermissionState::Unasked => return Err(SubscribeError::PermissionDenied),
                    }
                }
                let server_key = self
                    .registry
                    .server_key()
                    .await
                    .map_err(|err| SubscribeError::Registration(err.to_string()))?;
                self.platform
                    .create_subscription(&server_key)
                    .await
                    .map_err(|err| SubscribeError::Platform(err.to_string()))?
            }
        };

        match self.registry.register(&subscription).await {
            Ok(()) => {
                self.set_state(ClientState::Subscribed(subscription));
                Ok(&self.state)
            }
            Err(err) => {
                let message = err.to_string();
                self.set_state(ClientState::SubscribedUnregistered(subscription));
                Err(SubscribeError::Registration(message))
            }
        }
    }

    /// Cancels the platform subscription and tells the server to drop the
    /// record. A failed cancel leaves the state unchanged and retryable; a
    /// failed server removal is only logged, since dispatch eviction cleans
    /// up dead endpoints eventually.
    pub async fn unsubscribe(&mut self) -> Result<&ClientState, UnsubscribeError> {
        let subscription = match &self.state {
            ClientState::Subscribed(subscription)
            | ClientState::SubscribedUnregistered(subscription) => subscription.clone(),
            _ => {
                return Err(UnsubscribeError::InvalidTransition(
                    "no active subscription to cancel",
                ));
            }
        };

        if let Err(err) = self.platform.cancel_subscription().await {
            return Err(UnsubscribeError::Platform(err.to_string()));
        }

        if let Err(err) = self.registry.unregister(&subscription.endpoint).await {
            eprintln!(
                "push client: failed to unregister {} ({err})",
                subscription.endpoint
            );
        }

        self.set_state(ClientState::Unsubscribed);
        Ok(&self.state)
    }

    async fn derive_state(&self) -> ClientState {
        if !self.platform.is_supported() {
            return ClientState::Unsupported;
        }
        match self.platform.permission() {
            PermissionState::Unasked => ClientState::PermissionUnasked,
            PermissionState::Denied => ClientState::PermissionDenied,
            PermissionState::Granted => match self.platform.current_subscription().await {
                Ok(Some(subscription)) => {
                    match self.registry.is_registered(&subscription.endpoint).await {
                        Ok(true) => ClientState::Subscribed(subscription),
                        Ok(false) => ClientState::SubscribedUnregistered(subscription),
                        Err(err) => {
                            // Cannot confirm registry membership, so do not
                            // claim it.
                            eprintln!("push client: could not confirm registration ({err})");
                            ClientState::SubscribedUnregistered(subscription)
                        }
                    }
                }
                Ok(None) => ClientState::Unsubscribed,
                Err(err) => {
                    eprintln!("push client: could not read platform subscription ({err})");
                    ClientState::Unsubscribed
                }
            },
        }
    }

    fn set_state(&mut self, next: ClientState) {
        if self.state != next {
            self.state = next;
            self.tabs.broadcast();
        }
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::push_types::SubscriptionKeys;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn subscription(endpoint: &str) -> Subscription {
        Subscription {
            endpoint: endpoint.to_string(),
            keys: SubscriptionKeys {
                p256dh: "p256".to_string(),
                auth: "auth".to_string(),
            },
        }
    }

    #[derive(Default)]
    struct PlatformInner {
        supported: bool,
        permission: Option<PermissionState>,
        prompt_answer: Option<PermissionState>,
        prompts: usize,
        subscription: Option<Subscription>,
        creates: usize,
        cancel_fails: bool,
    }

    #[derive(Clone, Default)]
    struct FakePlatform {
        inner: Rc<RefCell<PlatformInner>>,
    }

    impl FakePlatform {
        fn supported(permission: PermissionState) -> Self {
            let platform = Self::default();
            {
                let mut inner = platform.inner.borrow_mut();
                inner.supported = true;
                inner.permission = Some(permission);
            }
            platform
        }
    }

    impl PushPlatform for FakePlatform {
        type Error = String;
        type PermissionFut<'a>
            = std::future::Ready<PermissionState>
        where
            Self: 'a;
        type CurrentFut<'a>
            = std::future::Ready<Result<Option<Subscription>, String>>
        where
            Self: 'a;
        type CreateFut<'a>
            = std::future::Ready<Result<Subscription, String>>
        where
            Self: 'a;
        type CancelFut<'a>
            = std::future::Ready<Result<(), String>>
        where
            Self: 'a;

        fn is_supported(&self) -> bool {
            self.inner.borrow().supported
        }

        fn permission(&self) -> PermissionState {
            self.inner.borrow().permission.expect("permission set")
        }

        fn request_permission<'a>(&'a self) -> Self::PermissionFut<'a> {
            let mut inner = self.inner.borrow_mut();
            inner.prompts += 1;
            let answer = inner.prompt_answer.expect("prompt answer set");
            if answer != PermissionState::Unasked {
                inner.permission = Some(answer);
            }
            std::future::ready(answer)
        }

        fn current_subscription<'a>(&'a self) -> Self::CurrentFut<'a> {
            std::future::ready(Ok(self.inner.borrow().subscription.clone()))
        }

        fn create_subscription<'a>(&'a self, _server_key: &'a str) -> Self::CreateFut<'a> {
            let mut inner = self.inner.borrow_mut();
            inner.creates += 1;
            let created = subscription("https://push.example/fresh");
            inner.subscription = Some(created.clone());
            std::future::ready(Ok(created))
        }

        fn cancel_subscription<'a>(&'a self) -> Self::CancelFut<'a> {
            let mut inner = self.inner.borrow_mut();
            if inner.cancel_fails {
                return std::future::ready(Err("cancel failed".to_string()));
            }
            inner.subscription = None;
            std::future::ready(Ok(()))
        }
    }

    #[derive(Default)]
    struct RegistryInner {
        registered: Vec<String>,
        register_fails: bool,
        unregister_fails: bool,
    }

    #[derive(Clone, Default)]
    struct FakeRegistryClient {
        inner: Rc<RefCell<RegistryInner>>,
    }

    impl RegistryClient for FakeRegistryClient {
        type Error = String;
        type KeyFut<'a>
            = std::future::Ready<Result<String, String>>
        where
            Self: 'a;
        type RegisterFut<'a>
            = std::future::Ready<Result<(), String>>
        where
            Self: 'a;
        type UnregisterFut<'a>
            = std::future::Ready<Result<(), String>>
        where
            Self: 'a;
        type IsRegisteredFut<'a>
            = std::future::Ready<Result<bool, String>>
        where
            Self: 'a;

        fn server_key<'a>(&'a self) -> Self::KeyFut<'a> {
            std::future::ready(Ok("server-key".to_string()))
        }

        fn register<'a>(&'a self, subscription: &'a Subscription) -> Self::RegisterFut<'a> {
            let mut inner = self.inner.borrow_mut();
            if inner.register_fails {
                return std::future::ready(Err("network down".to_string()));
            }
            inner.registered.push(subscription.endpoint.clone());
            std::future::ready(Ok(()))
        }

        fn unregister<'a>(&'a self, endpoint: &'a str) -> Self::UnregisterFut<'a> {
            let mut inner = self.inner.borrow_mut();
            if inner.unregister_fails {
                return std::future::ready(Err("network down".to_string()));
            }
            inner.registered.retain(|e| e != endpoint);
            std::future::ready(Ok(()))
        }

        fn is_registered<'a>(&'a self, endpoint: &'a str) -> Self::IsRegisteredFut<'a> {
            let registered = self
                .inner
                .borrow()
                .registered
                .iter()
                .any(|e| e == endpoint);
            std::future::ready(Ok(registered))
        }
    }

    #[derive(Clone, Default)]
    struct FakeTabs {
        broadcasts: Rc<Cell<usize>>,
    }

    impl TabSync for FakeTabs {
        fn broadcast(&self) {
            self.broadcasts.set(self.broadcasts.get() + 1);
        }
    }

    async fn start_controller(
        platform: FakePlatform,
        registry: FakeRegistryClient,
        tabs: FakeTabs,
    ) -> SubscriptionController<FakePlatform, FakeRegistryClient, FakeTabs> {
        SubscriptionController::start(platform, registry, tabs).await
    }

    #[tokio::test]
    async fn start__should_report_unsupported_platform() {
        // Given
        let platform = FakePlatform::default();

        // When
        let controller =
            start_controller(platform, FakeRegistryClient::default(), FakeTabs::default()).await;

        // Then
        assert_eq!(*controller.state(), ClientState::Unsupported);
    }

    #[tokio::test]
    async fn start__should_derive_state_from_platform_permission() {
        // Given
        let platform = FakePlatform::supported(PermissionState::Unasked);

        // When
        let controller =
            start_controller(platform, FakeRegistryClient::default(), FakeTabs::default()).await;

        // Then
        assert_eq!(*controller.state(), ClientState::PermissionUnasked);
    }

    #[tokio::test]
    async fn start__should_only_claim_subscribed_when_server_has_the_record() {
        // Given a platform subscription unknown to the server
        let platform = FakePlatform::supported(PermissionState::Granted);
        platform.inner.borrow_mut().subscription = Some(subscription("https://push.example/old"));
        let registry = FakeRegistryClient::default();

        // When
        let controller = start_controller(platform, registry.clone(), FakeTabs::default()).await;

        // Then
        assert_eq!(
            *controller.state(),
            ClientState::SubscribedUnregistered(subscription("https://push.example/old"))
        );

        // And when the server does know the endpoint
        registry
            .inner
            .borrow_mut()
            .registered
            .push("https://push.example/old".to_string());
        let platform = FakePlatform::supported(PermissionState::Granted);
        platform.inner.borrow_mut().subscription = Some(subscription("https://push.example/old"));
        let controller = start_controller(platform, registry, FakeTabs::default()).await;

        // Then
        assert_eq!(
            *controller.state(),
            ClientState::Subscribed(subscription("https://push.example/old"))
        );
    }

    #[tokio::test]
    async fn subscribe__should_prompt_create_and_register() {
        // Given
        let platform = FakePlatform::supported(PermissionState::Unasked);
        platform.inner.borrow_mut().prompt_answer = Some(PermissionState::Granted);
        let registry = FakeRegistryClient::default();
        let tabs = FakeTabs::default();
        let mut controller = start_controller(platform.clone(), registry.clone(), tabs.clone()).await;

        // When
        controller.subscribe().await.expect("subscribe");

        // Then
        assert_eq!(
            *controller.state(),
            ClientState::Subscribed(subscription("https://push.example/fresh"))
        );
        assert_eq!(platform.inner.borrow().prompts, 1);
        assert_eq!(
            registry.inner.borrow().registered,
            vec!["https://push.example/fresh".to_string()]
        );
        // Grant and subscribe are two observable transitions.
        assert_eq!(tabs.broadcasts.get(), 2);
    }

    #[tokio::test]
    async fn subscribe__should_record_denial_as_terminal() {
        // Given
        let platform = FakePlatform::supported(PermissionState::Unasked);
        platform.inner.borrow_mut().prompt_answer = Some(PermissionState::Denied);
        let mut controller =
            start_controller(platform, FakeRegistryClient::default(), FakeTabs::default()).await;

        // When
        let result = controller.subscribe().await;

        // Then
        assert!(matches!(result, Err(SubscribeError::PermissionDenied)));
        assert_eq!(*controller.state(), ClientState::PermissionDenied);
    }

    #[tokio::test]
    async fn subscribe__should_stay_askable_when_prompt_is_dismissed() {
        // Given
        let platform = FakePlatform::supported(PermissionState::Unasked);
        platform.inner.borrow_mut().prompt_answer = Some(PermissionState::Unasked);
        let mut controller =
            start_controller(platform, FakeRegistryClient::default(), FakeTabs::default()).await;

        // When
        let result = controller.subscribe().await;

        // Then
        assert!(result.is_err());
        assert_eq!(*controller.state(), ClientState::PermissionUnasked);
    }

    #[tokio::test]
    async fn subscribe__should_not_claim_membership_when_registration_fails() {
        // Given
        let platform = FakePlatform::supported(PermissionState::Granted);
        let registry = FakeRegistryClient::default();
        registry.inner.borrow_mut().register_fails = true;
        let mut controller =
            start_controller(platform.clone(), registry.clone(), FakeTabs::default()).await;

        // When
        let result = controller.subscribe().await;

        // Then
        assert!(matches!(result, Err(SubscribeError::Registration(_))));
        assert_eq!(
            *controller.state(),
            ClientState::SubscribedUnregistered(subscription("https://push.example/fresh"))
        );
        // The platform-level subscription exists even though registration
        // failed.
        assert!(platform.inner.borrow().subscription.is_some());
    }

    #[tokio::test]
    async fn subscribe__should_retry_registration_without_a_second_platform_subscription() {
        // Given a controller stuck in SubscribedUnregistered
        let platform = FakePlatform::supported(PermissionState::Granted);
        let registry = FakeRegistryClient::default();
        registry.inner.borrow_mut().register_fails = true;
        let mut controller =
            start_controller(platform.clone(), registry.clone(), FakeTabs::default()).await;
        controller.subscribe().await.expect_err("registration fails");

        // When the network recovers
        registry.inner.borrow_mut().register_fails = false;
        controller.subscribe().await.expect("retry succeeds");

        // Then
        assert_eq!(
            *controller.state(),
            ClientState::Subscribed(subscription("https://push.example/fresh"))
        );
        assert_eq!(platform.inner.borrow().creates, 1);
    }

    #[tokio::test]
    async fn subscribe__should_reject_when_already_subscribed() {
        // Given
        let platform = FakePlatform::supported(PermissionState::Granted);
        let mut controller =
            start_controller(platform, FakeRegistryClient::default(), FakeTabs::default()).await;
        controller.subscribe().await.expect("subscribe");

        // When
        let result = controller.subscribe().await;

        // Then
        assert!(matches!(result, Err(SubscribeError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn unsubscribe__should_cancel_and_unregister() {
        // Given
        let platform = FakePlatform::supported(PermissionState::Granted);
        let registry = FakeRegistryClient::default();
        let mut controller =
            start_controller(platform.clone(), registry.clone(), FakeTabs::default()).await;
        controller.subscribe().await.expect("subscribe");

        // When
        controller.unsubscribe().await.expect("unsubscribe");

        // Then
        assert_eq!(*controller.state(), ClientState::Unsubscribed);
        assert!(platform.inner.borrow().subscription.is_none());
        assert!(registry.inner.borrow().registered.is_empty());
    }

    #[tokio::test]
    async fn unsubscribe__should_stay_retryable_when_cancel_fails() {
        // Given
        let platform = FakePlatform::supported(PermissionState::Granted);
        let mut controller =
            start_controller(platform.clone(), FakeRegistryClient::default(), FakeTabs::default()).await;
        controller.subscribe().await.expect("subscribe");
        platform.inner.borrow_mut().cancel_fails = true;

        // When
        let result = controller.unsubscribe().await;

        // Then
        assert!(matches!(result, Err(UnsubscribeError::Platform(_))));
        assert!(matches!(*controller.state(), ClientState::Subscribed(_)));

        // And it succeeds once the platform recovers
        platform.inner.borrow_mut().cancel_fails = false;
        controller.unsubscribe().await.expect("retry");
        assert_eq!(*controller.state(), ClientState::Unsubscribed);
    }

    #[tokio::test]
    async fn unsubscribe__should_complete_even_when_server_removal_fails() {
        // Given
        let platform = FakePlatform::supported(PermissionState::Granted);
        let registry = FakeRegistryClient::default();
        let mut controller =
            start_controller(platform, registry.clone(), FakeTabs::default()).await;
        controller.subscribe().await.expect("subscribe");
        registry.inner.borrow_mut().unregister_fails = true;

        // When
        controller.unsubscribe().await.expect("unsubscribe");

        // Then
        assert_eq!(*controller.state(), ClientState::Unsubscribed);
    }

    #[tokio::test]
    async fn unsubscribe__should_reject_without_an_active_subscription() {
        // Given
        let platform = FakePlatform::supported(PermissionState::Granted);
        let mut controller =
            start_controller(platform, FakeRegistryClient::default(), FakeTabs::default()).await;

        // When
        let result = controller.unsubscribe().await;

        // Then
        assert!(matches!(result, Err(UnsubscribeError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn on_peer_change__should_rederive_state_from_the_platform() {
        // Given a tab that started before any subscription existed
        let platform = FakePlatform::supported(PermissionState::Granted);
        let registry = FakeRegistryClient::default();
        let mut controller =
            start_controller(platform.clone(), registry.clone(), FakeTabs::default()).await;
        assert_eq!(*controller.state(), ClientState::Unsubscribed);

        // When another tab subscribes and signals
        platform.inner.borrow_mut().subscription =
            Some(subscription("https://push.example/peer"));
        registry
            .inner
            .borrow_mut()
            .registered
            .push("https://push.example/peer".to_string());
        controller.on_peer_change().await;

        // Then
        assert_eq!(
            *controller.state(),
            ClientState::Subscribed(subscription("https://push.example/peer"))
        );
    }
}
