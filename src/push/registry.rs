use crate::ports::SubscriptionStore;
use crate::push_types::Subscription;

/// Validating front of the pluggable subscription store. Everything the rest
/// of the server does to subscriptions goes through here.
#[derive(Clone)]
pub struct SubscriptionRegistry<S> {
    store: S,
}

#[derive(Debug)]
pub enum RegistryError<E> {
    InvalidSubscription(&'static str),
    Store(E),
}

impl<E: std::fmt::Display> std::fmt::Display for RegistryError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::InvalidSubscription(reason) => f.write_str(reason),
            RegistryError::Store(err) => write!(f, "subscription store error: {err}"),
        }
    }
}

impl<S: SubscriptionStore> SubscriptionRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Inserts the subscription unless its endpoint is already registered.
    /// Re-adding an existing endpoint is a no-op, not an error; the returned
    /// bool answers whether anything was inserted.
    pub async fn add(&self, subscription: Subscription) -> Result<bool, RegistryError<S::Error>> {
        validate_endpoint(&subscription.endpoint)
            .map_err(RegistryError::InvalidSubscription)?;
        self.store
            .add(subscription)
            .await
            .map_err(RegistryError::Store)
    }

    /// Removes the endpoint if present; absence is not an error.
    pub async fn remove(&self, endpoint: &str) -> Result<bool, RegistryError<S::Error>> {
        self.store.remove(endpoint).await.map_err(RegistryError::Store)
    }

    /// Point-in-time snapshot in insertion order. Concurrent mutation never
    /// shows up mid-iteration; the snapshot may be stale by the time it is
    /// used, which dispatch tolerates.
    pub async fn list(&self) -> Result<Vec<Subscription>, RegistryError<S::Error>> {
        self.store.list().await.map_err(RegistryError::Store)
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), &'static str> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err("endpoint is required");
    }
    if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
        return Err("endpoint must be an http(s) URL");
    }
    Ok(())
}
