use crate::adapters::MemorySubscriptionStore;
use crate::config;
use crate::push::SubscriptionRegistry;
use crate::state;

use axum::Router;
use axum::routing::get;
use axum::routing::post;

mod push;

pub fn app(config: config::AppConfig) -> Router {
    let registry = SubscriptionRegistry::new(MemorySubscriptionStore::default());
    let state = state::AppState { config, registry };
    Router::new()
        .route("/api/push/subscribe", post(push::push_subscribe))
        .route("/api/push/unsubscribe", post(push::push_unsubscribe))
        .route("/api/push/notify", post(push::push_notify))
        .route("/api/push/public-key", get(push::push_public_key))
        .route("/api/debug/push/registry", get(push::push_registry_debug))
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn health() -> &'static str {
    "ok"
}
