use crate::adapters::MemorySubscriptionStore;
use crate::config::AppConfig;
use crate::push::SubscriptionRegistry;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub registry: SubscriptionRegistry<MemorySubscriptionStore>,
}
