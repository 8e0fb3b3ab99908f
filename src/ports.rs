pub mod client;
pub mod push;
pub mod store;

pub use client::{AgentHost, PermissionState, PushPlatform, RegistryClient, TabSync, WindowRef};
pub use push::{FailureKind, PushSender, SendFailure};
pub use store::SubscriptionStore;
