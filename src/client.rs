//! The browser-side half of the subsystem: a subscription controller that
//! runs in a page, and a background agent that receives pushes independently
//! of any page. Both are written against the ports in [`crate::ports::client`]
//! so hosts bind them to the actual platform.

pub mod agent;
pub mod controller;

pub use agent::NotificationAgent;
pub use controller::{ClientState, SubscribeError, SubscriptionController, UnsubscribeError};
