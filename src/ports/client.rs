//! Ports for the browser-side components.
//!
//! The client model is single-threaded and cooperative (one tab, one event
//! loop), so unlike the server-side ports these traits carry no `Send`
//! bounds. Hosts embedding the controller or agent implement them over the
//! actual platform APIs.

use crate::push_types::{NotificationPayload, Subscription};

/// The browser's answer to "may this origin show notifications?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    /// The user has never been asked.
    Unasked,
    Granted,
    Denied,
}

/// The platform push machinery: permission plus the active platform-level
/// subscription. The platform, not the controller, is the source of truth;
/// the controller only projects what it reads here.
pub trait PushPlatform {
    type Error: std::fmt::Display;
    type PermissionFut<'a>: Future<Output = PermissionState> + 'a
    where
        Self: 'a;
    type CurrentFut<'a>: Future<Output = Result<Option<Subscription>, Self::Error>> + 'a
    where
        Self: 'a;
    type CreateFut<'a>: Future<Output = Result<Subscription, Self::Error>> + 'a
    where
        Self: 'a;
    type CancelFut<'a>: Future<Output = Result<(), Self::Error>> + 'a
    where
        Self: 'a;

    fn is_supported(&self) -> bool;
    fn permission(&self) -> PermissionState;
    /// May suspend indefinitely while the user decides; there is no timeout.
    fn request_permission<'a>(&'a self) -> Self::PermissionFut<'a>;
    fn current_subscription<'a>(&'a self) -> Self::CurrentFut<'a>;
    fn create_subscription<'a>(&'a self, server_key: &'a str) -> Self::CreateFut<'a>;
    fn cancel_subscription<'a>(&'a self) -> Self::CancelFut<'a>;
}

/// Network client for the server-side subscription registry.
pub trait RegistryClient {
    type Error: std::fmt::Display;
    type KeyFut<'a>: Future<Output = Result<String, Self::Error>> + 'a
    where
        Self: 'a;
    type RegisterFut<'a>: Future<Output = Result<(), Self::Error>> + 'a
    where
        Self: 'a;
    type UnregisterFut<'a>: Future<Output = Result<(), Self::Error>> + 'a
    where
        Self: 'a;
    type IsRegisteredFut<'a>: Future<Output = Result<bool, Self::Error>> + 'a
    where
        Self: 'a;

    /// Fetches the server's VAPID public key for creating a platform
    /// subscription.
    fn server_key<'a>(&'a self) -> Self::KeyFut<'a>;
    fn register<'a>(&'a self, subscription: &'a Subscription) -> Self::RegisterFut<'a>;
    fn unregister<'a>(&'a self, endpoint: &'a str) -> Self::UnregisterFut<'a>;
    /// Whether the server registry holds a record of this endpoint.
    fn is_registered<'a>(&'a self, endpoint: &'a str) -> Self::IsRegisteredFut<'a>;
}

/// Cross-tab "state changed" signal. Fire-and-forget: peers react by
/// re-deriving their own state from the platform, no payload travels.
pub trait TabSync {
    fn broadcast(&self);
}

/// An open window/tab of this origin, as seen by the background agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowRef {
    pub id: u64,
    pub url: String,
}

/// Host surface for the background notification agent.
///
/// Each handler on the agent returns a future the host must await before the
/// agent may be torn down; these calls are the asynchronous pieces of that
/// contract.
pub trait AgentHost {
    type Error: std::fmt::Display;
    type ControlFut<'a>: Future<Output = ()> + 'a
    where
        Self: 'a;
    type ShowFut<'a>: Future<Output = Result<(), Self::Error>> + 'a
    where
        Self: 'a;
    type WindowsFut<'a>: Future<Output = Result<Vec<WindowRef>, Self::Error>> + 'a
    where
        Self: 'a;
    type FocusFut<'a>: Future<Output = Result<(), Self::Error>> + 'a
    where
        Self: 'a;
    type OpenFut<'a>: Future<Output = Result<(), Self::Error>> + 'a
    where
        Self: 'a;

    /// Promote this agent instance immediately, replacing any prior one
    /// without waiting for it to finish.
    fn skip_waiting<'a>(&'a self) -> Self::ControlFut<'a>;
    /// Take control of all currently open pages of this origin.
    fn claim_clients<'a>(&'a self) -> Self::ControlFut<'a>;
    fn show_notification<'a>(&'a self, payload: &'a NotificationPayload) -> Self::ShowFut<'a>;
    fn close_notification(&self);
    fn list_windows<'a>(&'a self) -> Self::WindowsFut<'a>;
    fn focus_window<'a>(&'a self, window: &'a WindowRef) -> Self::FocusFut<'a>;
    fn open_window<'a>(&'a self, url: &'a str) -> Self::OpenFut<'a>;
}
