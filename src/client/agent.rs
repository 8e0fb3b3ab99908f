use crate::ports::client::AgentHost;
use crate::push_types::{NotificationPayload, default_notification_url};

/// Background push receiver, independent of any page's lifetime.
///
/// Each `on_*` handler maps to one platform event and returns a future the
/// host must await before the agent may be torn down; that is the keep-alive
/// contract for the asynchronous notification and window work inside.
pub struct NotificationAgent<H> {
    host: H,
    fallback_title: String,
}

impl<H: AgentHost> NotificationAgent<H> {
    pub fn new(host: H, fallback_title: impl Into<String>) -> Self {
        Self {
            host,
            fallback_title: fallback_title.into(),
        }
    }

    /// Takes over immediately instead of waiting for a previous agent
    /// instance to wind down.
    pub async fn on_install(&self) {
        self.host.skip_waiting().await;
    }

    /// Takes control of pages that were already open when this agent
    /// activated, not only future ones.
    pub async fn on_activate(&self) {
        self.host.claim_clients().await;
    }

    /// Shows exactly one notification for the delivered payload. A missing
    /// or unparsable payload falls back to a default, trading fidelity for
    /// the guarantee that something visible appears.
    pub async fn on_push(&self, data: Option<&[u8]>) {
        let payload = match parse_payload(data) {
            Some(payload) => payload,
            None => {
                if data.is_some() {
                    eprintln!("push agent: unreadable payload, using fallback");
                }
                self.fallback_payload()
            }
        };
        if let Err(err) = self.host.show_notification(&payload).await {
            eprintln!("push agent: failed to show notification ({err})");
        }
    }

    /// Closes the notification and routes the click to the URL stored in it:
    /// focus a window already showing exactly that URL, otherwise open a new
    /// one. Window errors are logged, never propagated.
    pub async fn on_notification_click(&self, url: &str) {
        self.host.close_notification();
        let windows = match self.host.list_windows().await {
            Ok(windows) => windows,
            Err(err) => {
                eprintln!("push agent: failed to enumerate windows ({err})");
                return;
            }
        };
        if let Some(window) = windows.iter().find(|window| window.url == url) {
            if let Err(err) = self.host.focus_window(window).await {
                eprintln!("push agent: failed to focus window ({err})");
            }
            return;
        }
        if let Err(err) = self.host.open_window(url).await {
            eprintln!("push agent: failed to open window ({err})");
        }
    }

    fn fallback_payload(&self) -> NotificationPayload {
        NotificationPayload {
            title: self.fallback_title.clone(),
            body: "You have a new notification.".to_string(),
            url: default_notification_url(),
        }
    }
}

fn parse_payload(data: Option<&[u8]>) -> Option<NotificationPayload> {
    serde_json::from_slice(data?).ok()
}
