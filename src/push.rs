use crate::adapters::WebPushSender;
use crate::config;
use crate::ports::SubscriptionStore;
use crate::push_types::{DispatchReport, NotificationPayload};

mod dispatcher;
pub(crate) mod registry;
pub(crate) mod vapid;

pub use dispatcher::{DEFAULT_FANOUT_LIMIT, DispatchError};
pub use registry::{RegistryError, SubscriptionRegistry};
pub(crate) use vapid::{VapidConfigStatus, load_vapid_config};

/// Fans one payload out to every registered subscription.
///
/// Refuses up front when the VAPID credentials are absent or the payload is
/// invalid; neither case attempts any delivery. Per-endpoint transport
/// failures never surface here, they are recorded in the report.
pub async fn dispatch<S: SubscriptionStore>(
    config: &config::AppConfig,
    registry: &SubscriptionRegistry<S>,
    payload: &NotificationPayload,
) -> Result<DispatchReport, DispatchError> {
    let vapid = match load_vapid_config(config) {
        VapidConfigStatus::Ready(vapid) => vapid,
        VapidConfigStatus::Incomplete => {
            eprintln!("push dispatch refused: incomplete VAPID configuration");
            return Err(DispatchError::NotConfigured);
        }
        VapidConfigStatus::Missing => {
            return Err(DispatchError::NotConfigured);
        }
    };

    dispatcher::validate_payload(payload)?;

    let sender = WebPushSender::new(vapid).map_err(|err| {
        eprintln!("push dispatch refused: failed to init web-push ({err})");
        DispatchError::NotConfigured
    })?;

    dispatcher::dispatch_with_sender(sender, registry, payload, config.push_fanout_limit).await
}
