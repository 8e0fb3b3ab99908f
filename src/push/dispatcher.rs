use crate::ports::{PushSender, SubscriptionStore};
use crate::push::registry::{RegistryError, SubscriptionRegistry};
use crate::push_types::{DeliveryOutcome, DispatchReport, NotificationPayload};

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Fan-out cap when none is configured. Keeps a large registry from opening
/// an unbounded number of simultaneous transport requests.
pub const DEFAULT_FANOUT_LIMIT: usize = 32;

#[derive(Debug)]
pub enum DispatchError {
    NotConfigured,
    InvalidPayload(&'static str),
    Store(String),
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::NotConfigured => f.write_str("push transport is not configured"),
            DispatchError::InvalidPayload(reason) => f.write_str(reason),
            DispatchError::Store(err) => write!(f, "subscription store error: {err}"),
        }
    }
}

pub(crate) fn validate_payload(payload: &NotificationPayload) -> Result<(), DispatchError> {
    if payload.title.trim().is_empty() {
        return Err(DispatchError::InvalidPayload("title is required"));
    }
    if payload.body.trim().is_empty() {
        return Err(DispatchError::InvalidPayload("body is required"));
    }
    Ok(())
}

/// Delivers one payload to every subscription in the registry snapshot.
///
/// Sends run concurrently under `fanout_limit`; each is isolated, so one
/// endpoint's failure never cancels the others. Failures become recorded
/// outcomes rather than errors, and permanently-failed endpoints (push
/// service reported them gone) are evicted from the registry afterwards.
/// No retries happen here; that is the caller's policy.
pub(crate) async fn dispatch_with_sender<S, P>(
    sender: P,
    registry: &SubscriptionRegistry<S>,
    payload: &NotificationPayload,
    fanout_limit: usize,
) -> Result<DispatchReport, DispatchError>
where
    S: SubscriptionStore,
    P: PushSender,
{
    validate_payload(payload)?;

    let snapshot = registry.list().await.map_err(|err| match err {
        RegistryError::Store(err) => DispatchError::Store(err.to_string()),
        RegistryError::InvalidSubscription(reason) => DispatchError::Store(reason.to_string()),
    })?;

    let attempted = snapshot.len();
    let message: Arc<str> = Arc::from(payload.to_json());
    let semaphore = Arc::new(Semaphore::new(fanout_limit.max(1)));
    let mut tasks = JoinSet::new();
    for (index, subscription) in snapshot.iter().cloned().enumerate() {
        let sender = sender.clone();
        let semaphore = Arc::clone(&semaphore);
        let message = Arc::clone(&message);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("fan-out semaphore closed");
            let result = sender.send(&subscription, &message).await;
            (index, subscription.endpoint, result)
        });
    }

    let mut outcomes: Vec<Option<DeliveryOutcome>> = vec![None; attempted];
    let mut evict = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        let (index, endpoint, result) = match joined {
            Ok(task_result) => task_result,
            Err(err) => {
                eprintln!("push delivery task failed: {err}");
                continue;
            }
        };
        outcomes[index] = Some(match result {
            Ok(()) => DeliveryOutcome {
                endpoint,
                succeeded: true,
                error: None,
            },
            Err(failure) => {
                eprintln!("push delivery error: {failure} ({endpoint})");
                if failure.is_permanent() {
                    evict.push(endpoint.clone());
                }
                DeliveryOutcome {
                    endpoint,
                    succeeded: false,
                    error: Some(failure.to_string()),
                }
            }
        });
    }

    for endpoint in evict {
        match registry.remove(&endpoint).await {
            Ok(_) => eprintln!("push registry: evicted dead endpoint {endpoint}"),
            Err(err) => eprintln!("push registry: failed to evict {endpoint}: {err}"),
        }
    }

    let outcomes: Vec<DeliveryOutcome> = outcomes
        .into_iter()
        .enumerate()
        .map(|(index, outcome)| {
            outcome.unwrap_or_else(|| DeliveryOutcome {
                endpoint: snapshot[index].endpoint.clone(),
                succeeded: false,
                error: Some("delivery task failed".to_string()),
            })
        })
        .collect();
    let succeeded = outcomes.iter().filter(|outcome| outcome.succeeded).count();

    Ok(DispatchReport {
        attempted,
        succeeded,
        outcomes,
    })
}
