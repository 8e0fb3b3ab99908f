use crate::push as push_service;
use crate::push::{DispatchError, RegistryError};
use crate::push_types::{DispatchReport, NotificationPayload, Subscription};
use crate::state;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;

#[derive(Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: &'static str,
}

#[derive(Serialize)]
pub(crate) struct StatusResponse {
    pub(crate) status: &'static str,
}

#[derive(Serialize)]
pub(crate) struct PublicKeyResponse {
    #[serde(rename = "publicKey")]
    pub(crate) public_key: String,
}

pub(crate) async fn push_public_key(
    State(state): State<state::AppState>,
) -> Result<Json<PublicKeyResponse>, (StatusCode, Json<ErrorResponse>)> {
    let vapid = match push_service::load_vapid_config(&state.config) {
        push_service::VapidConfigStatus::Ready(vapid) => vapid,
        push_service::VapidConfigStatus::Incomplete | push_service::VapidConfigStatus::Missing => {
            return Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: "Push notifications are not configured.",
                }),
            ));
        }
    };

    Ok(Json(PublicKeyResponse {
        public_key: vapid.public_key,
    }))
}

pub(crate) async fn push_subscribe(
    State(state): State<state::AppState>,
    Json(subscription): Json<Subscription>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state.registry.add(subscription).await {
        Ok(_inserted) => Ok(Json(StatusResponse {
            status: "subscribed",
        })),
        Err(RegistryError::InvalidSubscription(reason)) => {
            Err((StatusCode::BAD_REQUEST, Json(ErrorResponse { error: reason })))
        }
        Err(RegistryError::Store(err)) => {
            eprintln!("push subscribe error: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to store subscription.",
                }),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UnsubscribeRequest {
    pub(crate) endpoint: String,
}

pub(crate) async fn push_unsubscribe(
    State(state): State<state::AppState>,
    Json(request): Json<UnsubscribeRequest>,
) -> Result<Json<StatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    // Removing an unknown endpoint is a no-op, not an error.
    match state.registry.remove(&request.endpoint).await {
        Ok(_removed) => Ok(Json(StatusResponse {
            status: "unsubscribed",
        })),
        Err(err) => {
            eprintln!("push unsubscribe error: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to remove subscription.",
                }),
            ))
        }
    }
}

pub(crate) async fn push_notify(
    State(state): State<state::AppState>,
    Json(payload): Json<NotificationPayload>,
) -> Result<Json<DispatchReport>, (StatusCode, Json<ErrorResponse>)> {
    match push_service::dispatch(&state.config, &state.registry, &payload).await {
        Ok(report) => Ok(Json(report)),
        Err(DispatchError::NotConfigured) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse {
                error: "Push notifications are not configured.",
            }),
        )),
        Err(DispatchError::InvalidPayload(reason)) => {
            Err((StatusCode::BAD_REQUEST, Json(ErrorResponse { error: reason })))
        }
        Err(DispatchError::Store(err)) => {
            eprintln!("push notify error: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to read subscription registry.",
                }),
            ))
        }
    }
}

pub(crate) async fn push_registry_debug(
    State(state): State<state::AppState>,
) -> Result<Json<Vec<Subscription>>, (StatusCode, Json<ErrorResponse>)> {
    match state.registry.list().await {
        Ok(subscriptions) => Ok(Json(subscriptions)),
        Err(err) => {
            eprintln!("push registry debug error: {err}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Failed to read subscription registry.",
                }),
            ))
        }
    }
}
