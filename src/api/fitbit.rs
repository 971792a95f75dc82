use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::AppState;
use crate::auth::CurrentUser;
use crate::errors::MessageResponse;
use crate::services::{FitbitSyncService, SyncError, SyncKind};

/// Fitbit sync routes; merged into the authenticated `/api/user` router
pub fn fitbit_routes() -> Router<AppState> {
    Router::new()
        .route("/fitbit-weight", get(sync_weight))
        .route("/fitbit-activity", get(sync_activity))
        .route("/fitbit-ingredients", get(sync_ingredients))
}

#[derive(Debug, Deserialize)]
pub struct FitbitQuery {
    pub code: Option<String>,
}

/// Either the authorisation link, the sync result, or both when a sync failed
#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fitbit_url: Option<String>,
    #[serde(flatten)]
    pub message: Option<MessageResponse>,
}

impl ConnectResponse {
    fn connect(service: &FitbitSyncService, kind: SyncKind) -> Self {
        match service.authorization_url(kind) {
            Ok(url) => Self {
                fitbit_url: Some(url),
                message: None,
            },
            Err(err) => Self::failed(None, &err),
        }
    }

    fn failed(fitbit_url: Option<String>, err: &SyncError) -> Self {
        Self {
            fitbit_url,
            message: Some(MessageResponse::warning(err.to_string())),
        }
    }
}

async fn handle_sync(
    service: &FitbitSyncService,
    kind: SyncKind,
    current_user: &CurrentUser,
    code: Option<&str>,
) -> ConnectResponse {
    let Some(code) = code.filter(|c| !c.is_empty()) else {
        return ConnectResponse::connect(service, kind);
    };

    match service.sync(kind, &current_user.user, code).await {
        Ok(message) => ConnectResponse {
            fitbit_url: None,
            message: Some(message),
        },
        Err(err) => {
            warn!(user_id = current_user.id(), ?kind, error = %err, "fitbit sync failed");
            ConnectResponse::failed(service.authorization_url(kind).ok(), &err)
        }
    }
}

#[tracing::instrument(skip(state, current_user, query))]
async fn sync_weight(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<FitbitQuery>,
) -> Json<ConnectResponse> {
    Json(handle_sync(&state.fitbit_sync, SyncKind::Weight, &current_user, query.code.as_deref()).await)
}

#[tracing::instrument(skip(state, current_user, query))]
async fn sync_activity(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<FitbitQuery>,
) -> Json<ConnectResponse> {
    Json(handle_sync(&state.fitbit_sync, SyncKind::Activity, &current_user, query.code.as_deref()).await)
}

#[tracing::instrument(skip(state, current_user, query))]
async fn sync_ingredients(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Query(query): Query<FitbitQuery>,
) -> Json<ConnectResponse> {
    Json(handle_sync(&state.fitbit_sync, SyncKind::FoodLog, &current_user, query.code.as_deref()).await)
}
