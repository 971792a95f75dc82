//! Versioned REST endpoints under `/api/v2`.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    http::{header::ACCEPT_LANGUAGE, HeaderMap, StatusCode},
    middleware,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use serde_json::{json, Value};

use crate::api::AppState;
use crate::auth::{jwt_auth_middleware, CurrentUser};
use crate::errors::{ApiError, ApiResult};
use crate::models::{PreferencesRequest, RegistrationRequest, UserProfile};
use crate::services::reference_service::{ListQuery, Page};
use crate::services::ReferenceCollection;

pub fn rest_routes(state: &AppState) -> Router<AppState> {
    let reference = [
        ("/language", ReferenceCollection::Language),
        ("/daysofweek", ReferenceCollection::DaysOfWeek),
        ("/license", ReferenceCollection::License),
        ("/setting-repetitionunit", ReferenceCollection::RepetitionUnit),
        ("/setting-weightunit", ReferenceCollection::WeightUnit),
    ]
    .into_iter()
    .fold(Router::new(), |router, (path, collection)| {
        router.merge(reference_routes(path, collection))
    });

    let protected = Router::new()
        .route("/userprofile", get(list_profiles))
        .route(
            "/userprofile/:id",
            get(get_profile).put(update_profile).patch(update_profile),
        )
        .route("/userprofile/:id/username", get(profile_username))
        .route("/register", post(register))
        .route_layer(middleware::from_fn_with_state(
            state.auth_service.clone(),
            jwt_auth_middleware,
        ));

    reference.merge(protected)
}

fn reference_routes(path: &str, collection: ReferenceCollection) -> Router<AppState> {
    Router::new()
        .route(
            path,
            get(
                move |State(state): State<AppState>,
                      Query(params): Query<BTreeMap<String, String>>| async move {
                    state
                        .reference_service
                        .list(collection, &ListQuery::new(params))
                        .await
                        .map(Json)
                },
            ),
        )
        .route(
            &format!("{path}/:id"),
            get(
                move |State(state): State<AppState>, Path(id): Path<i64>| async move {
                    state.reference_service.detail(collection, id).await.map(Json)
                },
            ),
        )
}

/// The caller's profile, hidden as not found for any other id
async fn own_profile(state: &AppState, current_user: &CurrentUser, id: i64) -> ApiResult<UserProfile> {
    if current_user.profile.id != id {
        return Err(ApiError::NotFound);
    }

    state
        .store
        .get_profile(current_user.id())
        .await?
        .ok_or(ApiError::NotFound)
}

#[tracing::instrument(skip(state, current_user))]
async fn list_profiles(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> ApiResult<Json<Page<UserProfile>>> {
    let profiles: Vec<UserProfile> = state
        .store
        .get_profile(current_user.id())
        .await?
        .into_iter()
        .collect();

    Ok(Json(Page {
        count: profiles.len(),
        next: None,
        previous: None,
        results: profiles,
    }))
}

#[tracing::instrument(skip(state, current_user))]
async fn get_profile(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(own_profile(&state, &current_user, id).await?))
}

#[tracing::instrument(skip(state, current_user, request))]
async fn update_profile(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(request): Json<PreferencesRequest>,
) -> ApiResult<Json<UserProfile>> {
    own_profile(&state, &current_user, id).await?;

    let profile = state
        .user_service
        .update_own_profile(&current_user, request)
        .await?;
    Ok(Json(profile))
}

#[tracing::instrument(skip(state, current_user))]
async fn profile_username(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    own_profile(&state, &current_user, id).await?;
    Ok(Json(json!({ "username": current_user.user.username })))
}

/// Account creation for trusted API consumers
#[tracing::instrument(skip(state, current_user, headers, request))]
async fn register(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    headers: HeaderMap,
    Json(request): Json<RegistrationRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let accept_language = headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok());

    state
        .registration_service
        .register_via_api(&current_user, accept_language, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "detail": "User created successfully" })),
    ))
}

