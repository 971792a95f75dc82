use axum::{
    extract::{Path, State},
    http::{header::ACCEPT_LANGUAGE, HeaderMap, StatusCode},
    middleware,
    response::Json,
    routing::{get, post},
    Extension, Router,
};
use axum_extra::{headers::UserAgent, TypedHeader};
use serde::Serialize;

use crate::api::AppState;
use crate::auth::{
    jwt_auth_middleware, optional_auth_middleware, AuthError, AuthResponse, CurrentUser,
    LoginRequest,
};
use crate::errors::{ApiResult, MessageResponse};
use crate::models::{
    ApiToken, DeleteAccountRequest, PersonalInformationRequest, PreferencesRequest,
    RegistrationRequest,
};
use crate::services::registration_service::{RegistrationContext, RegistrationOutcome};
use crate::services::user_service::{
    DeleteOutcome, PersonalInformation, PreferencesView, TrainerLoginOutcome, UserList,
    UserOverview,
};

/// Account routes, mounted under `/api/user`
pub fn user_routes(state: &AppState) -> Router<AppState> {
    let public = Router::new().route("/login", post(login));

    let optional = Router::new()
        .route("/logout", post(logout))
        .route("/registration", post(registration))
        .route("/guest", post(create_guest))
        .route_layer(middleware::from_fn_with_state(
            state.auth_service.clone(),
            optional_auth_middleware,
        ));

    let protected = Router::new()
        .route("/preferences", get(get_preferences).put(update_preferences))
        .route("/delete", post(delete_own_account))
        .route("/list", get(list_users))
        .route("/api-key", get(get_api_key).post(regenerate_api_key))
        .route("/:id/delete", post(delete_user))
        .route("/:id/activate", get(activate_user))
        .route("/:id/deactivate", get(deactivate_user))
        .route("/:id/edit", get(edit_form).put(edit_user))
        .route("/:id/overview", get(user_overview))
        .route("/:id/trainer-login", post(trainer_login))
        .merge(super::fitbit::fitbit_routes())
        .route_layer(middleware::from_fn_with_state(
            state.auth_service.clone(),
            jwt_auth_middleware,
        ));

    public.merge(optional).merge(protected)
}

fn accept_language(headers: &HeaderMap) -> Option<&str> {
    headers.get(ACCEPT_LANGUAGE).and_then(|v| v.to_str().ok())
}

/// Log in with username and password
#[tracing::instrument(skip(state, request))]
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthError> {
    let response = state.auth_service.login(request).await?;
    Ok(Json(response))
}

/// Log out; temporary users are deleted
#[tracing::instrument(skip(state, current_user))]
async fn logout(
    State(state): State<AppState>,
    current_user: Option<Extension<CurrentUser>>,
) -> ApiResult<Json<MessageResponse>> {
    match current_user {
        Some(Extension(user)) => Ok(Json(state.user_service.logout(&user).await?)),
        None => Ok(Json(
            MessageResponse::info("You are not logged in").redirect_to(crate::auth::LOGIN_URL),
        )),
    }
}

#[tracing::instrument(skip(state, current_user, headers, request))]
async fn registration(
    State(state): State<AppState>,
    current_user: Option<Extension<CurrentUser>>,
    user_agent: Option<TypedHeader<UserAgent>>,
    headers: HeaderMap,
    Json(request): Json<RegistrationRequest>,
) -> ApiResult<(StatusCode, Json<RegistrationOutcome>)> {
    let context = RegistrationContext {
        caller: current_user.as_ref().map(|Extension(user)| user),
        user_agent: user_agent.as_ref().map(|TypedHeader(ua)| ua.as_str()),
        accept_language: accept_language(&headers),
    };

    let outcome = state.registration_service.register(context, request).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

#[tracing::instrument(skip(state, current_user, headers))]
async fn create_guest(
    State(state): State<AppState>,
    current_user: Option<Extension<CurrentUser>>,
    headers: HeaderMap,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let context = RegistrationContext {
        caller: current_user.as_ref().map(|Extension(user)| user),
        user_agent: None,
        accept_language: accept_language(&headers),
    };

    let response = state.registration_service.create_guest(context).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[tracing::instrument(skip(state, current_user))]
async fn get_preferences(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> ApiResult<Json<PreferencesView>> {
    Ok(Json(state.user_service.preferences(&current_user).await?))
}

#[tracing::instrument(skip(state, current_user, request))]
async fn update_preferences(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(request): Json<PreferencesRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(
        state
            .user_service
            .update_preferences(&current_user, request)
            .await?,
    ))
}

/// Delete the caller's own account
#[tracing::instrument(skip(state, current_user, request))]
async fn delete_own_account(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Json(request): Json<DeleteAccountRequest>,
) -> ApiResult<Json<DeleteOutcome>> {
    let outcome = state
        .user_service
        .delete(&current_user, None, &request.password)
        .await?;
    Ok(Json(outcome))
}

/// Delete another account; a manager confirms with their own password
#[tracing::instrument(skip(state, current_user, request))]
async fn delete_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(request): Json<DeleteAccountRequest>,
) -> ApiResult<Json<DeleteOutcome>> {
    let outcome = state
        .user_service
        .delete(&current_user, Some(id), &request.password)
        .await?;
    Ok(Json(outcome))
}

#[tracing::instrument(skip(state, current_user))]
async fn activate_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.user_service.set_active(&current_user, id, true).await?))
}

#[tracing::instrument(skip(state, current_user))]
async fn deactivate_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.user_service.set_active(&current_user, id, false).await?))
}

#[tracing::instrument(skip(state, current_user))]
async fn edit_form(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PersonalInformation>> {
    Ok(Json(state.user_service.edit_form(&current_user, id).await?))
}

#[tracing::instrument(skip(state, current_user, request))]
async fn edit_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(request): Json<PersonalInformationRequest>,
) -> ApiResult<Json<MessageResponse>> {
    Ok(Json(state.user_service.edit(&current_user, id, request).await?))
}

#[tracing::instrument(skip(state, current_user))]
async fn user_overview(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<UserOverview>> {
    Ok(Json(state.user_service.overview(&current_user, id).await?))
}

#[tracing::instrument(skip(state, current_user))]
async fn trainer_login(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TrainerLoginOutcome>> {
    Ok(Json(state.user_service.trainer_login(&current_user, id).await?))
}

#[tracing::instrument(skip(state, current_user))]
async fn list_users(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> ApiResult<Json<UserList>> {
    Ok(Json(state.user_service.list(&current_user).await?))
}

#[derive(Debug, Serialize)]
struct ApiKeyResponse {
    token: Option<ApiToken>,
}

#[tracing::instrument(skip(state, current_user))]
async fn get_api_key(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> ApiResult<Json<ApiKeyResponse>> {
    let token = state.user_service.api_key(&current_user).await?;
    Ok(Json(ApiKeyResponse { token }))
}

#[tracing::instrument(skip(state, current_user))]
async fn regenerate_api_key(
    State(state): State<AppState>,
    Extension(current_user): Extension<CurrentUser>,
) -> ApiResult<(StatusCode, Json<ApiKeyResponse>)> {
    let token = state.user_service.regenerate_api_key(&current_user).await?;
    Ok((StatusCode::CREATED, Json(ApiKeyResponse { token: Some(token) })))
}
