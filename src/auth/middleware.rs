use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{AuthError, AuthService};

/// Require an authenticated caller and expose it as `Extension<CurrentUser>`
pub async fn jwt_auth_middleware(
    State(auth_service): State<AuthService>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;

    let current_user = auth_service.authenticate(auth_header).await?;

    request.extensions_mut().insert(current_user);

    Ok(next.run(request).await)
}

/// Attach the caller when the request carries valid credentials, otherwise
/// continue anonymously
pub async fn optional_auth_middleware(
    State(auth_service): State<AuthService>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .map(str::to_owned);

    if let Some(header) = auth_header {
        match auth_service.authenticate(&header).await {
            Ok(current_user) => {
                request.extensions_mut().insert(current_user);
            }
            Err(err @ (AuthError::Store(_) | AuthError::Internal(_))) => return Err(err),
            Err(err) => tracing::debug!(error = %err, "ignoring invalid credentials"),
        }
    }

    Ok(next.run(request).await)
}

/// CORS configuration for the API
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Security headers middleware
pub fn security_headers_layer() -> tower_http::set_header::SetResponseHeaderLayer<axum::http::HeaderValue> {
    tower_http::set_header::SetResponseHeaderLayer::overriding(
        axum::http::header::HeaderName::from_static("x-content-type-options"),
        axum::http::HeaderValue::from_static("nosniff"),
    )
}
