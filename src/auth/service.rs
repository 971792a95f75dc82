use std::sync::Arc;

use crate::auth::password::verify_password;
use crate::auth::{
    parse_authorization, AuthError, AuthResponse, Credentials, CurrentUser, JwtService,
    LoginRequest, SessionKind, UserInfo, UserSession,
};
use crate::models::User;
use crate::store::GymStore;

#[derive(Clone)]
pub struct AuthService {
    jwt_service: JwtService,
    store: Arc<dyn GymStore>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("jwt_service", &self.jwt_service)
            .finish_non_exhaustive()
    }
}

impl AuthService {
    pub fn new(store: Arc<dyn GymStore>, jwt_secret: &str, token_lifetime_hours: i64) -> Self {
        Self {
            jwt_service: JwtService::new(jwt_secret, token_lifetime_hours),
            store,
        }
    }

    /// Log a user in with username and password
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AuthError> {
        let user = self
            .store
            .get_user_by_username(&request.username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&request.password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }

        self.store.record_login(user.id).await?;
        tracing::info!(user_id = user.id, "user logged in");

        self.issue_token(&user, None).await
    }

    /// Issue a fresh access token for `user`
    pub async fn issue_token(
        &self,
        user: &User,
        trainer_identity: Option<i64>,
    ) -> Result<AuthResponse, AuthError> {
        let is_temporary = self
            .store
            .get_profile(user.id)
            .await?
            .map(|profile| profile.is_temporary)
            .unwrap_or(false);

        let access_token = self
            .jwt_service
            .create_access_token(user.id, &user.username, trainer_identity)?;

        Ok(AuthResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt_service.access_token_expires_in_seconds(),
            user: UserInfo {
                id: user.id,
                username: user.username.clone(),
                email: user.email.clone(),
                is_temporary,
            },
        })
    }

    /// Blacklist the session's token. API key sessions have nothing to revoke.
    pub async fn revoke(&self, session: &UserSession) -> Result<(), AuthError> {
        if let Some(entry) = session.revocation() {
            self.store.blacklist_token(&entry.jti, entry.expires_at).await?;
        }

        Ok(())
    }

    /// Check a password against the stored hash of `user`
    pub fn check_password(&self, user: &User, password: &str) -> Result<bool, AuthError> {
        Ok(verify_password(password, &user.password_hash)?)
    }

    /// Resolve an `Authorization` header to the calling user
    pub async fn authenticate(&self, auth_header: &str) -> Result<CurrentUser, AuthError> {
        let (user, session) = match parse_authorization(auth_header)? {
            Credentials::Bearer(token) => {
                let session = self.validate_session(token).await?;
                let user = self
                    .store
                    .get_user(session.user_id)
                    .await?
                    .ok_or(AuthError::InvalidToken)?;
                (user, session)
            }
            Credentials::ApiKey(key) => {
                let user = self
                    .store
                    .get_user_by_api_token(key)
                    .await?
                    .ok_or(AuthError::InvalidToken)?;
                let session = UserSession {
                    user_id: user.id,
                    username: user.username.clone(),
                    kind: SessionKind::ApiKey,
                    trainer_identity: None,
                };
                (user, session)
            }
        };

        // Deactivated or deleted accounts lose their sessions immediately
        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }

        let profile = self
            .store
            .get_profile(user.id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        Ok(CurrentUser {
            user,
            profile,
            session,
        })
    }

    /// Validate user session from token
    pub async fn validate_session(&self, token: &str) -> Result<UserSession, AuthError> {
        let session = self.jwt_service.extract_user_session(token)?;

        if let SessionKind::Token { jti, .. } = &session.kind {
            if self.store.is_token_blacklisted(jti).await? {
                return Err(AuthError::TokenRevoked);
            }
        }

        Ok(session)
    }
}
