use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{User, UserProfile};

/// JWT token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,      // Subject (user ID)
    pub username: String,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,      // JWT ID (for revocation)
    /// Set while a trainer is logged in as one of their members
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trainer_identity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: usize,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_temporary: bool,
}

/// Token blacklist entry (for logout)
#[derive(Debug, Clone)]
pub struct TokenBlacklist {
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

/// How the caller authenticated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionKind {
    /// JWT access token; carries the id needed for revocation
    Token { jti: String, expires_at: DateTime<Utc> },
    /// Long-lived REST API key
    ApiKey,
}

/// User session information
#[derive(Debug, Clone)]
pub struct UserSession {
    pub user_id: i64,
    pub username: String,
    pub kind: SessionKind,
    pub trainer_identity: Option<i64>,
}

impl UserSession {
    pub fn from_claims(claims: &Claims) -> Result<Self, std::num::ParseIntError> {
        let expires_at = Utc
            .timestamp_opt(claims.exp as i64, 0)
            .single()
            .unwrap_or_else(Utc::now);

        Ok(Self {
            user_id: claims.sub.parse()?,
            username: claims.username.clone(),
            kind: SessionKind::Token {
                jti: claims.jti.clone(),
                expires_at,
            },
            trainer_identity: claims.trainer_identity,
        })
    }

    /// The blacklist entry that ends this session, if it can be revoked
    pub fn revocation(&self) -> Option<TokenBlacklist> {
        match &self.kind {
            SessionKind::Token { jti, expires_at } => Some(TokenBlacklist {
                jti: jti.clone(),
                expires_at: *expires_at,
            }),
            SessionKind::ApiKey => None,
        }
    }
}

/// The authenticated caller, resolved from the store on every request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub profile: UserProfile,
    pub session: UserSession,
}

impl CurrentUser {
    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn gym_id(&self) -> Option<i64> {
        self.profile.gym_id
    }
}
