use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::password::{
    generate_guest_username, hash_password, validate_password_strength, PasswordPolicy,
    UNUSABLE_PASSWORD,
};
use crate::auth::{AuthResponse, AuthService, CurrentUser};
use crate::config::AppConfig;
use crate::errors::{ApiError, ApiResult, FieldErrors, MessageResponse};
use crate::models::{CreateUser, RegistrationRequest, User};
use crate::store::{GymStore, StoreError};

pub const DASHBOARD_URL: &str = "/dashboard";

/// True for requests made from the Android app's web view
pub fn is_android_app(user_agent: Option<&str>) -> bool {
    user_agent.is_some_and(|ua| ua.contains("WgerAndroidWebApp"))
}

/// True for requests made from the Amazon app store wrapper
pub fn is_amazon_app(user_agent: Option<&str>) -> bool {
    user_agent.is_some_and(|ua| ua.contains("AmazonWebAppPlatform"))
}

/// Primary language subtag of the most preferred `Accept-Language` entry
pub fn preferred_language(accept_language: Option<&str>) -> Option<String> {
    let first = accept_language?.split(',').next()?;
    let tag = first.split(';').next()?.trim();
    let primary = tag.split(['-', '_']).next()?.trim().to_ascii_lowercase();

    if primary.is_empty() || primary == "*" {
        None
    } else {
        Some(primary)
    }
}

#[derive(Debug, Deserialize)]
struct RecaptchaResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

/// Server-side check of reCAPTCHA tokens
#[derive(Clone)]
pub struct RecaptchaVerifier {
    client: Client,
    secret: Option<String>,
    verify_url: String,
}

impl RecaptchaVerifier {
    pub fn new(secret: Option<String>, verify_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            secret,
            verify_url: verify_url.to_string(),
        })
    }

    pub async fn verify(&self, token: &str) -> Result<bool> {
        let secret = self
            .secret
            .as_deref()
            .context("RECAPTCHA_SECRET_KEY is not set")?;

        let response = self
            .client
            .post(&self.verify_url)
            .form(&[("secret", secret), ("response", token)])
            .send()
            .await
            .context("Failed to reach reCAPTCHA")?
            .json::<RecaptchaResponse>()
            .await
            .context("Failed to parse reCAPTCHA response")?;

        if !response.success {
            warn!(errors = ?response.error_codes, "captcha rejected");
        }

        Ok(response.success)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegistrationOutcome {
    #[serde(flatten)]
    pub auth: AuthResponse,
    #[serde(flatten)]
    pub message: MessageResponse,
}

/// Request details that influence how an account is created
#[derive(Debug, Clone, Copy, Default)]
pub struct RegistrationContext<'a> {
    pub caller: Option<&'a CurrentUser>,
    pub user_agent: Option<&'a str>,
    pub accept_language: Option<&'a str>,
}

/// New accounts: web sign-up, guests and users created through the API
#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn GymStore>,
    auth: AuthService,
    config: Arc<AppConfig>,
    recaptcha: RecaptchaVerifier,
}

impl RegistrationService {
    pub fn new(
        store: Arc<dyn GymStore>,
        auth: AuthService,
        config: Arc<AppConfig>,
        recaptcha: RecaptchaVerifier,
    ) -> Self {
        Self {
            store,
            auth,
            config,
            recaptcha,
        }
    }

    /// A captcha is required unless disabled or the request comes from an app
    pub fn requires_captcha(&self, user_agent: Option<&str>) -> bool {
        self.config.use_recaptcha && !is_android_app(user_agent) && !is_amazon_app(user_agent)
    }

    pub async fn register(
        &self,
        context: RegistrationContext<'_>,
        request: RegistrationRequest,
    ) -> ApiResult<RegistrationOutcome> {
        if !self.config.allow_registration {
            return Err(ApiError::RegistrationDisabled);
        }

        if let Some(caller) = context.caller {
            if !caller.profile.is_temporary {
                return Err(ApiError::Conflict {
                    message: "You are already registered".to_string(),
                    redirect_to: Some(DASHBOARD_URL.to_string()),
                });
            }
        }

        if self.requires_captcha(context.user_agent) {
            self.check_captcha(request.captcha.as_deref()).await?;
        }

        self.validate_registration(&request, true).await?;

        let user = self
            .create_account(&request, context.accept_language, None)
            .await?;
        self.store.record_login(user.id).await?;
        let auth = self.auth.issue_token(&user, None).await?;

        info!(user_id = user.id, "registered new user");

        Ok(RegistrationOutcome {
            auth,
            message: MessageResponse::success("You were successfully registered")
                .redirect_to(DASHBOARD_URL),
        })
    }

    /// Create a throwaway account that is removed again on logout
    pub async fn create_guest(&self, context: RegistrationContext<'_>) -> ApiResult<AuthResponse> {
        if !self.config.allow_guest_users {
            return Err(ApiError::Forbidden("Guest users are not allowed".to_string()));
        }

        if context.caller.is_some() {
            return Err(ApiError::Conflict {
                message: "You are already logged in".to_string(),
                redirect_to: Some(DASHBOARD_URL.to_string()),
            });
        }

        let language_id = self.language_for(context.accept_language).await?;
        let gym_id = self.default_gym().await?;

        let user = self
            .store
            .create_user(CreateUser {
                username: generate_guest_username(),
                email: String::new(),
                password_hash: UNUSABLE_PASSWORD.to_string(),
                is_temporary: true,
                gym_id,
                notification_language_id: language_id,
                created_by: None,
            })
            .await?;

        if let Some(gym_id) = gym_id {
            self.store.create_gym_user_config(gym_id, user.id).await?;
        }

        info!(user_id = user.id, "created temporary user");
        Ok(self.auth.issue_token(&user, None).await?)
    }

    /// Create a user on behalf of a trusted API consumer
    pub async fn register_via_api(
        &self,
        consumer: &CurrentUser,
        accept_language: Option<&str>,
        request: RegistrationRequest,
    ) -> ApiResult<User> {
        if !consumer.profile.can_use_api_create {
            return Err(ApiError::BadRequest("Bad Request".to_string()));
        }

        self.validate_registration(&request, false).await?;

        let user = self
            .create_account(&request, accept_language, Some(consumer.user.username.clone()))
            .await?;

        info!(user_id = user.id, created_by = %consumer.user.username, "created user via API");
        Ok(user)
    }

    async fn check_captcha(&self, token: Option<&str>) -> ApiResult<()> {
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::field("captcha", "This field is required."))?;

        if !self.recaptcha.verify(token).await? {
            return Err(ApiError::field("captcha", "Invalid captcha, please try again"));
        }

        Ok(())
    }

    /// Collect every field error, like a bound form would
    async fn validate_registration(
        &self,
        request: &RegistrationRequest,
        confirmation_required: bool,
    ) -> ApiResult<()> {
        let mut errors: FieldErrors = match request.validate() {
            Ok(()) => FieldErrors::new(),
            Err(e) => match ApiError::from(e) {
                ApiError::Validation(fields) => fields,
                other => return Err(other),
            },
        };

        let mut push = |field: &str, message: String| {
            errors.entry(field.to_string()).or_default().push(message);
        };

        match (&request.password2, confirmation_required) {
            (Some(confirmation), _) if confirmation != &request.password1 => {
                push("password2", "The two password fields didn't match.".to_string())
            }
            (None, true) => push("password2", "This field is required.".to_string()),
            _ => {}
        }

        if let Err(e) = validate_password_strength(&request.password1, &PasswordPolicy::default()) {
            push("password1", e.to_string());
        }

        if self.store.get_user_by_username(&request.username).await?.is_some() {
            push("username", "A user with that username already exists.".to_string());
        }

        if let Some(email) = request.email.as_deref().filter(|e| !e.trim().is_empty()) {
            if self.store.email_in_use(email.trim(), None).await? {
                push("email", "This email is already used.".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }

    async fn create_account(
        &self,
        request: &RegistrationRequest,
        accept_language: Option<&str>,
        created_by: Option<String>,
    ) -> ApiResult<User> {
        let password_hash = hash_password(&request.password1)
            .map_err(|e| ApiError::field("password1", e.to_string()))?;
        let language_id = self.language_for(accept_language).await?;
        let gym_id = self.default_gym().await?;

        let user = self
            .store
            .create_user(CreateUser {
                username: request.username.clone(),
                email: request
                    .email
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string(),
                password_hash,
                is_temporary: false,
                gym_id,
                notification_language_id: language_id,
                created_by,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => {
                    ApiError::field("username", "A user with that username already exists.")
                }
                other => ApiError::Store(other),
            })?;

        if let Some(gym_id) = gym_id {
            self.store.create_gym_user_config(gym_id, user.id).await?;
        }

        Ok(user)
    }

    /// Notification language from the request locale, else the site default
    async fn language_for(&self, accept_language: Option<&str>) -> ApiResult<Option<i64>> {
        if let Some(short_name) = preferred_language(accept_language) {
            if let Some(language) = self.store.get_language_by_short_name(&short_name).await? {
                return Ok(Some(language.id));
            }
        }

        Ok(self
            .store
            .get_language_by_short_name(&self.config.default_language)
            .await?
            .map(|language| language.id))
    }

    async fn default_gym(&self) -> ApiResult<Option<i64>> {
        match self.store.get_gym_config().await {
            Ok(config) => Ok(config.default_gym_id),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
