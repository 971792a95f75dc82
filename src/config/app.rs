use anyhow::Result;
use std::env;

pub const DEFAULT_FITBIT_AUTHORIZE_URL: &str = "https://www.fitbit.com/oauth2/authorize";
pub const DEFAULT_FITBIT_API_BASE_URL: &str = "https://api.fitbit.com";
pub const DEFAULT_RECAPTCHA_VERIFY_URL: &str = "https://www.google.com/recaptcha/api/siteverify";

/// OAuth client settings for the Fitbit integration
#[derive(Debug, Clone)]
pub struct FitbitConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub authorize_url: String,
    pub api_base_url: String,
}

impl FitbitConfig {
    /// Client id and secret, if both are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some((id.as_str(), secret.as_str()))
            }
            _ => None,
        }
    }
}

impl Default for FitbitConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            authorize_url: DEFAULT_FITBIT_AUTHORIZE_URL.to_string(),
            api_base_url: DEFAULT_FITBIT_API_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub log_level: String,
    pub jwt_secret: String,
    pub token_lifetime_hours: i64,
    /// Public base URL, used to build OAuth redirect URIs
    pub site_url: String,
    pub default_language: String,
    pub allow_registration: bool,
    pub allow_guest_users: bool,
    pub use_recaptcha: bool,
    pub recaptcha_secret_key: Option<String>,
    pub recaptcha_verify_url: String,
    pub fitbit: FitbitConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            environment: "development".to_string(),
            log_level: "info".to_string(),
            jwt_secret: "your-secret-key-change-in-production".to_string(),
            token_lifetime_hours: 336,
            site_url: "http://localhost:8000".to_string(),
            default_language: "en".to_string(),
            allow_registration: true,
            allow_guest_users: true,
            use_recaptcha: false,
            recaptcha_secret_key: None,
            recaptcha_verify_url: DEFAULT_RECAPTCHA_VERIFY_URL.to_string(),
            fitbit: FitbitConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = AppConfig::default();

        let host = env::var("HOST").unwrap_or(defaults.host);
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);
        let environment = env::var("ENVIRONMENT").unwrap_or(defaults.environment);
        let log_level = env::var("LOG_LEVEL").unwrap_or(defaults.log_level);
        let jwt_secret = env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret);
        let token_lifetime_hours = env::var("TOKEN_LIFETIME_HOURS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.token_lifetime_hours);

        let site_url = env::var("SITE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.site_url);
        let default_language = env::var("DEFAULT_LANGUAGE").unwrap_or(defaults.default_language);

        let fitbit = FitbitConfig {
            client_id: non_empty_var("FITBIT_CLIENT_ID"),
            client_secret: non_empty_var("FITBIT_CLIENT_SECRET"),
            authorize_url: env::var("FITBIT_AUTHORIZE_URL")
                .unwrap_or(defaults.fitbit.authorize_url),
            api_base_url: env::var("FITBIT_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.fitbit.api_base_url),
        };

        Ok(AppConfig {
            host,
            port,
            environment,
            log_level,
            jwt_secret,
            token_lifetime_hours,
            site_url,
            default_language,
            allow_registration: flag_var("ALLOW_REGISTRATION", defaults.allow_registration),
            allow_guest_users: flag_var("ALLOW_GUEST_USERS", defaults.allow_guest_users),
            use_recaptcha: flag_var("USE_RECAPTCHA", defaults.use_recaptcha),
            recaptcha_secret_key: non_empty_var("RECAPTCHA_SECRET_KEY"),
            recaptcha_verify_url: env::var("RECAPTCHA_VERIFY_URL")
                .unwrap_or(defaults.recaptcha_verify_url),
            fitbit,
        })
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse a boolean flag, accepting true/false, 1/0 and yes/no
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn flag_var(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| parse_flag(&v))
        .unwrap_or(default)
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
