use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use std::time::Duration;
use tracing::{error, info};

use crate::config::FitbitConfig;
use crate::services::fitbit_sync_service::SyncError;

/// Scopes requested during authorisation
pub const FITBIT_SCOPE: &str = "activity heartrate location nutrition profile settings sleep social weight";

/// Fitbit Web API client
///
/// Covers the OAuth 2.0 authorization-code flow and the three resources the
/// sync imports: the user profile (weight), the activity list and the food
/// log of a given day. One attempt per call, no retries.
#[derive(Clone)]
pub struct FitbitApiClient {
    client: Client,
    config: FitbitConfig,
}

impl std::fmt::Debug for FitbitApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FitbitApiClient")
            .field("client_id", &self.config.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("api_base_url", &self.config.api_base_url)
            .finish()
    }
}

impl FitbitApiClient {
    pub fn new(config: FitbitConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.credentials().is_some()
    }

    /// Authorisation URL the user visits to grant access, forcing a fresh login
    pub fn authorization_url(&self, redirect_uri: &str) -> Result<String, SyncError> {
        let (client_id, _) = self.config.credentials().ok_or(SyncError::NotConfigured)?;

        Ok(format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&prompt=login",
            self.config.authorize_url,
            urlencoding::encode(client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(FITBIT_SCOPE),
        ))
    }

    /// Exchange authorization code for an access token
    pub async fn exchange_code_for_token(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<FitbitTokenResponse, SyncError> {
        let (client_id, client_secret) =
            self.config.credentials().ok_or(SyncError::NotConfigured)?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", client_id),
        ];

        let response = self
            .client
            .post(format!("{}/oauth2/token", self.config.api_base_url))
            .basic_auth(client_id, Some(client_secret))
            .form(&params)
            .send()
            .await
            .map_err(|e| SyncError::TokenExchangeFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Fitbit token exchange failed: {} - {}", status, error_text);
            return Err(SyncError::TokenExchangeFailed(format!(
                "token endpoint returned {status}"
            )));
        }

        let token = response
            .json::<FitbitTokenResponse>()
            .await
            .map_err(|e| SyncError::TokenExchangeFailed(format!("unreadable token response: {e}")))?;

        if token.access_token.as_deref().map_or(true, str::is_empty) {
            return Err(SyncError::TokenExchangeFailed(
                "no access token in response".to_string(),
            ));
        }

        info!(fitbit_user = ?token.user_id, "exchanged Fitbit authorization code");
        Ok(token)
    }

    /// Fetch the profile of the token's owner
    pub async fn get_profile(&self, token: &FitbitTokenResponse) -> Result<FitbitProfileResponse, SyncError> {
        self.get_json(token, "/1/user/-/profile.json").await
    }

    /// Fetch the catalogue of activities
    pub async fn get_activities(&self, token: &FitbitTokenResponse) -> Result<FitbitActivitiesResponse, SyncError> {
        self.get_json(token, "/1/activities.json").await
    }

    /// Fetch the foods logged on `date`
    pub async fn get_food_log(
        &self,
        token: &FitbitTokenResponse,
        date: NaiveDate,
    ) -> Result<FitbitFoodLogResponse, SyncError> {
        let path = format!("/1/user/-/foods/log/date/{}.json", date.format("%Y-%m-%d"));
        self.get_json(token, &path).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &FitbitTokenResponse,
        path: &str,
    ) -> Result<T, SyncError> {
        let access_token = token.access_token.as_deref().unwrap_or_default();
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .header("Accept-Language", "en_GB")
            .send()
            .await
            .map_err(|e| SyncError::ResourceFetchFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Fitbit request to {} failed: {} - {}", path, status, error_text);
            return Err(SyncError::ResourceFetchFailed(format!("{path} returned {status}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SyncError::MappingFailed(format!("unexpected payload from {path}: {e}")))
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct FitbitTokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub token_type: Option<String>,
    pub user_id: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FitbitProfileResponse {
    pub user: FitbitUserProfile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitbitUserProfile {
    pub weight: Option<f64>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FitbitActivitiesResponse {
    #[serde(default)]
    pub categories: Vec<FitbitActivityCategory>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitbitActivityCategory {
    pub name: Option<String>,
    #[serde(default)]
    pub activities: Vec<FitbitActivity>,
    #[serde(default)]
    pub sub_categories: Vec<FitbitActivityCategory>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FitbitActivity {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FitbitFoodLogResponse {
    pub foods: Option<Vec<FitbitFoodLogItem>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitbitFoodLogItem {
    pub logged_food: Option<FitbitLoggedFood>,
    pub nutritional_values: Option<FitbitNutritionalValues>,
}

impl FitbitFoodLogItem {
    /// The logged food's name, if present and not blank
    pub fn name(&self) -> Option<&str> {
        self.logged_food
            .as_ref()
            .and_then(|food| food.name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FitbitLoggedFood {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FitbitNutritionalValues {
    pub calories: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub protein: Option<f64>,
    pub sodium: Option<f64>,
}
