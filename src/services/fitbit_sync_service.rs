use std::sync::Arc;

use chrono::{Local, NaiveDate};
use thiserror::Error;
use tracing::info;

use crate::errors::MessageResponse;
use crate::models::{
    CreateExercise, CreateIngredient, CreateLicense, CreateWeightEntry, ExerciseCategory,
    ExerciseStatus, License, User,
};
use crate::services::fitbit_api_client::{
    FitbitActivitiesResponse, FitbitActivityCategory, FitbitApiClient, FitbitFoodLogItem,
    FitbitProfileResponse,
};
use crate::store::{GymStore, StoreError};

pub const FITBIT_CATEGORY: &str = "Fitbit";
pub const APACHE_LICENSE_SHORT_NAME: &str = "Apache";
const APACHE_LICENSE_FULL_NAME: &str = "Apache License Version 2.0, January 2004";
const APACHE_LICENSE_URL: &str = "http://www.apache.org/licenses/LICENSE-2.0";
const SYNC_LANGUAGE: &str = "en";

pub const EXERCISE_OVERVIEW_URL: &str = "/exercise/overview";
pub const INGREDIENT_LIST_URL: &str = "/nutrition/ingredient/list";

pub fn weight_overview_url(username: &str) -> String {
    format!("/weight/{}/overview", urlencoding::encode(username))
}

/// Why a sync attempt failed. Duplicate rows are not failures.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Fitbit integration is not configured")]
    NotConfigured,
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),
    #[error("Could not fetch data from Fitbit: {0}")]
    ResourceFetchFailed(String),
    #[error("Could not read Fitbit data: {0}")]
    MappingFailed(String),
    #[error("Could not save synced data: {0}")]
    Persistence(#[from] StoreError),
}

/// The resource a sync call imports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    Weight,
    Activity,
    FoodLog,
}

impl SyncKind {
    /// Route the OAuth flow redirects back to
    pub fn route_path(&self) -> &'static str {
        match self {
            SyncKind::Weight => "/api/user/fitbit-weight",
            SyncKind::Activity => "/api/user/fitbit-activity",
            SyncKind::FoodLog => "/api/user/fitbit-ingredients",
        }
    }
}

#[derive(Clone)]
pub struct FitbitSyncService {
    client: FitbitApiClient,
    store: Arc<dyn GymStore>,
    site_url: String,
}

impl FitbitSyncService {
    pub fn new(client: FitbitApiClient, store: Arc<dyn GymStore>, site_url: &str) -> Self {
        Self {
            client,
            store,
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn redirect_uri(&self, kind: SyncKind) -> String {
        format!("{}{}", self.site_url, kind.route_path())
    }

    /// URL of the Fitbit consent page for this sync type
    pub fn authorization_url(&self, kind: SyncKind) -> Result<String, SyncError> {
        self.client.authorization_url(&self.redirect_uri(kind))
    }

    pub async fn sync(&self, kind: SyncKind, user: &User, code: &str) -> Result<MessageResponse, SyncError> {
        match kind {
            SyncKind::Weight => self.sync_weight(user, code).await,
            SyncKind::Activity => self.sync_activity(user, code).await,
            SyncKind::FoodLog => self.sync_food_log(user, code).await,
        }
    }

    /// Import today's body weight from the user's Fitbit profile
    pub async fn sync_weight(&self, user: &User, code: &str) -> Result<MessageResponse, SyncError> {
        let token = self
            .client
            .exchange_code_for_token(code, &self.redirect_uri(SyncKind::Weight))
            .await?;
        let profile = self.client.get_profile(&token).await?;
        let weight = weight_from_profile(&profile)?;

        let entry = CreateWeightEntry {
            user_id: user.id,
            date: today(),
            weight,
        };

        match self.store.create_weight_entry(entry).await {
            Ok(created) => {
                info!(user_id = user.id, entry_id = created.id, "synced Fitbit weight");
                Ok(MessageResponse::success("Successfully synced weight data.")
                    .redirect_to(weight_overview_url(&user.username)))
            }
            Err(StoreError::Conflict(_)) => Ok(MessageResponse::info("Already synced up for today.")
                .redirect_to(weight_overview_url(&user.username))),
            Err(err) => Err(SyncError::Persistence(err)),
        }
    }

    /// Create an exercise for the first Fitbit activity not known yet
    pub async fn sync_activity(&self, user: &User, code: &str) -> Result<MessageResponse, SyncError> {
        let token = self
            .client
            .exchange_code_for_token(code, &self.redirect_uri(SyncKind::Activity))
            .await?;
        let activities = self.client.get_activities(&token).await?;
        let names = activity_names(&activities);

        if names.is_empty() {
            return Ok(MessageResponse::info("Sorry no activity logged on Fitbit today")
                .redirect_to(EXERCISE_OVERVIEW_URL));
        }

        let category = self.ensure_fitbit_category().await?;

        for name in &names {
            let capitalized = smart_capitalize(name);
            if self.store.exercise_exists(&capitalized).await? {
                continue;
            }

            let language_id = self.sync_language_id().await?;
            let license = self.ensure_apache_license().await?;

            let exercise = self
                .store
                .create_exercise(CreateExercise {
                    name: capitalized.clone(),
                    name_original: name.clone(),
                    description: capitalized,
                    category_id: category.id,
                    language_id,
                    license_id: license.id,
                    license_author: Some(user.username.clone()),
                    status: if user.is_superuser {
                        ExerciseStatus::Accepted
                    } else {
                        ExerciseStatus::Pending
                    },
                })
                .await?;

            info!(user_id = user.id, exercise_id = exercise.id, "synced Fitbit activity");
            return Ok(MessageResponse::success("Successfully synced exercise data.")
                .redirect_to(EXERCISE_OVERVIEW_URL));
        }

        Ok(MessageResponse::info("Already synced up exercises for today.")
            .redirect_to(EXERCISE_OVERVIEW_URL))
    }

    /// Create ingredients for today's logged foods
    pub async fn sync_food_log(&self, user: &User, code: &str) -> Result<MessageResponse, SyncError> {
        let token = self
            .client
            .exchange_code_for_token(code, &self.redirect_uri(SyncKind::FoodLog))
            .await?;
        let food_log = self.client.get_food_log(&token, today()).await?;

        let foods = food_log.foods.unwrap_or_default();
        if foods.is_empty() {
            return Ok(MessageResponse::info("You have no food collections today.")
                .redirect_to(INGREDIENT_LIST_URL));
        }

        let language_id = self.sync_language_id().await?;
        let mut created = 0usize;
        let mut already_synced = 0usize;
        let mut unnamed = 0usize;

        for item in &foods {
            let Some(ingredient) = ingredient_from_food(item, user.id, language_id) else {
                unnamed += 1;
                continue;
            };

            if self.store.ingredient_exists(&ingredient.name).await? {
                already_synced += 1;
                continue;
            }

            self.store.create_ingredient(ingredient).await?;
            created += 1;
        }

        info!(user_id = user.id, created, already_synced, unnamed, "synced Fitbit food log");

        let mut message = if created > 0 {
            MessageResponse::success("Successfully synced your Food Logs")
        } else if already_synced > 0 {
            MessageResponse::info("Already synced up Ingredients for today.")
        } else {
            MessageResponse::info("Sorry no food logs on Fitbit today")
        };
        if unnamed > 0 {
            message = message.with_note(unnamed_food_note(unnamed));
        }

        Ok(message.redirect_to(INGREDIENT_LIST_URL))
    }

    async fn ensure_fitbit_category(&self) -> Result<ExerciseCategory, SyncError> {
        if let Some(category) = self.store.get_exercise_category_by_name(FITBIT_CATEGORY).await? {
            return Ok(category);
        }

        Ok(self.store.create_exercise_category(FITBIT_CATEGORY).await?)
    }

    async fn ensure_apache_license(&self) -> Result<License, SyncError> {
        if let Some(license) = self
            .store
            .get_license_by_short_name(APACHE_LICENSE_SHORT_NAME)
            .await?
        {
            return Ok(license);
        }

        let license = self
            .store
            .create_license(CreateLicense {
                full_name: APACHE_LICENSE_FULL_NAME.to_string(),
                short_name: APACHE_LICENSE_SHORT_NAME.to_string(),
                url: Some(APACHE_LICENSE_URL.to_string()),
            })
            .await?;

        Ok(license)
    }

    async fn sync_language_id(&self) -> Result<i64, SyncError> {
        self.store
            .get_language_by_short_name(SYNC_LANGUAGE)
            .await?
            .map(|language| language.id)
            .ok_or_else(|| SyncError::MappingFailed(format!("language '{SYNC_LANGUAGE}' is missing")))
    }
}

/// Note for food log items that could not be imported for lack of a name
pub fn unnamed_food_note(count: usize) -> String {
    if count == 1 {
        "Skipped 1 food log item without a name.".to_string()
    } else {
        format!("Skipped {count} food log items without a name.")
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Body weight from a profile payload
pub fn weight_from_profile(profile: &FitbitProfileResponse) -> Result<f64, SyncError> {
    match profile.user.weight {
        Some(weight) if weight.is_finite() && weight > 0.0 => Ok(weight),
        Some(weight) => Err(SyncError::MappingFailed(format!("invalid weight {weight}"))),
        None => Err(SyncError::MappingFailed("profile has no weight".to_string())),
    }
}

/// All activity names, category by category, sub-categories after their parent
pub fn activity_names(response: &FitbitActivitiesResponse) -> Vec<String> {
    fn collect(category: &FitbitActivityCategory, names: &mut Vec<String>) {
        names.extend(
            category
                .activities
                .iter()
                .filter_map(|activity| activity.name.as_deref())
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        );
        for sub in &category.sub_categories {
            collect(sub, names);
        }
    }

    let mut names = Vec::new();
    for category in &response.categories {
        collect(category, &mut names);
    }
    names
}

/// Map a food log item to an ingredient; items without a name are skipped
pub fn ingredient_from_food(item: &FitbitFoodLogItem, user_id: i64, language_id: i64) -> Option<CreateIngredient> {
    let name = item.name()?;
    let values = item.nutritional_values.clone().unwrap_or_default();

    Some(CreateIngredient {
        user_id: Some(user_id),
        language_id,
        name: name.to_string(),
        energy: values.calories.unwrap_or(0.0).round() as i32,
        protein: values.protein.unwrap_or(0.0),
        carbohydrates: values.carbs.unwrap_or(0.0),
        fat: values.fat.unwrap_or(0.0),
        fibres: values.fiber.unwrap_or(0.0),
        sodium: values.sodium.unwrap_or(0.0),
    })
}

/// Uppercase the first letter of every word longer than two characters
pub fn smart_capitalize(input: &str) -> String {
    input
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) if word.chars().count() > 2 && first != 'ß' => {
                    first.to_uppercase().chain(chars).collect()
                }
                _ => word.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
