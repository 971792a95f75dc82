//! Persistence layer.
//!
//! Every service talks to the database through [`GymStore`], so the HTTP
//! layer and the Fitbit sync can run against PostgreSQL in production and an
//! in-memory store in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::*;

pub mod postgres;

pub use postgres::PgGymStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,
    #[error("Unique constraint violated: {0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait GymStore: Send + Sync {
    // Users and profiles

    /// Insert a user and its profile atomically
    async fn create_user(&self, user: CreateUser) -> StoreResult<User>;

    async fn get_user(&self, user_id: i64) -> StoreResult<Option<User>>;

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// True if any user other than `exclude_user_id` uses this email
    async fn email_in_use(&self, email: &str, exclude_user_id: Option<i64>) -> StoreResult<bool>;

    async fn set_user_active(&self, user_id: i64, is_active: bool) -> StoreResult<()>;

    async fn update_personal_information(
        &self,
        user_id: i64,
        update: &UpdatePersonalInformation,
    ) -> StoreResult<User>;

    async fn record_login(&self, user_id: i64) -> StoreResult<()>;

    /// Delete the user; the profile and owned rows go with it
    async fn delete_user(&self, user_id: i64) -> StoreResult<bool>;

    async fn list_users(&self, is_active: bool) -> StoreResult<Vec<UserSummary>>;

    async fn get_profile(&self, user_id: i64) -> StoreResult<Option<UserProfile>>;

    async fn get_profile_by_id(&self, profile_id: i64) -> StoreResult<Option<UserProfile>>;

    async fn update_profile(&self, profile: &UserProfile) -> StoreResult<()>;

    async fn list_profiles_created_by(&self, username: &str) -> StoreResult<Vec<User>>;

    // Gyms

    async fn get_gym_config(&self) -> StoreResult<GymConfig>;

    async fn create_gym_user_config(&self, gym_id: i64, user_id: i64) -> StoreResult<GymUserConfig>;

    // API tokens and revoked sessions

    async fn get_api_token(&self, user_id: i64) -> StoreResult<Option<ApiToken>>;

    /// Drop any existing key for the user and store the new one
    async fn replace_api_token(&self, user_id: i64, key: &str) -> StoreResult<ApiToken>;

    async fn get_user_by_api_token(&self, key: &str) -> StoreResult<Option<User>>;

    async fn blacklist_token(&self, jti: &str, expires_at: DateTime<Utc>) -> StoreResult<()>;

    async fn is_token_blacklisted(&self, jti: &str) -> StoreResult<bool>;

    // Weight

    /// Fails with [`StoreError::Conflict`] if the user already has an entry on that date
    async fn create_weight_entry(&self, entry: CreateWeightEntry) -> StoreResult<WeightEntry>;

    async fn recent_weight_entries(&self, user_id: i64, limit: i64) -> StoreResult<Vec<WeightEntry>>;

    // Exercises

    async fn get_exercise_category_by_name(&self, name: &str) -> StoreResult<Option<ExerciseCategory>>;

    async fn create_exercise_category(&self, name: &str) -> StoreResult<ExerciseCategory>;

    async fn exercise_exists(&self, name: &str) -> StoreResult<bool>;

    async fn create_exercise(&self, exercise: CreateExercise) -> StoreResult<Exercise>;

    // Nutrition

    async fn ingredient_exists(&self, name: &str) -> StoreResult<bool>;

    async fn create_ingredient(&self, ingredient: CreateIngredient) -> StoreResult<Ingredient>;

    // Reference data

    async fn get_language_by_short_name(&self, short_name: &str) -> StoreResult<Option<Language>>;

    async fn list_languages(&self) -> StoreResult<Vec<Language>>;

    async fn list_days_of_week(&self) -> StoreResult<Vec<DaysOfWeek>>;

    async fn get_license_by_short_name(&self, short_name: &str) -> StoreResult<Option<License>>;

    async fn create_license(&self, license: CreateLicense) -> StoreResult<License>;

    async fn list_licenses(&self) -> StoreResult<Vec<License>>;

    async fn list_repetition_units(&self) -> StoreResult<Vec<RepetitionUnit>>;

    async fn list_weight_units(&self) -> StoreResult<Vec<WeightUnit>>;
}
