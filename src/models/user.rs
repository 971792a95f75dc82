use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Staff permissions a user can hold. Admins implicitly hold all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// General manager: manage every gym
    ManageGyms,
    /// Manager of the user's own gym
    ManageGym,
    /// Trainer at the user's own gym
    GymTrainer,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub is_general_manager: bool,
    pub is_manager: bool,
    pub is_trainer: bool,
    pub date_joined: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn has_perm(&self, permission: Permission) -> bool {
        if self.is_superuser {
            return true;
        }

        match permission {
            Permission::ManageGyms => self.is_general_manager,
            Permission::ManageGym => self.is_manager,
            Permission::GymTrainer => self.is_trainer,
        }
    }

    /// True if the user holds any trainer or manager privilege
    pub fn is_staff_member(&self) -> bool {
        self.has_perm(Permission::ManageGyms)
            || self.has_perm(Permission::ManageGym)
            || self.has_perm(Permission::GymTrainer)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub user_id: i64,
    pub gym_id: Option<i64>,
    pub notification_language_id: Option<i64>,
    pub is_temporary: bool,
    pub can_use_api_create: bool,
    pub created_by: Option<String>,
    pub show_comments: bool,
    pub show_english_ingredients: bool,
    pub workout_reminder_active: bool,
    pub workout_reminder: i32,
    pub workout_duration: i32,
    pub weight_unit: String,
    pub ro_access: bool,
    pub num_days_weight_reminder: i32,
    pub timer_active: bool,
    pub timer_pause: i32,
}

/// Values needed to insert a user together with its profile
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_temporary: bool,
    pub gym_id: Option<i64>,
    pub notification_language_id: Option<i64>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePersonalInformation {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Preference fields a user may change on their own profile
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePreferences {
    pub notification_language_id: Option<i64>,
    pub show_comments: Option<bool>,
    pub show_english_ingredients: Option<bool>,
    pub workout_reminder_active: Option<bool>,
    pub workout_reminder: Option<i32>,
    pub workout_duration: Option<i32>,
    pub weight_unit: Option<String>,
    pub ro_access: Option<bool>,
    pub num_days_weight_reminder: Option<i32>,
    pub timer_active: Option<bool>,
    pub timer_pause: Option<i32>,
}

impl UserProfile {
    pub fn apply_preferences(&mut self, update: &UpdatePreferences) {
        if let Some(language_id) = update.notification_language_id {
            self.notification_language_id = Some(language_id);
        }
        if let Some(value) = update.show_comments {
            self.show_comments = value;
        }
        if let Some(value) = update.show_english_ingredients {
            self.show_english_ingredients = value;
        }
        if let Some(value) = update.workout_reminder_active {
            self.workout_reminder_active = value;
        }
        if let Some(value) = update.workout_reminder {
            self.workout_reminder = value;
        }
        if let Some(value) = update.workout_duration {
            self.workout_duration = value;
        }
        if let Some(value) = &update.weight_unit {
            self.weight_unit = value.clone();
        }
        if let Some(value) = update.ro_access {
            self.ro_access = value;
        }
        if let Some(value) = update.num_days_weight_reminder {
            self.num_days_weight_reminder = value;
        }
        if let Some(value) = update.timer_active {
            self.timer_active = value;
        }
        if let Some(value) = update.timer_pause {
            self.timer_pause = value;
        }
    }
}

/// Row of the general user list
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub gym_id: Option<i64>,
    pub gym_name: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApiToken {
    pub key: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Email and name changes made by the user or a gym manager
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PersonalInformationRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: Option<String>,

    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters"))]
    pub last_name: Option<String>,
}

impl PersonalInformationRequest {
    pub fn to_update(&self) -> UpdatePersonalInformation {
        UpdatePersonalInformation {
            email: self.email.as_ref().map(|e| e.trim().to_string()),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// Profile preferences together with personal information, saved in one go
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PreferencesRequest {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: Option<String>,

    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters"))]
    pub first_name: Option<String>,

    #[validate(length(max = 150, message = "Ensure this value has at most 150 characters"))]
    pub last_name: Option<String>,

    pub notification_language_id: Option<i64>,
    pub show_comments: Option<bool>,
    pub show_english_ingredients: Option<bool>,
    pub workout_reminder_active: Option<bool>,

    #[validate(range(min = 1, max = 30, message = "Workout reminder must be between 1 and 30 days"))]
    pub workout_reminder: Option<i32>,

    #[validate(range(min = 1, max = 30, message = "Workout duration must be between 1 and 30 weeks"))]
    pub workout_duration: Option<i32>,

    #[validate(custom(function = "validate_weight_unit"))]
    pub weight_unit: Option<String>,

    pub ro_access: Option<bool>,

    #[validate(range(min = 0, max = 30, message = "Weight reminder must be between 0 and 30 days"))]
    pub num_days_weight_reminder: Option<i32>,

    pub timer_active: Option<bool>,

    #[validate(range(min = 10, max = 400, message = "Timer pause must be between 10 and 400 seconds"))]
    pub timer_pause: Option<i32>,
}

impl PreferencesRequest {
    pub fn personal_information(&self) -> UpdatePersonalInformation {
        UpdatePersonalInformation {
            email: self.email.as_ref().map(|e| e.trim().to_string()),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }

    pub fn preferences(&self) -> UpdatePreferences {
        UpdatePreferences {
            notification_language_id: self.notification_language_id,
            show_comments: self.show_comments,
            show_english_ingredients: self.show_english_ingredients,
            workout_reminder_active: self.workout_reminder_active,
            workout_reminder: self.workout_reminder,
            workout_duration: self.workout_duration,
            weight_unit: self.weight_unit.clone(),
            ro_access: self.ro_access,
            num_days_weight_reminder: self.num_days_weight_reminder,
            timer_active: self.timer_active,
            timer_pause: self.timer_pause,
        }
    }
}

fn validate_weight_unit(value: &str) -> Result<(), validator::ValidationError> {
    if !["kg", "lb"].contains(&value) {
        let mut error = validator::ValidationError::new("invalid_weight_unit");
        error.message = Some("Weight unit must be kg or lb".into());
        return Err(error);
    }
    Ok(())
}

/// Password re-confirmation of the acting user
#[derive(Debug, Clone, Deserialize)]
pub struct DeleteAccountRequest {
    pub password: String,
}

/// Registration form, used by the web flow and the REST endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RegistrationRequest {
    #[validate(
        length(min = 1, max = 150, message = "Username must be between 1 and 150 characters"),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[validate(email(message = "Enter a valid email address"))]
    pub email: Option<String>,

    #[serde(alias = "password")]
    pub password1: String,

    /// Confirmation; the REST endpoint accepts a single `password`
    pub password2: Option<String>,

    #[serde(rename = "g-recaptcha-response", alias = "captcha")]
    pub captcha: Option<String>,
}

fn validate_username(value: &str) -> Result<(), validator::ValidationError> {
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_');
    if !value.chars().all(allowed) {
        let mut error = validator::ValidationError::new("invalid_username");
        error.message =
            Some("Enter a valid username. Only letters, numbers and @/./+/-/_ are allowed".into());
        return Err(error);
    }
    Ok(())
}
