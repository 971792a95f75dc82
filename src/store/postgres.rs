use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::*;
use crate::store::{GymStore, StoreError, StoreResult};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, is_active, \
     is_superuser, is_general_manager, is_manager, is_trainer, date_joined, last_login";

const PROFILE_COLUMNS: &str = "id, user_id, gym_id, notification_language_id, is_temporary, \
     can_use_api_create, created_by, show_comments, show_english_ingredients, \
     workout_reminder_active, workout_reminder, workout_duration, weight_unit, ro_access, \
     num_days_weight_reminder, timer_active, timer_pause";

/// PostgreSQL implementation of [`GymStore`]
#[derive(Debug, Clone)]
pub struct PgGymStore {
    db: PgPool,
}

impl PgGymStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

/// Turn unique violations into [`StoreError::Conflict`]
fn map_unique(err: sqlx::Error, what: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(what.to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl GymStore for PgGymStore {
    async fn create_user(&self, user: CreateUser) -> StoreResult<User> {
        let mut tx = self.db.begin().await?;

        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, date_joined)
             VALUES ($1, $2, $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique(e, "username"))?;

        sqlx::query(
            "INSERT INTO user_profiles (user_id, gym_id, notification_language_id, is_temporary, created_by)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(created.id)
        .bind(user.gym_id)
        .bind(user.notification_language_id)
        .bind(user.is_temporary)
        .bind(&user.created_by)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(created)
    }

    async fn get_user(&self, user_id: i64) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;

        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn email_in_use(&self, email: &str, exclude_user_id: Option<i64>) -> StoreResult<bool> {
        let row = sqlx::query(
            "SELECT 1 FROM users WHERE lower(email) = lower($1) AND ($2::BIGINT IS NULL OR id <> $2)",
        )
        .bind(email)
        .bind(exclude_user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.is_some())
    }

    async fn set_user_active(&self, user_id: i64, is_active: bool) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET is_active = $2 WHERE id = $1")
            .bind(user_id)
            .bind(is_active)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(())
    }

    async fn update_personal_information(
        &self,
        user_id: i64,
        update: &UpdatePersonalInformation,
    ) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET email = COALESCE($2, email),
                 first_name = COALESCE($3, first_name),
                 last_name = COALESCE($4, last_name)
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&update.email)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn record_login(&self, user_id: i64) -> StoreResult<()> {
        sqlx::query("UPDATE users SET last_login = $2 WHERE id = $1")
            .bind(user_id)
            .bind(Utc::now())
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn delete_user(&self, user_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_users(&self, is_active: bool) -> StoreResult<Vec<UserSummary>> {
        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT u.id, u.username, u.first_name, u.last_name, u.is_active,
                    p.gym_id, g.name AS gym_name, u.last_login
             FROM users u
             JOIN user_profiles p ON p.user_id = u.id
             LEFT JOIN gyms g ON g.id = p.gym_id
             WHERE u.is_active = $1
             ORDER BY u.id",
        )
        .bind(is_active)
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    async fn get_profile(&self, user_id: i64) -> StoreResult<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(profile)
    }

    async fn get_profile_by_id(&self, profile_id: i64) -> StoreResult<Option<UserProfile>> {
        let profile = sqlx::query_as::<_, UserProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE id = $1"
        ))
        .bind(profile_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(profile)
    }

    async fn update_profile(&self, profile: &UserProfile) -> StoreResult<()> {
        sqlx::query(
            "UPDATE user_profiles
             SET gym_id = $2, notification_language_id = $3, is_temporary = $4,
                 can_use_api_create = $5, created_by = $6, show_comments = $7,
                 show_english_ingredients = $8, workout_reminder_active = $9,
                 workout_reminder = $10, workout_duration = $11, weight_unit = $12,
                 ro_access = $13, num_days_weight_reminder = $14, timer_active = $15,
                 timer_pause = $16
             WHERE user_id = $1",
        )
        .bind(profile.user_id)
        .bind(profile.gym_id)
        .bind(profile.notification_language_id)
        .bind(profile.is_temporary)
        .bind(profile.can_use_api_create)
        .bind(&profile.created_by)
        .bind(profile.show_comments)
        .bind(profile.show_english_ingredients)
        .bind(profile.workout_reminder_active)
        .bind(profile.workout_reminder)
        .bind(profile.workout_duration)
        .bind(&profile.weight_unit)
        .bind(profile.ro_access)
        .bind(profile.num_days_weight_reminder)
        .bind(profile.timer_active)
        .bind(profile.timer_pause)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn list_profiles_created_by(&self, username: &str) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            "SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.password_hash,
                    u.is_active, u.is_superuser, u.is_general_manager, u.is_manager,
                    u.is_trainer, u.date_joined, u.last_login
             FROM users u
             JOIN user_profiles p ON p.user_id = u.id
             WHERE p.created_by = $1
             ORDER BY u.username",
        )
        .bind(username)
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    async fn get_gym_config(&self) -> StoreResult<GymConfig> {
        sqlx::query_as::<_, GymConfig>("SELECT id, default_gym_id FROM gym_config WHERE id = 1")
            .fetch_optional(&self.db)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn create_gym_user_config(&self, gym_id: i64, user_id: i64) -> StoreResult<GymUserConfig> {
        sqlx::query_as::<_, GymUserConfig>(
            "INSERT INTO gym_user_configs (gym_id, user_id) VALUES ($1, $2)
             RETURNING id, gym_id, user_id",
        )
        .bind(gym_id)
        .bind(user_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique(e, "gym user config"))
    }

    async fn get_api_token(&self, user_id: i64) -> StoreResult<Option<ApiToken>> {
        let token = sqlx::query_as::<_, ApiToken>(
            "SELECT key, user_id, created_at FROM api_tokens WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(token)
    }

    async fn replace_api_token(&self, user_id: i64, key: &str) -> StoreResult<ApiToken> {
        let mut tx = self.db.begin().await?;

        sqlx::query("DELETE FROM api_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let token = sqlx::query_as::<_, ApiToken>(
            "INSERT INTO api_tokens (key, user_id, created_at) VALUES ($1, $2, $3)
             RETURNING key, user_id, created_at",
        )
        .bind(key)
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique(e, "api token"))?;

        tx.commit().await?;

        Ok(token)
    }

    async fn get_user_by_api_token(&self, key: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.password_hash,
                    u.is_active, u.is_superuser, u.is_general_manager, u.is_manager,
                    u.is_trainer, u.date_joined, u.last_login
             FROM users u
             JOIN api_tokens t ON t.user_id = u.id
             WHERE t.key = $1",
        )
        .bind(key)
        .fetch_optional(&self.db)
        .await?;

        Ok(user)
    }

    async fn blacklist_token(&self, jti: &str, expires_at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO token_blacklist (jti, expires_at) VALUES ($1, $2)
             ON CONFLICT (jti) DO NOTHING",
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn is_token_blacklisted(&self, jti: &str) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 FROM token_blacklist WHERE jti = $1 AND expires_at > NOW()")
            .bind(jti)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.is_some())
    }

    async fn create_weight_entry(&self, entry: CreateWeightEntry) -> StoreResult<WeightEntry> {
        sqlx::query_as::<_, WeightEntry>(
            "INSERT INTO weight_entries (user_id, date, weight) VALUES ($1, $2, $3)
             RETURNING id, user_id, date, weight",
        )
        .bind(entry.user_id)
        .bind(entry.date)
        .bind(entry.weight)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique(e, "weight entry for this date"))
    }

    async fn recent_weight_entries(&self, user_id: i64, limit: i64) -> StoreResult<Vec<WeightEntry>> {
        let entries = sqlx::query_as::<_, WeightEntry>(
            "SELECT id, user_id, date, weight FROM weight_entries
             WHERE user_id = $1 ORDER BY date DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    async fn get_exercise_category_by_name(&self, name: &str) -> StoreResult<Option<ExerciseCategory>> {
        let category = sqlx::query_as::<_, ExerciseCategory>(
            "SELECT id, name FROM exercise_categories WHERE name = $1 ORDER BY id LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await?;

        Ok(category)
    }

    async fn create_exercise_category(&self, name: &str) -> StoreResult<ExerciseCategory> {
        let category = sqlx::query_as::<_, ExerciseCategory>(
            "INSERT INTO exercise_categories (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.db)
        .await?;

        Ok(category)
    }

    async fn exercise_exists(&self, name: &str) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 FROM exercises WHERE name = $1 LIMIT 1")
            .bind(name)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.is_some())
    }

    async fn create_exercise(&self, exercise: CreateExercise) -> StoreResult<Exercise> {
        let created = sqlx::query_as::<_, Exercise>(
            "INSERT INTO exercises
                 (name, name_original, description, category_id, language_id, license_id,
                  license_author, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id, name, name_original, description, category_id, language_id,
                       license_id, license_author, status",
        )
        .bind(&exercise.name)
        .bind(&exercise.name_original)
        .bind(&exercise.description)
        .bind(exercise.category_id)
        .bind(exercise.language_id)
        .bind(exercise.license_id)
        .bind(&exercise.license_author)
        .bind(exercise.status.as_str())
        .fetch_one(&self.db)
        .await?;

        Ok(created)
    }

    async fn ingredient_exists(&self, name: &str) -> StoreResult<bool> {
        let row = sqlx::query("SELECT 1 FROM ingredients WHERE name = $1 LIMIT 1")
            .bind(name)
            .fetch_optional(&self.db)
            .await?;

        Ok(row.is_some())
    }

    async fn create_ingredient(&self, ingredient: CreateIngredient) -> StoreResult<Ingredient> {
        let created = sqlx::query_as::<_, Ingredient>(
            "INSERT INTO ingredients
                 (user_id, language_id, name, energy, protein, carbohydrates, fat, fibres, sodium)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id, user_id, language_id, name, energy, protein, carbohydrates, fat,
                       fibres, sodium",
        )
        .bind(ingredient.user_id)
        .bind(ingredient.language_id)
        .bind(&ingredient.name)
        .bind(ingredient.energy)
        .bind(ingredient.protein)
        .bind(ingredient.carbohydrates)
        .bind(ingredient.fat)
        .bind(ingredient.fibres)
        .bind(ingredient.sodium)
        .fetch_one(&self.db)
        .await?;

        Ok(created)
    }

    async fn get_language_by_short_name(&self, short_name: &str) -> StoreResult<Option<Language>> {
        let language = sqlx::query_as::<_, Language>(
            "SELECT id, short_name, full_name FROM languages WHERE short_name = $1",
        )
        .bind(short_name)
        .fetch_optional(&self.db)
        .await?;

        Ok(language)
    }

    async fn list_languages(&self) -> StoreResult<Vec<Language>> {
        let languages =
            sqlx::query_as::<_, Language>("SELECT id, short_name, full_name FROM languages ORDER BY id")
                .fetch_all(&self.db)
                .await?;

        Ok(languages)
    }

    async fn list_days_of_week(&self) -> StoreResult<Vec<DaysOfWeek>> {
        let days = sqlx::query_as::<_, DaysOfWeek>("SELECT id, day_of_week FROM days_of_week ORDER BY id")
            .fetch_all(&self.db)
            .await?;

        Ok(days)
    }

    async fn get_license_by_short_name(&self, short_name: &str) -> StoreResult<Option<License>> {
        let license = sqlx::query_as::<_, License>(
            "SELECT id, full_name, short_name, url FROM licenses WHERE short_name = $1 ORDER BY id LIMIT 1",
        )
        .bind(short_name)
        .fetch_optional(&self.db)
        .await?;

        Ok(license)
    }

    async fn create_license(&self, license: CreateLicense) -> StoreResult<License> {
        let created = sqlx::query_as::<_, License>(
            "INSERT INTO licenses (full_name, short_name, url) VALUES ($1, $2, $3)
             RETURNING id, full_name, short_name, url",
        )
        .bind(&license.full_name)
        .bind(&license.short_name)
        .bind(&license.url)
        .fetch_one(&self.db)
        .await?;

        Ok(created)
    }

    async fn list_licenses(&self) -> StoreResult<Vec<License>> {
        let licenses =
            sqlx::query_as::<_, License>("SELECT id, full_name, short_name, url FROM licenses ORDER BY id")
                .fetch_all(&self.db)
                .await?;

        Ok(licenses)
    }

    async fn list_repetition_units(&self) -> StoreResult<Vec<RepetitionUnit>> {
        let units = sqlx::query_as::<_, RepetitionUnit>("SELECT id, name FROM repetition_units ORDER BY id")
            .fetch_all(&self.db)
            .await?;

        Ok(units)
    }

    async fn list_weight_units(&self) -> StoreResult<Vec<WeightUnit>> {
        let units = sqlx::query_as::<_, WeightUnit>("SELECT id, name FROM weight_units ORDER BY id")
            .fetch_all(&self.db)
            .await?;

        Ok(units)
    }
}
