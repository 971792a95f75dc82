use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Gym {
    pub id: i64,
    pub name: String,
}

/// Installation-wide settings, stored as the single row with id 1
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GymConfig {
    pub id: i64,
    pub default_gym_id: Option<i64>,
}

/// Per-gym settings for a member, created when the user joins a gym
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GymUserConfig {
    pub id: i64,
    pub gym_id: i64,
    pub user_id: i64,
}
