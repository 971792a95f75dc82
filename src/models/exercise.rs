use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExerciseCategory {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseStatus {
    Pending,
    Accepted,
}

impl ExerciseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseStatus::Pending => "pending",
            ExerciseStatus::Accepted => "accepted",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub name_original: String,
    pub description: String,
    pub category_id: i64,
    pub language_id: i64,
    pub license_id: i64,
    pub license_author: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct CreateExercise {
    pub name: String,
    pub name_original: String,
    pub description: String,
    pub category_id: i64,
    pub language_id: i64,
    pub license_id: i64,
    pub license_author: Option<String>,
    pub status: ExerciseStatus,
}
