use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Language {
    pub id: i64,
    pub short_name: String,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DaysOfWeek {
    pub id: i64,
    pub day_of_week: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct License {
    pub id: i64,
    pub full_name: String,
    pub short_name: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLicense {
    pub full_name: String,
    pub short_name: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RepetitionUnit {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WeightUnit {
    pub id: i64,
    pub name: String,
}
