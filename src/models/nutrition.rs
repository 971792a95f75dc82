use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub user_id: Option<i64>,
    pub language_id: i64,
    pub name: String,
    /// kcal per 100g
    pub energy: i32,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    pub fibres: f64,
    pub sodium: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateIngredient {
    pub user_id: Option<i64>,
    pub language_id: i64,
    pub name: String,
    pub energy: i32,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    pub fibres: f64,
    pub sodium: f64,
}
