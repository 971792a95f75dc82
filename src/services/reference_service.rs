//! Read-only reference collections for the REST API.
//!
//! Collections are small and seeded by migrations, so filtering, ordering
//! and pagination happen in memory over their JSON representation.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::errors::{ApiError, ApiResult};
use crate::store::GymStore;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// One of the reference collections exposed under `/api/v2`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceCollection {
    Language,
    DaysOfWeek,
    License,
    RepetitionUnit,
    WeightUnit,
}

impl ReferenceCollection {
    pub fn path(&self) -> &'static str {
        match self {
            ReferenceCollection::Language => "/api/v2/language",
            ReferenceCollection::DaysOfWeek => "/api/v2/daysofweek",
            ReferenceCollection::License => "/api/v2/license",
            ReferenceCollection::RepetitionUnit => "/api/v2/setting-repetitionunit",
            ReferenceCollection::WeightUnit => "/api/v2/setting-weightunit",
        }
    }

    /// Fields that accept exact-match filters
    pub fn filter_fields(&self) -> &'static [&'static str] {
        match self {
            ReferenceCollection::Language => &["full_name", "short_name"],
            ReferenceCollection::DaysOfWeek => &["day_of_week"],
            ReferenceCollection::License => &["full_name", "short_name", "url"],
            ReferenceCollection::RepetitionUnit | ReferenceCollection::WeightUnit => &["name"],
        }
    }
}

/// Limit/offset page in the usual REST framework shape
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Page<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Parsed `filter`, `ordering`, `limit` and `offset` query parameters
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub params: BTreeMap<String, String>,
}

impl ListQuery {
    pub fn new(params: BTreeMap<String, String>) -> Self {
        Self { params }
    }

    fn number(&self, name: &str) -> ApiResult<Option<usize>> {
        match self.params.get(name) {
            None => Ok(None),
            Some(raw) if raw.is_empty() => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| ApiError::BadRequest(format!("Invalid value for {name}"))),
        }
    }

    pub fn limit(&self) -> ApiResult<usize> {
        Ok(self
            .number("limit")?
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE))
    }

    pub fn offset(&self) -> ApiResult<usize> {
        Ok(self.number("offset")?.unwrap_or(0))
    }

    fn page_url(&self, path: &str, limit: usize, offset: usize) -> String {
        let mut params = self.params.clone();
        params.insert("limit".to_string(), limit.to_string());
        if offset == 0 {
            params.remove("offset");
        } else {
            params.insert("offset".to_string(), offset.to_string());
        }

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{path}?{query}")
    }
}

fn field_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => field_as_string(x).cmp(&field_as_string(y)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Apply exact-match filters, `ordering` and limit/offset pagination
pub fn paginate(
    rows: Vec<Value>,
    query: &ListQuery,
    filter_fields: &[&str],
    path: &str,
) -> ApiResult<Page<Value>> {
    let mut rows: Vec<Value> = rows
        .into_iter()
        .filter(|row| {
            filter_fields.iter().all(|field| match query.params.get(*field) {
                Some(expected) => row.get(*field).and_then(field_as_string).as_deref() == Some(expected.as_str()),
                None => true,
            })
        })
        .collect();

    if let Some(ordering) = query.params.get("ordering").filter(|o| !o.is_empty()) {
        let (field, descending) = match ordering.strip_prefix('-') {
            Some(field) => (field, true),
            None => (ordering.as_str(), false),
        };

        if field != "id" && !filter_fields.contains(&field) {
            return Err(ApiError::BadRequest(format!("Cannot order by {field}")));
        }

        rows.sort_by(|a, b| {
            let ordering = compare_fields(a.get(field), b.get(field));
            if descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    let count = rows.len();
    let limit = query.limit()?;
    let offset = query.offset()?;

    let results: Vec<Value> = rows.into_iter().skip(offset).take(limit).collect();

    let next = (offset + limit < count).then(|| query.page_url(path, limit, offset + limit));
    let previous = (offset > 0).then(|| query.page_url(path, limit, offset.saturating_sub(limit)));

    Ok(Page {
        count,
        next,
        previous,
        results,
    })
}

#[derive(Clone)]
pub struct ReferenceService {
    store: Arc<dyn GymStore>,
}

impl ReferenceService {
    pub fn new(store: Arc<dyn GymStore>) -> Self {
        Self { store }
    }

    async fn rows(&self, collection: ReferenceCollection) -> ApiResult<Vec<Value>> {
        let rows = match collection {
            ReferenceCollection::Language => to_values(self.store.list_languages().await?)?,
            ReferenceCollection::DaysOfWeek => to_values(self.store.list_days_of_week().await?)?,
            ReferenceCollection::License => to_values(self.store.list_licenses().await?)?,
            ReferenceCollection::RepetitionUnit => {
                to_values(self.store.list_repetition_units().await?)?
            }
            ReferenceCollection::WeightUnit => to_values(self.store.list_weight_units().await?)?,
        };
        Ok(rows)
    }

    pub async fn list(&self, collection: ReferenceCollection, query: &ListQuery) -> ApiResult<Page<Value>> {
        let rows = self.rows(collection).await?;
        paginate(rows, query, collection.filter_fields(), collection.path())
    }

    pub async fn detail(&self, collection: ReferenceCollection, id: i64) -> ApiResult<Value> {
        self.rows(collection)
            .await?
            .into_iter()
            .find(|row| row.get("id").and_then(Value::as_i64) == Some(id))
            .ok_or(ApiError::NotFound)
    }
}

fn to_values<T: Serialize>(items: Vec<T>) -> ApiResult<Vec<Value>> {
    items
        .into_iter()
        .map(|item| serde_json::to_value(item).map_err(|e| ApiError::Internal(e.into())))
        .collect()
}
