use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// Success envelope returned by every endpoint: `{ success, data, message? }`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ApiResponse<T> {
    /// Always `true`.
    #[schema(example = true)]
    pub success: bool,
    pub data: T,
    /// Optional human-readable note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
            status: StatusCode::OK,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Payload of acknowledgement responses; serializes as `null`.
#[derive(Serialize, utoipa::ToSchema)]
pub struct NoData;

impl ApiResponse<NoData> {
    /// An acknowledgement with no payload (`data: null`).
    pub fn message(message: impl Into<String>) -> Self {
        Self::ok(NoData).with_message(message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

/// Pagination metadata included in list responses.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Pagination {
    /// Current page number (1-based).
    #[schema(example = 1)]
    pub page: u64,
    /// Number of items per page.
    #[schema(example = 20)]
    pub per_page: u64,
    /// Total number of matching items across all pages.
    #[schema(example = 47)]
    pub total: u64,
    /// Total number of pages.
    #[schema(example = 3)]
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        Self {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page),
        }
    }
}

/// A page of items plus its pagination metadata.
#[derive(Serialize, utoipa::ToSchema)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

const MAX_PER_PAGE: u64 = 100;

/// Largest page whose offset `(page - 1) * per_page` still fits a Postgres `bigint`.
const MAX_PAGE: u64 = i64::MAX as u64 / MAX_PER_PAGE;

/// Clamp raw `page`/`per_page` query values: page in 1..=MAX_PAGE, per_page in 1..=100 (default 20).
pub fn page_params(page: Option<u64>, per_page: Option<u64>) -> (u64, u64) {
    let page = page.unwrap_or(1).clamp(1, MAX_PAGE);
    let per_page = per_page.unwrap_or(20).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

/// Escape LIKE wildcard characters in a search string.
pub fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Filter rows whose JSON list column contains `tag`, compared case-insensitively.
///
/// Rows written before lists were normalised may hold a string instead of an
/// array, either comma separated or a JSON-encoded array. Those are split on
/// commas and stripped of quotes and brackets before comparing.
pub fn json_tag_filter(table: &str, column: &str, tag: &str) -> sea_orm::sea_query::SimpleExpr {
    sea_orm::sea_query::Expr::cust_with_values(
        format!(
            r#"CASE WHEN jsonb_typeof("{table}"."{column}") = 'array' THEN EXISTS (SELECT 1 FROM jsonb_array_elements_text("{table}"."{column}") AS t(v) WHERE lower(t.v) = lower($1)) WHEN jsonb_typeof("{table}"."{column}") = 'string' THEN EXISTS (SELECT 1 FROM regexp_split_to_table("{table}"."{column}" #>> '{{}}', ',') AS t(v) WHERE lower(btrim(t.v, ' "[]')) = lower($1)) ELSE false END"#
        ),
        [tag.to_string()],
    )
}

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a trimmed title (1-200 Unicode characters).
pub fn validate_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 200 {
        return Err(AppError::Validation(
            "Title must be 1-200 characters".into(),
        ));
    }
    Ok(())
}

/// Validate a required long-form body (non-empty, at most 100KB).
pub fn validate_body(field: &str, text: &str) -> Result<(), AppError> {
    if text.trim().is_empty() || text.len() > 100_000 {
        return Err(AppError::Validation(format!(
            "{field} must be non-empty and at most 100KB"
        )));
    }
    Ok(())
}

/// Parse `asc`/`desc`, falling back to `default` when absent.
pub fn sort_order(raw: Option<&str>, default: sea_orm::Order) -> Result<sea_orm::Order, AppError> {
    match raw {
        None => Ok(default),
        Some("asc") => Ok(sea_orm::Order::Asc),
        Some("desc") => Ok(sea_orm::Order::Desc),
        Some(_) => Err(AppError::Validation(
            "sort_order must be one of: asc, desc".into(),
        )),
    }
}
