pub mod admin;
pub mod auth;
pub mod check_in;
pub mod feedback;
pub mod journal;
pub mod middleware;
pub mod practice;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sea_orm::DbErr;
use serde_json::json;

use crate::domain::Slot;

/// Postgres unique-violation detection (code 23505). The conflict-handling
/// writes behind the one-row-per-parent invariants branch on this.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    err.to_string()
        .contains("duplicate key value violates unique constraint")
}

pub(crate) fn db_error(err: DbErr) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": err.to_string()})),
    )
        .into_response()
}

pub(crate) fn invalid_input(notice: impl Into<String>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({"error": notice.into()})),
    )
        .into_response()
}

/// Optional `?slot=` on the workflow GET routes.
#[derive(serde::Deserialize)]
pub struct SlotQuery {
    pub slot: Option<String>,
}

pub(crate) fn parse_slot(raw: Option<&str>) -> Result<Option<Slot>, Response> {
    match raw {
        None => Ok(None),
        Some(s) => s
            .parse::<Slot>()
            .map(Some)
            .map_err(invalid_input),
    }
}
