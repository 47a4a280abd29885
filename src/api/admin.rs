use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde_json::json;

use crate::entities::{check_in, journal_entry, practice, practice_feedback};

/// Clear all journey data while preserving users. Children go first so the
/// foreign keys are never left dangling mid-way.
pub async fn reset_data(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
) -> Response {
    let feedback = match practice_feedback::Entity::delete_many().exec(&db).await {
        Ok(res) => res.rows_affected,
        Err(e) => return super::db_error(e),
    };
    let journals = match journal_entry::Entity::delete_many().exec(&db).await {
        Ok(res) => res.rows_affected,
        Err(e) => return super::db_error(e),
    };
    let practices = match practice::Entity::delete_many().exec(&db).await {
        Ok(res) => res.rows_affected,
        Err(e) => return super::db_error(e),
    };
    let check_ins = match check_in::Entity::delete_many().exec(&db).await {
        Ok(res) => res.rows_affected,
        Err(e) => return super::db_error(e),
    };

    tracing::Span::current()
        .record("action", "reset_data")
        .record("user_id", user_id)
        .record("business_event", "Journey data cleared");

    metrics::gauge!("stillpoint_checkins_total").set(0.0);
    metrics::gauge!("stillpoint_practices_total").set(0.0);
    metrics::gauge!("stillpoint_journal_entries_total").set(0.0);

    (
        StatusCode::OK,
        Json(json!({
            "message": "Journey data cleared, users preserved",
            "deleted": {
                "practice_feedback": feedback,
                "journal_entries": journals,
                "practices": practices,
                "check_ins": check_ins,
            }
        })),
    )
        .into_response()
}
