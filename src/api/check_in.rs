use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::json;
use tracing::field::display;

use crate::domain::{Mood, Slot};
use crate::entities::check_in;
use crate::workflow;

use super::SlotQuery;

#[derive(serde::Deserialize)]
pub struct CheckInRequest {
    mood: String,
    body_feeling: Option<String>,
    slot: Option<String>,
}

/// Today's workflow state plus the check-in record, if any. Serves as the
/// entry point of the journey.
pub async fn check_in_status(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
    Query(query): Query<SlotQuery>,
) -> Response {
    let slot = match super::parse_slot(query.slot.as_deref()) {
        Ok(slot) => slot,
        Err(response) => return response,
    };

    match workflow::load_day(&db, user_id, workflow::today(), slot).await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(json!({
                "state": snapshot.state(),
                "check_in": snapshot.check_in,
                "moods": Mood::ALL.map(|m| m.label()),
            })),
        )
            .into_response(),
        Err(e) => super::db_error(e),
    }
}

pub async fn submit_check_in(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
    Json(payload): Json<CheckInRequest>,
) -> Response {
    let mood = match payload.mood.parse::<Mood>() {
        Ok(mood) => mood,
        Err(e) => return super::invalid_input(e),
    };
    let slot = match payload.slot.as_deref() {
        None => Slot::default(),
        Some(raw) => match raw.parse::<Slot>() {
            Ok(slot) => slot,
            Err(e) => return super::invalid_input(e),
        },
    };
    let body_feeling = payload
        .body_feeling
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let date = workflow::today();

    // Pre-check covers the common double-submit; the unique index on
    // (user_id, check_in_date, slot) covers the concurrent one.
    let existing = check_in::Entity::find()
        .filter(check_in::Column::UserId.eq(user_id))
        .filter(check_in::Column::CheckInDate.eq(date))
        .filter(check_in::Column::Slot.eq(slot.label()))
        .one(&db)
        .await;
    match existing {
        Ok(Some(_)) => return Redirect::to("/already-checked-in").into_response(),
        Ok(None) => {}
        Err(e) => return super::db_error(e),
    }

    let new_check_in = check_in::ActiveModel {
        user_id: Set(user_id),
        mood: Set(mood.label().to_string()),
        body_feeling: Set(body_feeling),
        slot: Set(slot.label().to_string()),
        check_in_date: Set(date),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };

    match new_check_in.insert(&db).await {
        Ok(check_in) => {
            tracing::Span::current()
                .record("table", "check_ins")
                .record("action", "check_in")
                .record("user_id", user_id)
                .record("check_in_id", check_in.id)
                .record("business_event", "User checked in");

            crate::metrics::increment_check_ins(&check_in.mood);

            (
                StatusCode::CREATED,
                Json(json!({"state": "checked_in", "check_in": check_in})),
            )
                .into_response()
        }
        Err(e) if super::is_unique_violation(&e) => {
            Redirect::to("/already-checked-in").into_response()
        }
        Err(e) => {
            tracing::Span::current()
                .record("table", "check_ins")
                .record("action", "check_in_error")
                .record("error", display(&e));
            super::db_error(e)
        }
    }
}

/// Shown when a slot already has today's record.
pub async fn already_checked_in(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
    Query(query): Query<SlotQuery>,
) -> Response {
    let slot = match super::parse_slot(query.slot.as_deref()) {
        Ok(slot) => slot,
        Err(response) => return response,
    };

    let snapshot = match workflow::load_day(&db, user_id, workflow::today(), slot).await {
        Ok(snapshot) => snapshot,
        Err(e) => return super::db_error(e),
    };
    let state = snapshot.state();
    match snapshot.check_in {
        Some(check_in) => (
            StatusCode::OK,
            Json(json!({
                "state": state,
                "check_in": check_in,
                "notice": "You have already checked in for this slot today",
            })),
        )
            .into_response(),
        None => Redirect::to("/check-in").into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn todays_check_in(user_id: i32) -> check_in::Model {
        let date = workflow::today();
        check_in::Model {
            id: 1,
            user_id,
            mood: "Calm".to_string(),
            body_feeling: None,
            slot: "day".to_string(),
            check_in_date: date,
            created_at: date.and_hms_opt(9, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn duplicate_check_in_redirects_to_already_checked_in() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![todays_check_in(1)]])
            .into_connection();

        let response = submit_check_in(
            Extension(db),
            Extension(1),
            Json(CheckInRequest {
                mood: "Calm".to_string(),
                body_feeling: None,
                slot: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(axum::http::header::LOCATION).unwrap(),
            "/already-checked-in"
        );
    }

    #[tokio::test]
    async fn unknown_mood_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let response = submit_check_in(
            Extension(db),
            Extension(1),
            Json(CheckInRequest {
                mood: "Melancholy".to_string(),
                body_feeling: None,
                slot: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
