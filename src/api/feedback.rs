use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, IntoActiveModel, Set};
use serde_json::json;
use tracing::field::display;

use crate::domain::Pacing;
use crate::entities::practice_feedback;
use crate::workflow::{self, WorkflowState};

use super::SlotQuery;

#[derive(serde::Deserialize)]
pub struct FeedbackRequest {
    rating: Option<i32>,
    helped: Option<bool>,
    pacing: Option<String>,
    slot: Option<String>,
}

/// The feedback step view: the practice being rated plus any rating
/// already given.
pub async fn get_feedback(
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
    if state < WorkflowState::Reflected {
        return Redirect::to(workflow::entry_point(state)).into_response();
    }

    (
        StatusCode::OK,
        Json(json!({
            "state": state,
            "practice": snapshot.practice,
            "feedback": snapshot.feedback,
        })),
    )
        .into_response()
}

/// Upsert the single feedback row for today's practice. A rating between
/// 1 and 5 is mandatory; helped and pacing are optional.
pub async fn submit_feedback(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
    Json(payload): Json<FeedbackRequest>,
) -> Response {
    let slot = match super::parse_slot(payload.slot.as_deref()) {
        Ok(slot) => slot,
        Err(response) => return response,
    };

    let snapshot = match workflow::load_day(&db, user_id, workflow::today(), slot).await {
        Ok(snapshot) => snapshot,
        Err(e) => return super::db_error(e),
    };
    let state = snapshot.state();
    if state < WorkflowState::Reflected {
        return Redirect::to(workflow::entry_point(state)).into_response();
    }
    let Some(practice) = &snapshot.practice else {
        return Redirect::to(workflow::entry_point(state)).into_response();
    };

    let rating = match payload.rating {
        Some(rating) if (1..=5).contains(&rating) => rating,
        Some(_) => return super::invalid_input("Rating must be between 1 and 5"),
        None => return super::invalid_input("A rating is required"),
    };
    let pacing = match payload.pacing.as_deref() {
        None => None,
        Some(raw) => match raw.parse::<Pacing>() {
            Ok(pacing) => Some(pacing.label().to_string()),
            Err(e) => return super::invalid_input(e),
        },
    };

    let now = chrono::Utc::now().naive_utc();
    let saved = match snapshot.feedback {
        Some(existing) => {
            update_feedback(&db, existing, rating, payload.helped, pacing, now).await
        }
        None => {
            let new_feedback = practice_feedback::ActiveModel {
                practice_id: Set(practice.id),
                user_id: Set(user_id),
                rating: Set(rating),
                helped: Set(payload.helped),
                pacing: Set(pacing.clone()),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            match new_feedback.insert(&db).await {
                Ok(feedback) => Ok(feedback),
                Err(e) if super::is_unique_violation(&e) => {
                    // Double submit; one row per practice, so update it.
                    match workflow::load_day(&db, user_id, workflow::today(), slot).await {
                        Ok(fresh) => match fresh.feedback {
                            Some(existing) => {
                                update_feedback(&db, existing, rating, payload.helped, pacing, now)
                                    .await
                            }
                            None => Err(e),
                        },
                        Err(e) => Err(e),
                    }
                }
                Err(e) => Err(e),
            }
        }
    };

    match saved {
        Ok(feedback) => {
            tracing::Span::current()
                .record("table", "practice_feedback")
                .record("action", "save_feedback")
                .record("user_id", user_id)
                .record("practice_id", practice.id)
                .record("business_event", "Feedback saved");

            crate::metrics::increment_feedback(feedback.rating);

            (
                StatusCode::OK,
                Json(json!({"state": "feedback_given", "feedback": feedback})),
            )
                .into_response()
        }
        Err(e) => {
            tracing::Span::current()
                .record("table", "practice_feedback")
                .record("action", "save_feedback_error")
                .record("error", display(&e));
            super::db_error(e)
        }
    }
}

async fn update_feedback(
    db: &DatabaseConnection,
    existing: practice_feedback::Model,
    rating: i32,
    helped: Option<bool>,
    pacing: Option<String>,
    now: chrono::NaiveDateTime,
) -> Result<practice_feedback::Model, DbErr> {
    let mut active = existing.into_active_model();
    active.rating = Set(rating);
    active.helped = Set(helped);
    active.pacing = Set(pacing);
    active.updated_at = Set(now);
    active.update(db).await
}

/// Terminal acknowledgement once the whole chain is done.
pub async fn thank_you(
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
    if state < WorkflowState::FeedbackGiven {
        return Redirect::to(workflow::entry_point(state)).into_response();
    }

    (
        StatusCode::OK,
        Json(json!({
            "state": state,
            "message": "Thank you for taking a moment for yourself today",
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{check_in, journal_entry, practice};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn chain_rows() -> (
        check_in::Model,
        practice::Model,
        journal_entry::Model,
        practice_feedback::Model,
    ) {
        let date = workflow::today();
        let ci = check_in::Model {
            id: 1,
            user_id: 1,
            mood: "Anxious".to_string(),
            body_feeling: None,
            slot: "day".to_string(),
            check_in_date: date,
            created_at: date.and_hms_opt(9, 0, 0).unwrap(),
        };
        let practice = practice::Model {
            id: 7,
            check_in_id: 1,
            title: "4-7-8 Calming Breath".to_string(),
            description: "Inhale for four counts...".to_string(),
            category: "breathing".to_string(),
            journal_prompt: "What do you need right now?".to_string(),
            audio_file: None,
            created_at: date.and_hms_opt(9, 1, 0).unwrap(),
        };
        let journal = journal_entry::Model {
            id: 3,
            check_in_id: 1,
            user_id: 1,
            reflection: "I feel calmer".to_string(),
            intention: None,
            self_care: None,
            next_day_goal: None,
            created_at: date.and_hms_opt(9, 5, 0).unwrap(),
            updated_at: date.and_hms_opt(9, 5, 0).unwrap(),
        };
        let feedback = practice_feedback::Model {
            id: 2,
            practice_id: 7,
            user_id: 1,
            rating: 3,
            helped: None,
            pacing: None,
            created_at: date.and_hms_opt(9, 6, 0).unwrap(),
            updated_at: date.and_hms_opt(9, 6, 0).unwrap(),
        };
        (ci, practice, journal, feedback)
    }

    #[tokio::test]
    async fn missing_rating_is_rejected() {
        let (ci, practice, journal, _) = chain_rows();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ci]])
            .append_query_results([vec![practice]])
            .append_query_results([vec![journal]])
            .append_query_results([Vec::<practice_feedback::Model>::new()])
            .into_connection();

        let response = submit_feedback(
            Extension(db),
            Extension(1),
            Json(FeedbackRequest {
                rating: None,
                helped: None,
                pacing: None,
                slot: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn resubmission_updates_the_single_row() {
        let (ci, practice, journal, feedback) = chain_rows();
        let updated = practice_feedback::Model {
            rating: 4,
            helped: Some(true),
            pacing: Some("Just right".to_string()),
            ..feedback.clone()
        };
        // Snapshot queries, then the UPDATE .. RETURNING row; no insert is
        // queued, so creating a second row would fail the assertion.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ci]])
            .append_query_results([vec![practice]])
            .append_query_results([vec![journal]])
            .append_query_results([vec![feedback]])
            .append_query_results([vec![updated]])
            .into_connection();

        let response = submit_feedback(
            Extension(db),
            Extension(1),
            Json(FeedbackRequest {
                rating: Some(4),
                helped: Some(true),
                pacing: Some("Just right".to_string()),
                slot: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn out_of_range_rating_is_rejected() {
        let (ci, practice, journal, _) = chain_rows();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ci]])
            .append_query_results([vec![practice]])
            .append_query_results([vec![journal]])
            .append_query_results([Vec::<practice_feedback::Model>::new()])
            .into_connection();

        let response = submit_feedback(
            Extension(db),
            Extension(1),
            Json(FeedbackRequest {
                rating: Some(9),
                helped: None,
                pacing: None,
                slot: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
