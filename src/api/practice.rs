use axum::{
    body::Body,
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};
use serde_json::json;
use tokio::fs::File;
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::field::display;

use crate::domain::{fallback_content, Mood, Slot};
use crate::elevenlabs::ElevenLabsClient;
use crate::entities::{check_in, practice};
use crate::openai::OpenAiClient;
use crate::workflow::{self, WorkflowState};

use super::SlotQuery;

/// Generate-once, then serve. The first visit after a check-in invokes the
/// content generator (falling back to the canned table), persists the one
/// practice row for the check-in, and attaches narration audio when the TTS
/// call succeeds. Every later visit is an idempotent read of that row.
pub async fn get_practice(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
    Extension(ai): Extension<OpenAiClient>,
    Extension(tts): Extension<ElevenLabsClient>,
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
    let Some(ci) = snapshot.check_in else {
        return Redirect::to(workflow::entry_point(WorkflowState::NoCheckIn)).into_response();
    };

    if let Some(existing) = snapshot.practice {
        return (
            StatusCode::OK,
            Json(json!({"state": state, "practice": existing})),
        )
            .into_response();
    }

    let mood = ci.mood.parse::<Mood>().unwrap_or(Mood::Calm);
    let ci_slot = ci.slot.parse::<Slot>().unwrap_or_default();

    let (content, source) = match ai
        .generate_practice_and_prompt(mood, ci.body_feeling.as_deref(), ci_slot)
        .await
    {
        Ok(content) => (content, "model"),
        Err(e) => {
            tracing::warn!(check_in_id = ci.id, "Content generation failed, using fallback: {}", e);
            (fallback_content(&ci.mood), "fallback")
        }
    };

    let new_practice = practice::ActiveModel {
        check_in_id: Set(ci.id),
        title: Set(content.practice.title),
        description: Set(content.practice.description),
        category: Set(content.practice.category.label().to_string()),
        journal_prompt: Set(content.journal_prompt),
        audio_file: Set(None),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };

    let mut saved = match new_practice.insert(&db).await {
        Ok(practice) => practice,
        Err(e) if super::is_unique_violation(&e) => {
            // A concurrent visit won the insert; serve its row.
            match practice::Entity::find()
                .filter(practice::Column::CheckInId.eq(ci.id))
                .one(&db)
                .await
            {
                Ok(Some(winner)) => {
                    return (
                        StatusCode::OK,
                        Json(json!({"state": "practice_ready", "practice": winner})),
                    )
                        .into_response()
                }
                Ok(None) => return super::db_error(e),
                Err(e) => return super::db_error(e),
            }
        }
        Err(e) => {
            tracing::Span::current()
                .record("table", "practices")
                .record("action", "create_practice_error")
                .record("error", display(&e));
            return super::db_error(e);
        }
    };

    crate::metrics::increment_practices_generated(source);
    tracing::Span::current()
        .record("table", "practices")
        .record("action", "create_practice")
        .record("user_id", user_id)
        .record("check_in_id", ci.id)
        .record("practice_id", saved.id)
        .record("business_event", "Practice generated");

    // Narration is best-effort; the practice stands without it.
    if let Some(file_name) = tts.synthesize(&saved.description, saved.id, &ci.mood).await {
        let mut active = saved.clone().into_active_model();
        active.audio_file = Set(Some(file_name));
        match active.update(&db).await {
            Ok(updated) => saved = updated,
            Err(e) => {
                tracing::warn!(practice_id = saved.id, "Failed to attach narration file: {}", e)
            }
        }
    }

    (
        StatusCode::OK,
        Json(json!({"state": "practice_ready", "practice": saved})),
    )
        .into_response()
}

/// Stream the narration audio for one of the user's own practices.
pub async fn serve_practice_audio(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
    Extension(tts): Extension<ElevenLabsClient>,
    Path(practice_id): Path<i32>,
) -> Response {
    let practice = match practice::Entity::find_by_id(practice_id).one(&db).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "Practice not found"})),
            )
                .into_response()
        }
        Err(e) => return super::db_error(e),
    };

    // Ownership runs practice -> check-in -> user.
    match check_in::Entity::find_by_id(practice.check_in_id).one(&db).await {
        Ok(Some(ci)) if ci.user_id == user_id => {}
        Ok(_) => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "Practice not found"})),
            )
                .into_response()
        }
        Err(e) => return super::db_error(e),
    }

    let Some(file_name) = practice.audio_file else {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "No narration for this practice"})),
        )
            .into_response();
    };

    let file = match File::open(tts.audio_path(&file_name)).await {
        Ok(file) => file,
        Err(e) => {
            tracing::error!(practice_id, "Narration file missing: {}", e);
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"error": "Narration file missing"})),
            )
                .into_response();
        }
    };

    let stream = FramedRead::new(file, BytesCodec::new());
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "audio/mpeg")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{journal_entry, practice_feedback};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::path::PathBuf;

    fn quiet_clients() -> (OpenAiClient, ElevenLabsClient) {
        (
            OpenAiClient::new(None, "gpt-3.5-turbo".to_string()),
            ElevenLabsClient::new(None, "voice".to_string(), PathBuf::from("audio")),
        )
    }

    fn todays_check_in() -> check_in::Model {
        let date = workflow::today();
        check_in::Model {
            id: 1,
            user_id: 1,
            mood: "Anxious".to_string(),
            body_feeling: Some("tight chest".to_string()),
            slot: "day".to_string(),
            check_in_date: date,
            created_at: date.and_hms_opt(9, 0, 0).unwrap(),
        }
    }

    fn existing_practice() -> practice::Model {
        practice::Model {
            id: 7,
            check_in_id: 1,
            title: "4-7-8 Calming Breath".to_string(),
            description: "Inhale for four counts...".to_string(),
            category: "breathing".to_string(),
            journal_prompt: "What do you need right now?".to_string(),
            audio_file: None,
            created_at: workflow::today().and_hms_opt(9, 1, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn practice_without_check_in_redirects_to_check_in() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<check_in::Model>::new()])
            .into_connection();
        let (ai, tts) = quiet_clients();

        let response = get_practice(
            Extension(db),
            Extension(1),
            Extension(ai),
            Extension(tts),
            Query(SlotQuery { slot: None }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/check-in"
        );
    }

    #[tokio::test]
    async fn second_visit_serves_the_persisted_practice_without_generating() {
        // No insert result is queued; creating a second row would error out
        // and fail the status assertion.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![todays_check_in()]])
            .append_query_results([vec![existing_practice()]])
            .append_query_results([Vec::<journal_entry::Model>::new()])
            .append_query_results([Vec::<practice_feedback::Model>::new()])
            .into_connection();
        let (ai, tts) = quiet_clients();

        let response = get_practice(
            Extension(db),
            Extension(1),
            Extension(ai),
            Extension(tts),
            Query(SlotQuery { slot: None }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
    }
}
