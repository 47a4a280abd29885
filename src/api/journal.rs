use axum::{
    extract::{Extension, Json, Query},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, IntoActiveModel, Set};
use serde_json::json;
use tracing::field::display;

use crate::domain::Slot;
use crate::entities::journal_entry;
use crate::workflow::{self, WorkflowState};

use super::SlotQuery;

#[derive(serde::Deserialize)]
pub struct ReflectRequest {
    reflection: String,
    intention: Option<String>,
    self_care: Option<String>,
    next_day_goal: Option<String>,
    slot: Option<String>,
}

/// The reflection step view: the practice's journal prompt plus any entry
/// already written today.
pub async fn get_reflection(
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
    if state < WorkflowState::PracticeReady {
        return Redirect::to(workflow::entry_point(state)).into_response();
    }

    (
        StatusCode::OK,
        Json(json!({
            "state": state,
            "practice": snapshot.practice,
            "journal": snapshot.journal,
        })),
    )
        .into_response()
}

/// Upsert the single journal entry for today's check-in. Empty reflection
/// text is rejected; structured fields are kept only when they match the
/// check-in's slot.
pub async fn submit_reflection(
    Extension(db): Extension<DatabaseConnection>,
    Extension(user_id): Extension<i32>,
    Json(payload): Json<ReflectRequest>,
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
    if state < WorkflowState::PracticeReady {
        return Redirect::to(workflow::entry_point(state)).into_response();
    }
    let Some(ci) = &snapshot.check_in else {
        return Redirect::to(workflow::entry_point(state)).into_response();
    };

    let reflection = payload.reflection.trim().to_string();
    if reflection.is_empty() {
        return super::invalid_input("Reflection text is required");
    }

    let ci_slot = ci.slot.parse::<Slot>().unwrap_or_default();
    let (intention, self_care, next_day_goal) = slot_fields(
        ci_slot,
        payload.intention,
        payload.self_care,
        payload.next_day_goal,
    );

    let now = chrono::Utc::now().naive_utc();
    let saved = match snapshot.journal {
        Some(existing) => {
            update_entry(
                &db,
                existing,
                reflection,
                intention,
                self_care,
                next_day_goal,
                now,
            )
            .await
        }
        None => {
            let new_entry = journal_entry::ActiveModel {
                check_in_id: Set(ci.id),
                user_id: Set(user_id),
                reflection: Set(reflection.clone()),
                intention: Set(intention.clone()),
                self_care: Set(self_care.clone()),
                next_day_goal: Set(next_day_goal.clone()),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            };
            match new_entry.insert(&db).await {
                Ok(entry) => {
                    crate::metrics::increment_journal_entries();
                    Ok(entry)
                }
                Err(e) if super::is_unique_violation(&e) => {
                    // Lost a double-submit race; the invariant is one entry
                    // per check-in, so update the winner.
                    match workflow::load_day(&db, user_id, workflow::today(), slot).await {
                        Ok(fresh) => match fresh.journal {
                            Some(existing) => {
                                update_entry(
                                    &db,
                                    existing,
                                    reflection,
                                    intention,
                                    self_care,
                                    next_day_goal,
                                    now,
                                )
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
        Ok(entry) => {
            tracing::Span::current()
                .record("table", "journal_entries")
                .record("action", "save_reflection")
                .record("user_id", user_id)
                .record("check_in_id", ci.id)
                .record("business_event", "Reflection saved");

            (
                StatusCode::OK,
                Json(json!({"state": "reflected", "journal": entry})),
            )
                .into_response()
        }
        Err(e) => {
            tracing::Span::current()
                .record("table", "journal_entries")
                .record("action", "save_reflection_error")
                .record("error", display(&e));
            super::db_error(e)
        }
    }
}

async fn update_entry(
    db: &DatabaseConnection,
    existing: journal_entry::Model,
    reflection: String,
    intention: Option<String>,
    self_care: Option<String>,
    next_day_goal: Option<String>,
    now: chrono::NaiveDateTime,
) -> Result<journal_entry::Model, DbErr> {
    let mut active = existing.into_active_model();
    active.reflection = Set(reflection);
    active.intention = Set(intention);
    active.self_care = Set(self_care);
    active.next_day_goal = Set(next_day_goal);
    active.updated_at = Set(now);
    active.update(db).await
}

/// Keep only the structured fields that belong to the check-in's slot:
/// intention for morning, self-care and next-day goal for night.
fn slot_fields(
    slot: Slot,
    intention: Option<String>,
    self_care: Option<String>,
    next_day_goal: Option<String>,
) -> (Option<String>, Option<String>, Option<String>) {
    let clean = |v: Option<String>| {
        v.map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    };
    match slot {
        Slot::Morning => (clean(intention), None, None),
        Slot::Night => (None, clean(self_care), clean(next_day_goal)),
        Slot::Day => (None, None, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{check_in, practice, practice_feedback};
    use axum::http::StatusCode;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn empty_reflection_is_rejected_and_nothing_is_written() {
        // Only the snapshot queries are queued; an insert would error and
        // change the status.
        let date = workflow::today();
        let ci = check_in::Model {
            id: 1,
            user_id: 1,
            mood: "Sad".to_string(),
            body_feeling: None,
            slot: "day".to_string(),
            check_in_date: date,
            created_at: date.and_hms_opt(20, 0, 0).unwrap(),
        };
        let practice = practice::Model {
            id: 4,
            check_in_id: 1,
            title: "Self-Compassion Hand on Heart".to_string(),
            description: "Place one or both hands over your heart...".to_string(),
            category: "meditation".to_string(),
            journal_prompt: "What would you say to a dear friend?".to_string(),
            audio_file: None,
            created_at: date.and_hms_opt(20, 1, 0).unwrap(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![ci]])
            .append_query_results([vec![practice]])
            .append_query_results([Vec::<journal_entry::Model>::new()])
            .append_query_results([Vec::<practice_feedback::Model>::new()])
            .into_connection();

        let response = submit_reflection(
            Extension(db),
            Extension(1),
            Json(ReflectRequest {
                reflection: "   ".to_string(),
                intention: None,
                self_care: None,
                next_day_goal: None,
                slot: None,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn morning_keeps_only_the_intention() {
        let (intention, self_care, goal) = slot_fields(
            Slot::Morning,
            Some("stay present".to_string()),
            Some("tea".to_string()),
            Some("sleep early".to_string()),
        );
        assert_eq!(intention.as_deref(), Some("stay present"));
        assert!(self_care.is_none());
        assert!(goal.is_none());
    }

    #[test]
    fn night_keeps_self_care_and_goal() {
        let (intention, self_care, goal) = slot_fields(
            Slot::Night,
            Some("stay present".to_string()),
            Some("took a walk".to_string()),
            Some("call a friend".to_string()),
        );
        assert!(intention.is_none());
        assert_eq!(self_care.as_deref(), Some("took a walk"));
        assert_eq!(goal.as_deref(), Some("call a friend"));
    }

    #[test]
    fn unslotted_check_ins_carry_no_structured_fields() {
        let (intention, self_care, goal) = slot_fields(
            Slot::Day,
            Some("stay present".to_string()),
            Some("tea".to_string()),
            Some("sleep early".to_string()),
        );
        assert!(intention.is_none() && self_care.is_none() && goal.is_none());
    }

    #[test]
    fn blank_structured_fields_become_none() {
        let (intention, _, _) = slot_fields(Slot::Morning, Some("   ".to_string()), None, None);
        assert!(intention.is_none());
    }
}
