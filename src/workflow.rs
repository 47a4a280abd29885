use chrono::NaiveDate;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::domain::Slot;
use crate::entities::{check_in, journal_entry, practice, practice_feedback};

/// Where the user is in today's journey. Derived from row presence, never
/// stored; variant order follows the chain so states are comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    NoCheckIn,
    CheckedIn,
    PracticeReady,
    Reflected,
    FeedbackGiven,
}

/// The route a user in `state` should be sent to next.
pub fn entry_point(state: WorkflowState) -> &'static str {
    match state {
        WorkflowState::NoCheckIn => "/check-in",
        WorkflowState::CheckedIn => "/practice",
        WorkflowState::PracticeReady => "/reflect",
        WorkflowState::Reflected => "/feedback",
        WorkflowState::FeedbackGiven => "/thank",
    }
}

/// Today's check-in and its child rows, loaded once per request so every
/// handler works from the same picture.
#[derive(Debug, Default)]
pub struct DaySnapshot {
    pub check_in: Option<check_in::Model>,
    pub practice: Option<practice::Model>,
    pub journal: Option<journal_entry::Model>,
    pub feedback: Option<practice_feedback::Model>,
}

impl DaySnapshot {
    pub fn state(&self) -> WorkflowState {
        derive_state(
            self.check_in.is_some(),
            self.practice.is_some(),
            self.journal.is_some(),
            self.feedback.is_some(),
        )
    }
}

pub fn derive_state(
    has_check_in: bool,
    has_practice: bool,
    has_journal: bool,
    has_feedback: bool,
) -> WorkflowState {
    if !has_check_in {
        WorkflowState::NoCheckIn
    } else if !has_practice {
        WorkflowState::CheckedIn
    } else if !has_journal {
        WorkflowState::PracticeReady
    } else if !has_feedback {
        WorkflowState::Reflected
    } else {
        WorkflowState::FeedbackGiven
    }
}

/// The calendar date a check-in belongs to (server wall clock).
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Load the snapshot for (user, date): the slot's check-in when a slot is
/// given, otherwise the day's most recent one, plus its child rows.
pub async fn load_day(
    db: &DatabaseConnection,
    user_id: i32,
    date: NaiveDate,
    slot: Option<Slot>,
) -> Result<DaySnapshot, DbErr> {
    let mut query = check_in::Entity::find()
        .filter(check_in::Column::UserId.eq(user_id))
        .filter(check_in::Column::CheckInDate.eq(date));
    if let Some(slot) = slot {
        query = query.filter(check_in::Column::Slot.eq(slot.label()));
    }
    let check_in = query
        .order_by_desc(check_in::Column::CreatedAt)
        .one(db)
        .await?;

    let Some(ci) = &check_in else {
        return Ok(DaySnapshot::default());
    };

    let practice = practice::Entity::find()
        .filter(practice::Column::CheckInId.eq(ci.id))
        .one(db)
        .await?;
    let journal = journal_entry::Entity::find()
        .filter(journal_entry::Column::CheckInId.eq(ci.id))
        .one(db)
        .await?;
    let feedback = match &practice {
        Some(p) => {
            practice_feedback::Entity::find()
                .filter(practice_feedback::Column::PracticeId.eq(p.id))
                .one(db)
                .await?
        }
        None => None,
    };

    Ok(DaySnapshot {
        check_in,
        practice,
        journal,
        feedback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn state_follows_row_presence_down_the_chain() {
        use WorkflowState::*;
        assert_eq!(derive_state(false, false, false, false), NoCheckIn);
        assert_eq!(derive_state(true, false, false, false), CheckedIn);
        assert_eq!(derive_state(true, true, false, false), PracticeReady);
        assert_eq!(derive_state(true, true, true, false), Reflected);
        assert_eq!(derive_state(true, true, true, true), FeedbackGiven);
    }

    #[test]
    fn states_order_along_the_chain() {
        assert!(WorkflowState::NoCheckIn < WorkflowState::CheckedIn);
        assert!(WorkflowState::CheckedIn < WorkflowState::PracticeReady);
        assert!(WorkflowState::PracticeReady < WorkflowState::Reflected);
        assert!(WorkflowState::Reflected < WorkflowState::FeedbackGiven);
    }

    #[test]
    fn each_state_routes_to_its_next_step() {
        assert_eq!(entry_point(WorkflowState::NoCheckIn), "/check-in");
        assert_eq!(entry_point(WorkflowState::CheckedIn), "/practice");
        assert_eq!(entry_point(WorkflowState::PracticeReady), "/reflect");
        assert_eq!(entry_point(WorkflowState::Reflected), "/feedback");
        assert_eq!(entry_point(WorkflowState::FeedbackGiven), "/thank");
    }

    fn sample_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
    }

    fn sample_check_in() -> check_in::Model {
        check_in::Model {
            id: 1,
            user_id: 1,
            mood: "Anxious".to_string(),
            body_feeling: Some("tight chest".to_string()),
            slot: "day".to_string(),
            check_in_date: sample_date(),
            created_at: sample_date().and_hms_opt(8, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn no_check_in_yields_an_empty_snapshot() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<check_in::Model>::new()])
            .into_connection();

        let snapshot = load_day(&db, 1, sample_date(), None).await.unwrap();
        assert_eq!(snapshot.state(), WorkflowState::NoCheckIn);
        assert!(snapshot.practice.is_none());
    }

    #[tokio::test]
    async fn full_chain_snapshot_reaches_feedback_given() {
        let practice = practice::Model {
            id: 5,
            check_in_id: 1,
            title: "4-7-8 Calming Breath".to_string(),
            description: "Inhale for four counts...".to_string(),
            category: "breathing".to_string(),
            journal_prompt: "What do you need right now?".to_string(),
            audio_file: None,
            created_at: sample_date().and_hms_opt(8, 1, 0).unwrap(),
        };
        let journal = journal_entry::Model {
            id: 3,
            check_in_id: 1,
            user_id: 1,
            reflection: "I feel calmer".to_string(),
            intention: None,
            self_care: None,
            next_day_goal: None,
            created_at: sample_date().and_hms_opt(8, 5, 0).unwrap(),
            updated_at: sample_date().and_hms_opt(8, 5, 0).unwrap(),
        };
        let feedback = practice_feedback::Model {
            id: 2,
            practice_id: 5,
            user_id: 1,
            rating: 4,
            helped: Some(true),
            pacing: Some("Just right".to_string()),
            created_at: sample_date().and_hms_opt(8, 6, 0).unwrap(),
            updated_at: sample_date().and_hms_opt(8, 6, 0).unwrap(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![sample_check_in()]])
            .append_query_results([vec![practice]])
            .append_query_results([vec![journal]])
            .append_query_results([vec![feedback]])
            .into_connection();

        let snapshot = load_day(&db, 1, sample_date(), None).await.unwrap();
        assert_eq!(snapshot.state(), WorkflowState::FeedbackGiven);
        assert_eq!(snapshot.practice.unwrap().id, 5);
        assert_eq!(snapshot.feedback.unwrap().rating, 4);
    }

    #[tokio::test]
    async fn checked_in_without_children_stops_at_checked_in() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![sample_check_in()]])
            .append_query_results([Vec::<practice::Model>::new()])
            .append_query_results([Vec::<journal_entry::Model>::new()])
            .into_connection();

        let snapshot = load_day(&db, 1, sample_date(), None).await.unwrap();
        assert_eq!(snapshot.state(), WorkflowState::CheckedIn);
        assert!(snapshot.feedback.is_none());
    }
}
