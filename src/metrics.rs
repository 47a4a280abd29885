use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};

use crate::entities::{check_in, journal_entry, practice, user};

/// Seed the row-count gauges from the database at startup.
pub async fn init_metrics(db: &DatabaseConnection) {
    let user_count = user::Entity::find().count(db).await.unwrap_or(0);
    metrics::gauge!("stillpoint_users_total").set(user_count as f64);

    let check_in_count = check_in::Entity::find().count(db).await.unwrap_or(0);
    metrics::gauge!("stillpoint_checkins_total").set(check_in_count as f64);

    let practice_count = practice::Entity::find().count(db).await.unwrap_or(0);
    metrics::gauge!("stillpoint_practices_total").set(practice_count as f64);

    let journal_count = journal_entry::Entity::find().count(db).await.unwrap_or(0);
    metrics::gauge!("stillpoint_journal_entries_total").set(journal_count as f64);

    tracing::info!(
        "Initialized metrics: Users={}, CheckIns={}, Practices={}, JournalEntries={}",
        user_count,
        check_in_count,
        practice_count,
        journal_count
    );
}

pub fn increment_check_ins(mood: &str) {
    metrics::gauge!("stillpoint_checkins_total").increment(1.0);
    metrics::counter!("stillpoint_checkins_by_mood_total", "mood" => mood.to_string())
        .increment(1);
}

/// source is "model" or "fallback".
pub fn increment_practices_generated(source: &str) {
    metrics::gauge!("stillpoint_practices_total").increment(1.0);
    metrics::counter!("stillpoint_practices_generated_total", "source" => source.to_string())
        .increment(1);
}

/// outcome is "saved" or "failed".
pub fn increment_narration(outcome: &str) {
    metrics::counter!("stillpoint_narration_total", "outcome" => outcome.to_string())
        .increment(1);
}

pub fn increment_journal_entries() {
    metrics::gauge!("stillpoint_journal_entries_total").increment(1.0);
}

pub fn increment_feedback(rating: i32) {
    metrics::counter!("stillpoint_feedback_total", "rating" => rating.to_string()).increment(1);
}
