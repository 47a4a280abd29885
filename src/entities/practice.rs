use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The generated mindfulness practice for one check-in. Created exactly
/// once per check-in (unique check_in_id), immutable afterwards except for
/// the late-arriving narration file. The journal prompt is embedded here.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "practices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub check_in_id: i32,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub category: String,
    #[sea_orm(column_type = "Text")]
    pub journal_prompt: String,
    pub audio_file: Option<String>,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::check_in::Entity",
        from = "Column::CheckInId",
        to = "super::check_in::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    CheckIn,
    #[sea_orm(has_one = "super::practice_feedback::Entity")]
    PracticeFeedback,
}

impl Related<super::check_in::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckIn.def()
    }
}

impl Related<super::practice_feedback::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PracticeFeedback.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
