use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The user's written reflection for one check-in, updated in place on
/// resubmission. The structured fields are slot-specific: intention for
/// morning, self_care and next_day_goal for night.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "journal_entries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub check_in_id: i32,
    pub user_id: i32,
    #[sea_orm(column_type = "Text")]
    pub reflection: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub intention: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub self_care: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub next_day_goal: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
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
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::check_in::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckIn.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
