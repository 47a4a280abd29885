use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PracticeFeedback::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PracticeFeedback::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PracticeFeedback::PracticeId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(PracticeFeedback::UserId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PracticeFeedback::Rating).integer().not_null())
                    .col(ColumnDef::new(PracticeFeedback::Helped).boolean().null())
                    .col(ColumnDef::new(PracticeFeedback::Pacing).string().null())
                    .col(
                        ColumnDef::new(PracticeFeedback::CreatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PracticeFeedback::UpdatedAt)
                            .date_time()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-practice_feedback-practice_id")
                            .from(PracticeFeedback::Table, PracticeFeedback::PracticeId)
                            .to(Practices::Table, Practices::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-practice_feedback-user_id")
                            .from(PracticeFeedback::Table, PracticeFeedback::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PracticeFeedback::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PracticeFeedback {
    Table,
    Id,
    PracticeId,
    UserId,
    Rating,
    Helped,
    Pacing,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Practices {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
