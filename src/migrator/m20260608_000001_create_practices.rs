use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The journal prompt lives on the practice row rather than in a
        // table of its own.
        manager
            .create_table(
                Table::create()
                    .table(Practices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Practices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Practices::CheckInId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Practices::Title).string().not_null())
                    .col(ColumnDef::new(Practices::Description).text().not_null())
                    .col(ColumnDef::new(Practices::Category).string().not_null())
                    .col(ColumnDef::new(Practices::JournalPrompt).text().not_null())
                    .col(ColumnDef::new(Practices::AudioFile).string().null())
                    .col(ColumnDef::new(Practices::CreatedAt).date_time().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-practice-check_in_id")
                            .from(Practices::Table, Practices::CheckInId)
                            .to(CheckIns::Table, CheckIns::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Practices::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Practices {
    Table,
    Id,
    CheckInId,
    Title,
    Description,
    Category,
    JournalPrompt,
    AudioFile,
    CreatedAt,
}

#[derive(DeriveIden)]
enum CheckIns {
    Table,
    Id,
}
