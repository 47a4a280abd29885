use sea_orm_migration::prelude::*;

mod m20260601_000001_create_users_and_check_ins;
mod m20260608_000001_create_practices;
mod m20260615_000001_create_journal_entries;
mod m20260622_000001_create_practice_feedback;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260601_000001_create_users_and_check_ins::Migration),
            Box::new(m20260608_000001_create_practices::Migration),
            Box::new(m20260615_000001_create_journal_entries::Migration),
            Box::new(m20260622_000001_create_practice_feedback::Migration),
        ]
    }
}
