pub use sea_orm_migration::prelude::*;

mod iden;
mod m20250901_000001_create_core_tables;
mod m20250901_000002_create_pending_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_000001_create_core_tables::Migration),
            Box::new(m20250901_000002_create_pending_tables::Migration),
        ]
    }
}
