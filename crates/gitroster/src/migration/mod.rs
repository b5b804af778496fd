//! Schema for the import record and the directory tables.
//!
//! Applied by [`crate::connect_and_migrate`] and the `gitroster migrate`
//! command. Migration history lives in `gitroster_migrations` so the schema
//! can share a database with other applications.

pub use sea_orm_migration::prelude::*;

mod m20261018_000001_create_schema;

/// Name of the table recording applied migrations.
pub const MIGRATION_TABLE: &str = "gitroster_migrations";

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20261018_000001_create_schema::Migration)]
    }

    fn migration_table_name() -> SeaRc<dyn Iden> {
        SeaRc::new(Alias::new(MIGRATION_TABLE))
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn up_then_down_leaves_nothing_pending_then_everything() {
        let db = crate::db::connect("sqlite::memory:").await.unwrap();
        let total = Migrator::migrations().len();

        Migrator::up(&db, None).await.unwrap();
        assert!(Migrator::get_pending_migrations(&db).await.unwrap().is_empty());
        assert_eq!(Migrator::get_applied_migrations(&db).await.unwrap().len(), total);

        Migrator::down(&db, None).await.unwrap();
        assert_eq!(Migrator::get_pending_migrations(&db).await.unwrap().len(), total);
    }
}
