use console::style;
use gitroster::db;
use gitroster::migration::{MIGRATION_TABLE, Migrator, MigratorTrait};

use crate::MigrateAction;

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            let pending = Migrator::get_pending_migrations(&db).await?.len();
            if pending == 0 {
                println!("Schema is up to date.");
                return Ok(());
            }
            Migrator::up(&db, None).await?;
            println!("{} {pending} migration(s)", style("applied").green().bold());
        }
        MigrateAction::Down => {
            Migrator::down(&db, Some(1)).await?;
            println!("{} last migration", style("rolled back").yellow().bold());
        }
        MigrateAction::Status => {
            let applied = Migrator::get_applied_migrations(&db).await?;
            let pending = Migrator::get_pending_migrations(&db).await?;
            println!("History table: {MIGRATION_TABLE}");
            for migration in &applied {
                println!("  {} {}", style("applied").green(), migration.name());
            }
            for migration in &pending {
                println!("  {} {}", style("pending").yellow(), migration.name());
            }
        }
        MigrateAction::Fresh => {
            tracing::warn!("Dropping every table, including the stored import");
            Migrator::fresh(&db).await?;
            println!("{} schema recreated", style("fresh").green().bold());
        }
    }

    Ok(())
}
