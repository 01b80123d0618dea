use console::style;
use gitfolio::db;
use gitfolio::migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;

use crate::MigrateAction;

async fn pending_names(db: &DatabaseConnection) -> Result<Vec<String>, sea_orm::DbErr> {
    Ok(Migrator::get_pending_migrations(db)
        .await?
        .iter()
        .map(|m| m.name().to_string())
        .collect())
}

/// Names in `after` that were not pending in `before`, or the reverse.
fn changed(before: &[String], after: &[String]) -> Vec<String> {
    let (from, against) = if after.len() >= before.len() {
        (after, before)
    } else {
        (before, after)
    };
    from.iter()
        .filter(|name| !against.contains(name))
        .cloned()
        .collect()
}

/// One line per migration touched by an action.
fn summarize(verb: &str, names: &[String]) -> String {
    if names.is_empty() {
        return format!("No migrations {verb}.");
    }
    let mut out = format!("{} migration(s) {}:", names.len(), verb);
    for name in names {
        out.push_str("\n  ");
        out.push_str(name);
    }
    out
}

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;
    let before = pending_names(&db).await?;

    match action {
        MigrateAction::Up => {
            Migrator::up(&db, None).await?;
            let after = pending_names(&db).await?;
            println!("{}", summarize("applied", &changed(&before, &after)));
        }
        MigrateAction::Down => {
            Migrator::down(&db, Some(1)).await?;
            let after = pending_names(&db).await?;
            println!("{}", summarize("rolled back", &changed(&before, &after)));
        }
        MigrateAction::Status => {
            Migrator::status(&db).await?;
            if before.is_empty() {
                println!("{} sync schema is current", style("✓").green().bold());
            } else {
                println!("{} {} pending", style("!").yellow().bold(), before.len());
            }
        }
        MigrateAction::Fresh => {
            Migrator::fresh(&db).await?;
            let applied = Migrator::get_applied_migrations(&db).await?;
            let names: Vec<String> = applied.iter().map(|m| m.name().to_string()).collect();
            println!("{}", summarize("reapplied", &names));
        }
    }

    Ok(())
}
