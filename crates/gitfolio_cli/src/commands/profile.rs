use std::sync::Arc;

use console::style;
use gitfolio::auth_cache::{NoopCache, TokenValidator};
use gitfolio::http::HttpTransport;
use gitfolio::{SyncEngine, SyncSettings};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use super::transport;

pub(crate) async fn handle_refresh(
    db: Arc<DatabaseConnection>,
    settings: SyncSettings,
    user_id: Uuid,
) -> Result<(), Box<dyn std::error::Error>> {
    let transport: Arc<dyn HttpTransport> = transport(settings.request_timeout)?;
    let engine = SyncEngine::new(db, transport, settings);
    let profile = engine.refresh_profile(user_id).await?;

    println!(
        "{} Refreshed {} ({} public repos, {} followers)",
        style("✓").green().bold(),
        style(&profile.github_username).cyan(),
        profile.public_repos,
        profile.followers
    );
    Ok(())
}

pub(crate) async fn handle_validate(
    db: &DatabaseConnection,
    settings: SyncSettings,
    user_id: Uuid,
) -> Result<(), Box<dyn std::error::Error>> {
    let transport: Arc<dyn HttpTransport> = transport(settings.validation_timeout)?;
    // One-shot process: nothing would ever read a cached answer.
    let validator = TokenValidator::new(transport, Arc::new(NoopCache))
        .with_base_url(&settings.api_base_url)
        .with_timeout(settings.validation_timeout);

    if validator.check_user(db, user_id).await? {
        println!("{} Token is valid", style("✓").green().bold());
        Ok(())
    } else {
        println!(
            "{} No working GitHub token for {}",
            style("✗").red().bold(),
            user_id
        );
        std::process::exit(1);
    }
}
