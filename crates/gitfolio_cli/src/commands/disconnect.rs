use console::style;
use gitfolio::github::revoke_grant;
use gitfolio::profile;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use super::transport;
use crate::config::Config;

pub(crate) async fn handle_disconnect(
    db: &DatabaseConnection,
    config: &Config,
    user_id: Uuid,
    revoke: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // Fail on missing app credentials before anything is deleted.
    let app = if revoke {
        Some(config.oauth_app()?)
    } else {
        None
    };

    let removed = profile::disconnect(db, user_id).await?;
    println!(
        "{} Disconnected {} and deleted its synced data",
        style("✓").green().bold(),
        style(&removed.github_username).cyan()
    );

    if let (Some(app), Some(token)) = (app, removed.access_token.as_deref()) {
        let settings = config.sync_settings(None, false);
        let transport = transport(settings.validation_timeout)?;
        match revoke_grant(transport.as_ref(), &settings.api_base_url, &app, token).await {
            Ok(()) => println!("{} Revoked the GitHub grant", style("✓").green().bold()),
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "Failed to revoke GitHub grant");
                eprintln!(
                    "{} Could not revoke the GitHub grant: {}",
                    style("⚠").yellow().bold(),
                    e
                );
            }
        }
    }
    Ok(())
}
