//! OAuth grant revocation.

use base64::Engine;
use thiserror::Error;

use super::client::{GITHUB_API_VERSION, USER_AGENT, VALIDATION_TIMEOUT};
use crate::http::{HttpError, HttpMethod, HttpRequest, HttpTransport};

/// OAuth application credentials used for basic auth on the applications API.
#[derive(Clone)]
pub struct OAuthApp {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for OAuthApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthApp")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum RevokeError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("GitHub refused to revoke the grant ({status})")]
    Rejected { status: u16 },
}

/// Revoke every token of the user's grant for `app`.
///
/// `DELETE {base}/applications/{client_id}/grant`; only `204 No Content`
/// counts as success.
pub async fn revoke_grant(
    transport: &dyn HttpTransport,
    base_url: &str,
    app: &OAuthApp,
    access_token: &str,
) -> Result<(), RevokeError> {
    let url = format!(
        "{}/applications/{}/grant",
        base_url.trim_end_matches('/'),
        app.client_id
    );
    let credentials = base64::engine::general_purpose::STANDARD
        .encode(format!("{}:{}", app.client_id, app.client_secret));

    let request = HttpRequest::new(HttpMethod::Delete, &url)
        .header("Authorization", format!("Basic {credentials}"))
        .header("Accept", "application/vnd.github+json")
        .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
        .header("User-Agent", USER_AGENT)
        .json_body(&serde_json::json!({ "access_token": access_token }))
        .timeout(VALIDATION_TIMEOUT);

    let resp = transport.send(request).await?;
    if resp.status == 204 {
        tracing::info!(client_id = %app.client_id, "Revoked GitHub grant");
        Ok(())
    } else {
        tracing::warn!(client_id = %app.client_id, status = resp.status, "GitHub grant revocation rejected");
        Err(RevokeError::Rejected {
            status: resp.status,
        })
    }
}
