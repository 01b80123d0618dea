//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gitfolio::github::GitHubUser;
use gitfolio::http::{HttpError, HttpRequest, HttpResponse, HttpTransport};
use gitfolio::{GithubProfileModel, SyncEngine, SyncSettings, connect_and_migrate, profile};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use uuid::Uuid;

pub const BASE: &str = "https://api.test";
pub const REPOS_URL: &str = "https://api.test/user/repos?per_page=100";

/// Upper bound for any single sync in tests; exceeding it means a hang.
pub const SYNC_TIMEOUT: Duration = Duration::from_secs(10);

type Script = VecDeque<Result<HttpResponse, HttpError>>;

/// Transport answering GETs from a per-URL script.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    routes: Arc<Mutex<HashMap<String, Script>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: impl Into<String>, response: HttpResponse) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.into())
            .or_default()
            .push_back(Ok(response));
    }

    pub fn respond_json(&self, url: impl Into<String>, body: Value) {
        self.respond(url, json_response(200, &body));
    }

    pub fn fail(&self, url: impl Into<String>, error: HttpError) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.into())
            .or_default()
            .push_back(Err(error));
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        let next = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&url)
            .and_then(VecDeque::pop_front);
        next.unwrap_or_else(|| {
            Err(HttpError::NoScriptedResponse {
                method: "GET".to_string(),
                url,
            })
        })
    }
}

/// Transport whose every request panics.
pub struct PanickingTransport;

#[async_trait]
impl HttpTransport for PanickingTransport {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, HttpError> {
        panic!("connection pool poisoned");
    }
}

pub fn json_response(status: u16, body: &Value) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        body: body.to_string().into_bytes(),
    }
}

pub fn with_header(mut response: HttpResponse, name: &str, value: &str) -> HttpResponse {
    response.headers.push((name.to_string(), value.to_string()));
    response
}

pub fn repo(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "full_name": format!("octocat/{name}"),
        "html_url": format!("https://github.com/octocat/{name}"),
        "stargazers_count": 1,
        "language": "Rust",
        "created_at": "2020-01-01T00:00:00Z"
    })
}

pub fn commits_url(full_name: &str) -> String {
    format!("{BASE}/repos/{full_name}/commits?author=octocat&per_page=100")
}

pub fn settings() -> SyncSettings {
    SyncSettings::default()
        .with_api_base_url(BASE)
        .with_requests_per_second(None)
}

pub struct Fixture {
    pub db: Arc<DatabaseConnection>,
    pub user_id: Uuid,
    pub profile: GithubProfileModel,
}

/// In-memory database with migrations applied and one linked profile.
pub async fn fixture() -> Fixture {
    let db = connect_and_migrate("sqlite::memory:")
        .await
        .expect("Failed to create test database");
    let user: GitHubUser = serde_json::from_value(json!({"id": 583231, "login": "octocat"}))
        .expect("user payload");
    let user_id = Uuid::new_v4();
    let profile = profile::upsert_from_login(&db, user_id, &user, "gho_test")
        .await
        .expect("Failed to link profile");
    Fixture {
        db: Arc::new(db),
        user_id,
        profile,
    }
}

pub fn engine(fixture: &Fixture, transport: Arc<dyn HttpTransport>) -> SyncEngine {
    SyncEngine::new(Arc::clone(&fixture.db), transport, settings())
}
