#![allow(dead_code)]

use access_console::AccessConsole;
use access_console::config::Settings;
use access_console::models::{Organization, Session};
use access_console::services::{HistoryNavigator, MemorySessionStorage, RecordingNotifier};
use access_console::startup::build_console;
use serde_json::{Value, json};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_TOKEN: &str = "test-access-token";
pub const TEST_REFRESH_TOKEN: &str = "test-refresh-token";

pub struct TestConsole {
    pub server: MockServer,
    pub console: AccessConsole,
    pub navigator: Arc<HistoryNavigator>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestConsole {
    /// Console with an empty credential store.
    pub async fn spawn() -> Self {
        Self::spawn_with(MemorySessionStorage::new()).await
    }

    /// Console that starts with a valid session.
    pub async fn spawn_signed_in() -> Self {
        Self::spawn_with(MemorySessionStorage::with_session(
            Session::new(TEST_TOKEN, "/login")
                .with_refresh_token(Some(TEST_REFRESH_TOKEN.to_string())),
        ))
        .await
    }

    pub async fn spawn_with(storage: MemorySessionStorage) -> Self {
        Self::spawn_configured(storage, |_| {}).await
    }

    /// Console whose settings are adjusted after pointing at the mock server.
    pub async fn spawn_configured(
        storage: MemorySessionStorage,
        configure: impl FnOnce(&mut Settings),
    ) -> Self {
        let server = MockServer::start().await;
        let mut settings = Settings::for_base_url(server.uri());
        configure(&mut settings);

        let navigator = Arc::new(HistoryNavigator::new(settings.routes.clone()));
        let notifier = Arc::new(RecordingNotifier::new());

        let console = build_console(
            &settings,
            Arc::new(storage),
            navigator.clone(),
            notifier.clone(),
        )
        .expect("Failed to build console");

        Self {
            server,
            console,
            navigator,
            notifier,
        }
    }

    pub async fn mount(&self, http_method: &str, route: &str, status: u16, body: Value) {
        Mock::given(method(http_method))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or_default()
    }

    /// Identity, menus and permissions for a signed-in user.
    pub async fn mount_profile(&self, role_level: u8, org_code: &str, permission_codes: &[&str]) {
        self.mount(
            "GET",
            "/api/auth/me",
            200,
            json!({
                "code": 200,
                "data": {
                    "id": 7,
                    "username": "ada",
                    "display_name": "Ada Lovelace",
                    "org_code": org_code,
                    "role_code": "ROLE",
                    "role_level": role_level
                }
            }),
        )
        .await;

        self.mount(
            "GET",
            "/api/auth/menus",
            200,
            json!({
                "success": true,
                "data": [
                    { "id": 1, "name": "Organizations", "path": "/system/organizations", "permission_code": "org:list" },
                    { "id": 2, "name": "Permissions", "path": "/system/permissions", "permission_code": "perm:list" }
                ]
            }),
        )
        .await;

        let permissions: Vec<Value> = permission_codes
            .iter()
            .enumerate()
            .map(|(id, code)| {
                json!({
                    "id": id,
                    "permission_code": code,
                    "permission_name": code,
                    "api_path": "/api/organizations*",
                    "api_method": "GET",
                    "status": 1
                })
            })
            .collect();
        self.mount(
            "GET",
            "/api/auth/permissions",
            200,
            json!({ "code": 200, "data": permissions }),
        )
        .await;
    }

    pub async fn mount_organizations(&self, orgs: &[Organization]) {
        self.mount(
            "GET",
            "/api/organizations",
            200,
            json!({ "code": 200, "data": orgs }),
        )
        .await;
    }
}

pub fn sample_organizations() -> Vec<Organization> {
    vec![
        Organization::new("05", "Province", None),
        Organization::new("0501", "City A", Some("05")),
        Organization::new("050101", "District A1", Some("0501")),
        Organization::new("0502", "City B", Some("05")),
    ]
}
