use secrecy::Secret;
use serde::Deserialize;
use service_core::config::{configuration_directory, load_layered};
use service_core::error::CoreError;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub api: ApiSettings,
    #[serde(default)]
    pub routes: RouteSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub messages: MessageSettings,
    #[serde(default)]
    pub login: LoginSettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApiSettings {
    /// Origin the `/api/` and `/assets/` paths are resolved against.
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub endpoints: EndpointSettings,
}

impl ApiSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
            endpoints: EndpointSettings::default(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Backend endpoint paths, relative to the `/api/` prefix.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct EndpointSettings {
    pub login: String,
    pub refresh: String,
    pub logout: String,
    pub identity: String,
    pub menus: String,
    pub permissions: String,
    pub organizations: String,
    pub roles: String,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            login: "auth/login".to_string(),
            refresh: "auth/refresh".to_string(),
            logout: "auth/logout".to_string(),
            identity: "auth/me".to_string(),
            menus: "auth/menus".to_string(),
            permissions: "auth/permissions".to_string(),
            organizations: "organizations".to_string(),
            roles: "roles".to_string(),
        }
    }
}

/// Console routes the navigator resolves destinations to.
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct RouteSettings {
    pub login: String,
    pub home: String,
    pub forbidden: String,
    pub not_found: String,
    pub server_error: String,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            home: "/".to_string(),
            forbidden: "/exception/403".to_string(),
            not_found: "/exception/404".to_string(),
            server_error: "/exception/500".to_string(),
        }
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct StorageSettings {
    /// Where the session is persisted. Unset keeps it in memory only.
    pub session_file: Option<PathBuf>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct TelemetrySettings {
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub json: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            service_name: "access-console".to_string(),
            log_level: "info".to_string(),
            otlp_endpoint: None,
            json: false,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct MessageSettings {
    /// Shown when a failure carries no backend message.
    pub fallback_error: String,
    /// Shown to super-admins when no parent organization can be offered.
    pub root_org_hint: String,
    /// Shown when the organization list could not be loaded.
    pub org_lookup_warning: String,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            fallback_error: "Request failed, please try again later".to_string(),
            root_org_hint: "No parent organization available: manually enter a code or leave blank to create a root organization".to_string(),
            org_lookup_warning: "Organization list could not be loaded; showing organizations within your scope only".to_string(),
        }
    }
}

/// Credentials used by the command-line entry point.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct LoginSettings {
    pub username: Option<String>,
    pub password: Option<Secret<String>>,
}

impl Settings {
    /// Settings pointing at `base_url` with every other section defaulted.
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            api: ApiSettings::new(base_url),
            routes: RouteSettings::default(),
            storage: StorageSettings::default(),
            telemetry: TelemetrySettings::default(),
            messages: MessageSettings::default(),
            login: LoginSettings::default(),
        }
    }
}

pub fn get_configuration() -> Result<Settings, CoreError> {
    let configuration_directory = configuration_directory("access-console")?;
    load_layered(&configuration_directory)
}
