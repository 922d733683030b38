//! Side-effect seams for the console: where to go next and what to tell the
//! user. Consumers take these as trait objects so tests can record them.

use crate::config::RouteSettings;
use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Destination {
    /// Login entry point; carries the session's own login URL when known.
    Login(String),
    Forbidden,
    NotFound,
    ServerError,
    Home,
    Back,
}

impl Destination {
    pub fn route<'a>(&'a self, routes: &'a RouteSettings) -> &'a str {
        match self {
            Destination::Login(url) if !url.is_empty() => url,
            Destination::Login(_) => &routes.login,
            Destination::Forbidden => &routes.forbidden,
            Destination::NotFound => &routes.not_found,
            Destination::ServerError => &routes.server_error,
            Destination::Home => &routes.home,
            Destination::Back => "..",
        }
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: Destination);
}

/// Navigator that keeps the sequence of visited destinations and resolves
/// each to a console route.
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    routes: RouteSettings,
    history: Mutex<Vec<Destination>>,
}

impl HistoryNavigator {
    pub fn new(routes: RouteSettings) -> Self {
        Self {
            routes,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn history(&self) -> Vec<Destination> {
        self.history
            .lock()
            .map(|history| history.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<Destination> {
        self.history
            .lock()
            .ok()
            .and_then(|history| history.last().cloned())
    }

    /// Route path of the most recent destination.
    pub fn current_route(&self) -> Option<String> {
        self.last()
            .map(|destination| destination.route(&self.routes).to_string())
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, destination: Destination) {
        tracing::info!(
            destination = ?destination,
            route = destination.route(&self.routes),
            "Navigating"
        );
        if let Ok(mut history) = self.history.lock() {
            history.push(destination);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// Emits notices as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => tracing::info!(notice = message),
            NoticeLevel::Warning => tracing::warn!(notice = message),
            NoticeLevel::Error => tracing::error!(notice = message),
        }
    }
}

/// Keeps notices in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .map(|notices| notices.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self, level: NoticeLevel) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|notice| notice.level == level)
            .map(|notice| notice.message)
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(Notice {
                level,
                message: message.to_string(),
            });
        }
    }
}
