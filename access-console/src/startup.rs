use crate::config::Settings;
use crate::error::AccessError;
use crate::middleware::SessionGuard;
use crate::services::{
    ApiClient, Bootstrapper, CredentialStore, FileSessionStorage, IdentityCell, MemorySessionStorage,
    Navigator, Notifier, OrgDirectory, SessionStorage,
};
use crate::AccessConsole;
use std::sync::Arc;

/// Storage named by the settings: a JSON file when a path is configured,
/// memory otherwise.
pub fn session_storage(settings: &Settings) -> Arc<dyn SessionStorage> {
    match &settings.storage.session_file {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Persisting session to file");
            Arc::new(FileSessionStorage::new(path))
        }
        None => Arc::new(MemorySessionStorage::new()),
    }
}

/// Wire every component around one shared credential store.
pub fn build_console(
    settings: &Settings,
    storage: Arc<dyn SessionStorage>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
) -> Result<AccessConsole, AccessError> {
    let store = Arc::new(CredentialStore::load(storage));
    let identity = Arc::new(IdentityCell::new());

    let client = Arc::new(ApiClient::new(
        settings,
        store.clone(),
        identity.clone(),
        navigator.clone(),
        notifier,
    )?);

    Ok(AccessConsole {
        guard: Arc::new(SessionGuard::new(store.clone(), navigator)),
        bootstrapper: Arc::new(Bootstrapper::new(client.clone())),
        organizations: Arc::new(OrgDirectory::new(client.clone())),
        store,
        identity,
        client,
    })
}
