pub mod api_client;
pub mod bootstrap;
pub mod credential_store;
pub mod identity;
pub mod navigation;
pub mod normalizer;
pub mod org_directory;
pub mod screen;

pub use api_client::{ApiClient, RequestOptions};
pub use bootstrap::Bootstrapper;
pub use credential_store::{CredentialStore, FileSessionStorage, MemorySessionStorage, SessionStorage};
pub use identity::IdentityCell;
pub use navigation::{
    Destination, HistoryNavigator, Navigator, Notice, NoticeLevel, Notifier, RecordingNotifier,
    TracingNotifier,
};
pub use org_directory::{OrgDirectory, OrgListing, ParentChoices};
pub use screen::ScreenScope;
