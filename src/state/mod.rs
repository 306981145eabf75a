mod app_state;
mod local_store;
mod secret_manager;
mod session_store;
mod storage;

pub use app_state::{AppState, StartupError};
pub use local_store::{FileStorage, LOCAL_STORE_FILE};
pub use secret_manager::KeyringStorage;
pub use session_store::SessionStore;
pub use storage::{MemoryStorage, SessionStorage, StorageError, StorageKey};
