use crate::session::SessionHandle;
use crate::storage::ReplayStore;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Front end to the session controller task
    pub session: SessionHandle,

    /// Used only to turn replay names into identifiers
    pub store: ReplayStore,
}

impl AppState {
    pub fn new(session: SessionHandle, store: ReplayStore) -> Self {
        Self { session, store }
    }
}
