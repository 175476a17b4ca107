use dlb_assign::Assigner;
use dlb_store::Store;

/// Shared `actix-web` application state: the two handles every handler
/// needs to read and mutate deliberation state.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub assigner: Assigner,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        let assigner = Assigner::new(store.clone());
        Self { store, assigner }
    }
}
