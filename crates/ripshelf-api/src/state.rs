use std::sync::Arc;

use ripshelf_driver::Catalog;
use ripshelf_store::JobStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn JobStore>,
    /// None when no catalog token is configured; poster lookups are skipped.
    pub catalog: Option<Arc<dyn Catalog>>,
}
