use std::sync::Arc;

use crate::import::Importer;
use crate::storage::StatsStore;

#[derive(Clone)]
pub struct AppState {
    pub store: StatsStore,
    pub importer: Arc<Importer>,
}
