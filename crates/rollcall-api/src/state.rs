//! Application state shared by every handler.

use rollcall_core::Config;
use rollcall_db::RecordStore;
use rollcall_storage::Storage;
use rollcall_worker::TaskCoordinator;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub coordinator: TaskCoordinator,
    pub storage: Arc<dyn Storage>,
    pub records: Arc<dyn RecordStore>,
}

impl AppState {
    pub fn new(
        config: Config,
        coordinator: TaskCoordinator,
        storage: Arc<dyn Storage>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            config,
            coordinator,
            storage,
            records,
        }
    }
}
