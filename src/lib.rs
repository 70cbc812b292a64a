pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod progress;
pub mod recommend;
pub mod state;
pub mod storage;

// Crate-internal tests live beside the integration tests
#[cfg(test)]
#[path = "../tests/internal/error_handling_test.rs"]
mod error_handling_test;

use std::sync::Arc;

use crate::catalog::model::Catalog;
use crate::config::settings::{app_config_source, get_app_config, AppConfig};
use crate::error::PawError;
use crate::recommend::insights::InsightRules;
use crate::state::app::ProgressStore;
use crate::storage::FileKvStore;

/// Build the store the host app shares with its screens, using the
/// process-wide config.
pub fn bootstrap() -> Result<ProgressStore, PawError> {
    let config = get_app_config();
    logging::init_logging(&config.log_filter);
    tracing::info!("PawTrack core starting");
    app_config_source().log();
    bootstrap_with(config)
}

/// Same as [`bootstrap`] with an explicit config; does not touch logging.
pub fn bootstrap_with(config: &AppConfig) -> Result<ProgressStore, PawError> {
    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load_from_path(path)?,
        None => Catalog::builtin()?,
    };
    tracing::info!(
        categories = catalog.categories.len(),
        lessons = catalog.total_lessons(),
        "Catalog loaded"
    );

    let storage = Arc::new(FileKvStore::new(config.resolved_data_dir()));
    tracing::info!(path = ?storage.dir(), "Using data directory");

    Ok(ProgressStore::open(catalog, storage).with_rules(InsightRules::from_config(config)))
}
