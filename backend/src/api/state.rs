//! Shared application state for the HTTP handlers.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::api::logs::log_warning;
use crate::automap::AutomapClient;
use crate::catalog::FieldCatalog;
use crate::config::Settings;
use crate::registry::ConfigRegistry;

/// State injected into every handler through axum's `State`.
#[derive(Debug)]
pub struct AppState {
    pub settings: Settings,
    pub catalog: FieldCatalog,
    pub registry: RwLock<ConfigRegistry>,
    /// Present when an API key is configured
    pub automap: Option<AutomapClient>,
}

impl AppState {
    /// Built-in catalog, registry in the configured directory, AI client if possible.
    pub fn from_settings(settings: Settings) -> Self {
        let catalog = FieldCatalog::builtin().with_default_entity(&settings.default_entity);
        if catalog.get_fields(&settings.default_entity).is_err() {
            log_warning(format!(
                "Default entity '{}' is not in the catalog; unknown entities will not fall back",
                settings.default_entity
            ));
        }
        let registry = ConfigRegistry::with_dir(&settings.registry_dir);
        let automap = AutomapClient::from_settings(&settings).ok();
        Self::new(settings, catalog, registry, automap)
    }

    pub fn new(
        settings: Settings,
        catalog: FieldCatalog,
        registry: ConfigRegistry,
        automap: Option<AutomapClient>,
    ) -> Self {
        Self {
            settings,
            catalog,
            registry: RwLock::new(registry),
            automap,
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
