use std::path::Path;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::repository::{
    InMemoryPropertyCatalog, InMemoryQuotationStore, PropertyCatalog, QuotationStore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<dyn PropertyCatalog>,
    pub quotations: Arc<dyn QuotationStore>,
}

impl AppState {
    pub fn build(config: AppConfig) -> Result<Self, AppError> {
        let catalog = match config.property_catalog_path.as_deref() {
            Some(path) => {
                let catalog = InMemoryPropertyCatalog::from_json_file(Path::new(path))?;
                tracing::info!(path, properties = catalog.len(), "Property catalog loaded");
                catalog
            }
            None => {
                tracing::warn!(
                    "PROPERTY_CATALOG_PATH is not set; managed-property quotations will be rejected"
                );
                InMemoryPropertyCatalog::default()
            }
        };

        Ok(Self::with_parts(
            config,
            Arc::new(catalog),
            Arc::new(InMemoryQuotationStore::new()),
        ))
    }

    pub fn with_parts(
        config: AppConfig,
        catalog: Arc<dyn PropertyCatalog>,
        quotations: Arc<dyn QuotationStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            catalog,
            quotations,
        }
    }
}
