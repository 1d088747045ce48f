pub mod property_catalog;
pub mod quotation_store;

pub use property_catalog::{CatalogProperty, InMemoryPropertyCatalog, PropertyCatalog};
pub use quotation_store::{InMemoryQuotationStore, QuotationStore};
