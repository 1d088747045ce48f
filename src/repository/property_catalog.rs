use std::collections::HashMap;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::quotation::is_supported_area;

/// A property the agency manages, as exposed by the listings catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProperty {
    pub id: String,
    pub title: String,
    pub usage: Option<String>,
    pub property_type: Option<String>,
    pub neighborhood: Option<String>,
    pub area_m2: Option<Decimal>,
}

/// Read-only lookup of managed properties by identifier.
pub trait PropertyCatalog: Send + Sync {
    fn find_property(&self, property_id: &str) -> AppResult<Option<CatalogProperty>>;
}

#[derive(Debug, Default)]
pub struct InMemoryPropertyCatalog {
    properties: HashMap<String, CatalogProperty>,
}

impl InMemoryPropertyCatalog {
    /// Indexes `properties` by trimmed id. Fails on an entry whose area is not
    /// positive or exceeds what a quotation can price.
    pub fn new(properties: impl IntoIterator<Item = CatalogProperty>) -> AppResult<Self> {
        let mut indexed = HashMap::new();
        for property in properties {
            if let Some(area_m2) = property.area_m2 {
                if !is_supported_area(area_m2) {
                    return Err(AppError::Dependency(format!(
                        "Property catalog entry {} has an unsupported area of {area_m2} m2",
                        property.id
                    )));
                }
            }
            indexed.insert(property.id.trim().to_string(), property);
        }
        Ok(Self {
            properties: indexed,
        })
    }

    /// Loads a JSON array of catalog entries.
    pub fn from_json_file(path: &Path) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|error| {
            AppError::Dependency(format!(
                "Could not read property catalog {}: {error}",
                path.display()
            ))
        })?;
        Self::from_json_str(&raw).map_err(|error| {
            AppError::Dependency(format!(
                "Invalid property catalog {}: {error}",
                path.display()
            ))
        })
    }

    pub fn from_json_str(raw: &str) -> AppResult<Self> {
        let properties: Vec<CatalogProperty> = serde_json::from_str(raw)
            .map_err(|error| AppError::Dependency(error.to_string()))?;
        Self::new(properties)
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl PropertyCatalog for InMemoryPropertyCatalog {
    fn find_property(&self, property_id: &str) -> AppResult<Option<CatalogProperty>> {
        Ok(self.properties.get(property_id.trim()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_entries_from_json() {
        let catalog = InMemoryPropertyCatalog::from_json_str(
            r#"[
                {"id": "prop-1", "title": "Villa in Al Narjis", "areaM2": 420},
                {"id": "prop-2", "title": "Office tower floor", "usage": "Commercial"}
            ]"#,
        )
        .expect("valid catalog");

        assert_eq!(catalog.len(), 2);
        let villa = catalog
            .find_property(" prop-1 ")
            .expect("lookup succeeds")
            .expect("property exists");
        assert_eq!(villa.area_m2, Some(Decimal::from(420)));
        assert_eq!(catalog.find_property("prop-3").expect("lookup succeeds"), None);
    }

    #[test]
    fn rejects_malformed_catalog() {
        assert!(InMemoryPropertyCatalog::from_json_str(r#"{"id": "prop-1"}"#).is_err());
    }

    #[test]
    fn rejects_areas_a_quotation_cannot_price() {
        for area in ["100000000000000000", "0", "-12"] {
            let raw = format!(r#"[{{"id": "prop-1", "title": "Land plot", "areaM2": {area}}}]"#);
            let error = InMemoryPropertyCatalog::from_json_str(&raw)
                .expect_err("area must be rejected");
            assert!(matches!(error, AppError::Dependency(ref message) if message.contains("prop-1")));
        }

        let catalog = InMemoryPropertyCatalog::from_json_str(
            r#"[{"id": "prop-1", "title": "Land plot", "areaM2": 1000000000000}]"#,
        )
        .expect("largest supported area loads");
        assert_eq!(catalog.len(), 1);
    }
}
