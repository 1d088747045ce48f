//! Property type lists offered for each usage when a quotation describes a
//! property that is not managed by the agency.

use super::PropertyUsage;

/// Sentinel accepted for either usage; requires `otherPropertyTypeDetail`.
pub const OTHER_PROPERTY_TYPE: &str = "Other";

pub const RESIDENTIAL_PROPERTY_TYPES: &[&str] = &[
    "Apartment",
    "Villa",
    "Duplex",
    "Townhouse",
    "Floor",
    "Studio",
    "Residential Building",
    "Residential Land",
    "Chalet",
    "Rest House",
];

pub const COMMERCIAL_PROPERTY_TYPES: &[&str] = &[
    "Office",
    "Shop",
    "Showroom",
    "Warehouse",
    "Commercial Building",
    "Commercial Land",
    "Hotel",
    "Clinic",
    "Workshop",
    "Commercial Complex",
];

pub fn property_types_for(usage: PropertyUsage) -> &'static [&'static str] {
    match usage {
        PropertyUsage::Residential => RESIDENTIAL_PROPERTY_TYPES,
        PropertyUsage::Commercial => COMMERCIAL_PROPERTY_TYPES,
    }
}

/// Returns the canonical list entry matching `raw` (trimmed, exact case).
pub fn find_property_type(usage: PropertyUsage, raw: &str) -> Option<&'static str> {
    let candidate = raw.trim();
    property_types_for(usage)
        .iter()
        .copied()
        .find(|known| *known == candidate)
}

pub fn is_other_property_type(raw: &str) -> bool {
    raw.trim() == OTHER_PROPERTY_TYPE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_do_not_overlap_or_contain_sentinel() {
        for residential in RESIDENTIAL_PROPERTY_TYPES {
            assert!(!COMMERCIAL_PROPERTY_TYPES.contains(residential));
        }
        assert!(!RESIDENTIAL_PROPERTY_TYPES.contains(&OTHER_PROPERTY_TYPE));
        assert!(!COMMERCIAL_PROPERTY_TYPES.contains(&OTHER_PROPERTY_TYPE));
    }

    #[test]
    fn finds_type_only_under_matching_usage() {
        assert_eq!(
            find_property_type(PropertyUsage::Residential, " Villa "),
            Some("Villa")
        );
        assert_eq!(find_property_type(PropertyUsage::Commercial, "Villa"), None);
        assert_eq!(
            find_property_type(PropertyUsage::Commercial, "Warehouse"),
            Some("Warehouse")
        );
    }
}
