//! Points of interest around a stay point.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

pub const UNNAMED: &str = "Unnamed";
pub const UNKNOWN_CATEGORY: &str = "Unknown";
pub const UNKNOWN_HOURS: &str = "unknown";

/// Tags whose values qualify a POI beyond its category.
const DETAIL_TAGS: &[&str] = &["shop", "leisure", "tourism", "cuisine", "sport"];

/// Tag keys tried, in order, when a node has no `amenity` tag.
const CATEGORY_FALLBACK_TAGS: &[&str] = &[
    "healthcare",
    "shop",
    "leisure",
    "tourism",
    "building",
    "public_transport",
    "theatre",
    "cinema",
];

/// A raw node returned by the map-query service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoiNode {
    pub id: u64,
    pub point: GeoPoint,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl PoiNode {
    fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// A point of interest as offered to the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePoi {
    pub name: String,
    pub category: String,
    /// Cuisine, shop, sport and similar qualifiers. May be empty.
    pub details: String,
    pub opening_hours: String,
    pub distance_m: f64,
}

impl CandidatePoi {
    /// Build a candidate from a map node, measuring its distance from `origin`.
    pub fn from_node(node: &PoiNode, origin: &GeoPoint) -> Self {
        let name = node.tag("name").unwrap_or(UNNAMED).to_string();

        let category = node
            .tag("amenity")
            .map(str::to_string)
            .or_else(|| {
                CATEGORY_FALLBACK_TAGS
                    .iter()
                    .find(|key| node.tag(key).is_some())
                    .map(|key| key.to_string())
            })
            .unwrap_or_else(|| UNKNOWN_CATEGORY.to_string());

        let details = DETAIL_TAGS
            .iter()
            .filter_map(|key| node.tag(key))
            .collect::<Vec<_>>()
            .join(", ");

        let opening_hours = node
            .tag("opening_hours")
            .unwrap_or(UNKNOWN_HOURS)
            .to_string();

        Self {
            name,
            category,
            details,
            opening_hours,
            distance_m: origin.distance_m(&node.point).max(0.0),
        }
    }

    pub fn is_named(&self) -> bool {
        self.name != UNNAMED
    }

    pub fn has_known_hours(&self) -> bool {
        self.opening_hours != UNKNOWN_HOURS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(tags: &[(&str, &str)]) -> PoiNode {
        PoiNode {
            id: 1,
            point: GeoPoint::new(6.1460, 46.2010),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn full_tags() {
        let n = node(&[
            ("name", "Café du Soleil"),
            ("amenity", "restaurant"),
            ("cuisine", "fondue"),
            ("opening_hours", "Mo-Su 11:00-23:00"),
        ]);
        let poi = CandidatePoi::from_node(&n, &GeoPoint::new(6.1460, 46.2010));
        assert_eq!(poi.name, "Café du Soleil");
        assert_eq!(poi.category, "restaurant");
        assert_eq!(poi.details, "fondue");
        assert!(poi.has_known_hours());
        assert_eq!(poi.distance_m, 0.0);
    }

    #[test]
    fn missing_tags_use_sentinels() {
        let poi = CandidatePoi::from_node(&node(&[]), &GeoPoint::new(6.1470, 46.2010));
        assert_eq!(poi.name, UNNAMED);
        assert!(!poi.is_named());
        assert_eq!(poi.category, UNKNOWN_CATEGORY);
        assert_eq!(poi.details, "");
        assert_eq!(poi.opening_hours, UNKNOWN_HOURS);
        assert!(poi.distance_m > 0.0);
    }

    #[test]
    fn shop_without_amenity_falls_back_to_tag_key() {
        let poi = CandidatePoi::from_node(
            &node(&[("name", "Migros"), ("shop", "supermarket")]),
            &GeoPoint::new(6.1460, 46.2010),
        );
        assert_eq!(poi.category, "shop");
        assert_eq!(poi.details, "supermarket");
    }

    #[test]
    fn details_join_multiple_qualifiers() {
        let poi = CandidatePoi::from_node(
            &node(&[("leisure", "sports_centre"), ("sport", "climbing")]),
            &GeoPoint::new(6.1460, 46.2010),
        );
        assert_eq!(poi.details, "sports_centre, climbing");
    }

    #[test]
    fn blank_name_is_unnamed() {
        let poi = CandidatePoi::from_node(
            &node(&[("name", "  "), ("amenity", "cafe")]),
            &GeoPoint::new(6.1460, 46.2010),
        );
        assert_eq!(poi.name, UNNAMED);
    }
}
