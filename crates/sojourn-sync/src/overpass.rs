//! Overpass API client for points of interest inside a bounding box.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Deserialize;
use sojourn_core::{BoundingBox, GeoPoint, PoiNode, PoiSource};
use tracing::{debug, info};

use crate::error::{SyncError, ensure_success};

pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api";

/// Amenities that say nothing about what a person was doing.
const IGNORED_AMENITIES: &[&str] = &[
    "parking",
    "parking_space",
    "bench",
    "bicycle_parking",
    "motorcycle_parking",
    "post_box",
    "toilets",
    "drinking_water",
    "vending_machine",
];

/// Node filters, each followed by the bounding box in the query.
fn node_filters() -> Vec<String> {
    vec![
        format!(
            r#"node["amenity"]["amenity"!~"^({})$"]"#,
            IGNORED_AMENITIES.join("|")
        ),
        r#"node["healthcare"]"#.to_string(),
        r#"node["shop"]"#.to_string(),
        r#"node["leisure"]"#.to_string(),
        r#"node["tourism"]"#.to_string(),
        r#"node["building"~"^(religious|transportation)$"]"#.to_string(),
        r#"node["public_transport"="station"]"#.to_string(),
        r#"node["theatre"]"#.to_string(),
        r#"node["cinema"]"#.to_string(),
    ]
}

/// Overpass QL union of all POI filters inside `bbox`.
pub fn build_query(bbox: &BoundingBox, timeout_secs: u64) -> String {
    let area = bbox.to_overpass();
    let mut query = format!("[out:json][timeout:{timeout_secs}];\n(\n");
    for filter in node_filters() {
        query.push_str(&format!("  {filter}{area};\n"));
    }
    query.push_str(");\nout;");
    query
}

#[derive(Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    id: u64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

/// Nodes from an Overpass JSON body. Ways, relations and nodes without
/// coordinates are dropped.
pub fn parse_elements(body: &str) -> Result<Vec<PoiNode>, SyncError> {
    let parsed: OverpassResponse = serde_json::from_str(body)?;
    Ok(parsed
        .elements
        .into_iter()
        .filter(|e| e.kind == "node")
        .filter_map(|e| {
            Some(PoiNode {
                id: e.id,
                point: GeoPoint::new(e.lon?, e.lat?),
                tags: e.tags,
            })
        })
        .collect())
}

pub struct OverpassClient {
    client: reqwest::Client,
    base_url: String,
    server_timeout_secs: u64,
}

impl OverpassClient {
    /// `base_url` is the API root, e.g. `https://overpass-api.de/api`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            server_timeout_secs: 25,
        }
    }

    /// Server-side query timeout sent in the `[timeout:..]` setting.
    pub fn with_server_timeout(mut self, secs: u64) -> Self {
        self.server_timeout_secs = secs;
        self
    }

    pub async fn query(&self, bbox: &BoundingBox) -> Result<Vec<PoiNode>, SyncError> {
        let url = format!("{}/interpreter", self.base_url);
        let query = build_query(bbox, self.server_timeout_secs);

        debug!(url = %url, bbox = %bbox.to_overpass(), "querying overpass");
        let resp = self
            .client
            .post(&url)
            .form(&[("data", query.as_str())])
            .send()
            .await?;
        let body = ensure_success(resp).await?.text().await?;
        let nodes = parse_elements(&body)?;
        info!(count = nodes.len(), "overpass returned nodes");
        Ok(nodes)
    }
}

#[async_trait]
impl PoiSource for OverpassClient {
    async fn nodes_within(&self, bbox: &BoundingBox) -> anyhow::Result<Vec<PoiNode>> {
        Ok(self.query(bbox).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox() -> BoundingBox {
        BoundingBox::around(GeoPoint::new(6.1460, 46.2010), 150.0)
    }

    #[test]
    fn query_has_every_filter_and_bbox() {
        let q = build_query(&bbox(), 25);
        assert!(q.starts_with("[out:json][timeout:25];"));
        assert!(q.ends_with("out;"));
        assert_eq!(q.matches(&bbox().to_overpass()).count(), 9);
        assert!(q.contains(
            r#"["amenity"!~"^(parking|parking_space|bench|bicycle_parking|motorcycle_parking|post_box|toilets|drinking_water|vending_machine)$"]"#
        ));
        assert!(q.contains(r#"node["public_transport"="station"]"#));
        assert!(q.contains(r#"node["building"~"^(religious|transportation)$"]"#));
    }

    #[test]
    fn parses_nodes_and_skips_ways() {
        let body = r#"{
            "version": 0.6,
            "elements": [
                {"type": "node", "id": 42, "lat": 46.2011, "lon": 6.1462,
                 "tags": {"amenity": "cafe", "name": "Café Remor"}},
                {"type": "way", "id": 7, "nodes": [1, 2, 3]},
                {"type": "node", "id": 43, "lat": 46.2012, "lon": 6.1463}
            ]
        }"#;
        let nodes = parse_elements(body).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id, 42);
        assert_eq!(nodes[0].point, GeoPoint::new(6.1462, 46.2011));
        assert_eq!(nodes[0].tags["name"], "Café Remor");
        assert!(nodes[1].tags.is_empty());
    }

    #[test]
    fn empty_result() {
        assert!(parse_elements(r#"{"elements": []}"#).unwrap().is_empty());
        assert!(parse_elements("{}").unwrap().is_empty());
    }

    #[test]
    fn malformed_body_is_json_error() {
        let err = parse_elements("<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, SyncError::Json(_)));
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client = OverpassClient::new("https://overpass.example/api/".into());
        assert_eq!(client.base_url, "https://overpass.example/api");
        assert_eq!(client.server_timeout_secs, 25);
        assert_eq!(client.with_server_timeout(40).server_timeout_secs, 40);
    }
}
