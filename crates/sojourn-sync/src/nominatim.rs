//! Nominatim reverse geocoding.

use async_trait::async_trait;
use serde::Deserialize;
use sojourn_core::{GeoPoint, Geocoder};
use tracing::debug;

use crate::error::{SyncError, ensure_success};

pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    error: Option<String>,
}

pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimClient {
    /// Nominatim's usage policy requires an identifying User-Agent.
    pub fn new(base_url: String, user_agent: &str) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Address for `point`, or `None` when nothing is mapped there.
    pub async fn lookup(&self, point: GeoPoint) -> Result<Option<String>, SyncError> {
        let url = format!("{}/reverse", self.base_url);
        debug!(url = %url, lat = point.lat, lon = point.lon, "reverse geocoding");
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", point.lat.to_string()),
                ("lon", point.lon.to_string()),
            ])
            .send()
            .await?;
        let body = ensure_success(resp).await?.text().await?;
        parse_reverse(&body)
    }
}

fn parse_reverse(body: &str) -> Result<Option<String>, SyncError> {
    let parsed: ReverseResponse = serde_json::from_str(body)?;
    if let Some(error) = parsed.error {
        debug!(%error, "nominatim found no address");
        return Ok(None);
    }
    Ok(parsed.display_name.filter(|name| !name.trim().is_empty()))
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn reverse(&self, point: GeoPoint) -> anyhow::Result<Option<String>> {
        Ok(self.lookup(point).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_from_display_name() {
        let body = r#"{"place_id": 1, "lat": "46.2", "lon": "6.14",
            "display_name": "Rue du Mont-Blanc 1, 1201 Genève, Suisse"}"#;
        assert_eq!(
            parse_reverse(body).unwrap().as_deref(),
            Some("Rue du Mont-Blanc 1, 1201 Genève, Suisse")
        );
    }

    #[test]
    fn unable_to_geocode_is_none() {
        assert_eq!(parse_reverse(r#"{"error": "Unable to geocode"}"#).unwrap(), None);
    }

    #[test]
    fn client_trims_trailing_slash() {
        let client =
            NominatimClient::new(format!("{DEFAULT_NOMINATIM_URL}/"), "sojourn-test").unwrap();
        assert_eq!(client.base_url, DEFAULT_NOMINATIM_URL);
    }
}
