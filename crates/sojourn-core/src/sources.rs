//! Interfaces to the external collaborators of the classification stage.
//!
//! HTTP implementations live in `sojourn-sync`, the checkpoint file in
//! `sojourn-store`.

use async_trait::async_trait;

use crate::classification::LlmClassification;
use crate::geo::{BoundingBox, GeoPoint};
use crate::poi::PoiNode;

/// Map-query service returning tagged nodes inside a rectangle.
#[async_trait]
pub trait PoiSource: Send + Sync {
    async fn nodes_within(&self, bbox: &BoundingBox) -> anyhow::Result<Vec<PoiNode>>;
}

/// Stateless text completion. Each call stands alone; no history is kept.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn complete(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Reverse geocoding of a coordinate into a human-readable address.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn reverse(&self, point: GeoPoint) -> anyhow::Result<Option<String>>;
}

/// Incremental persistence of classification results.
///
/// Called with the complete result list after every processed stay point, so
/// an implementation may overwrite its previous output.
pub trait Checkpoint {
    fn save(&mut self, records: &[LlmClassification]) -> anyhow::Result<()>;
}
