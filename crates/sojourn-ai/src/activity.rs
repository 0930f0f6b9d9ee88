//! POI-grounded activity classification via a language model.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use sojourn_core::{
    ActivityParams, BoundingBox, CandidatePoi, Checkpoint, ClassificationStatus, GeoPoint,
    LanguageModel, LlmClassification, NONE_SENTINEL, PoiNode, PoiSource, StayId, StayPoint,
};
use tracing::{debug, info, warn};

use crate::prompt::build_prompt;
use crate::reply::parse_reply;

/// Classifies stay points one at a time against a map service and a model.
pub struct ActivityClassifier<'a> {
    pois: &'a dyn PoiSource,
    model: &'a dyn LanguageModel,
    params: &'a ActivityParams,
}

impl<'a> ActivityClassifier<'a> {
    pub fn new(
        pois: &'a dyn PoiSource,
        model: &'a dyn LanguageModel,
        params: &'a ActivityParams,
    ) -> Self {
        Self {
            pois,
            model,
            params,
        }
    }

    /// Classify every stay, saving the growing result list after each one.
    ///
    /// Remote failures are recorded per stay and never abort the batch. Only a
    /// checkpoint failure is returned as an error.
    pub async fn classify(
        &self,
        stays: &[StayPoint],
        checkpoint: &mut dyn Checkpoint,
    ) -> anyhow::Result<Vec<LlmClassification>> {
        self.resume(stays, Vec::new(), checkpoint).await
    }

    /// Like [`classify`](Self::classify), reusing settled records from an
    /// earlier run. Records for failed remote calls are retried.
    ///
    /// Every save holds all of `previous`, with retried records replaced.
    /// Records for stays not in `stays` are saved but not returned.
    pub async fn resume(
        &self,
        stays: &[StayPoint],
        previous: Vec<LlmClassification>,
        checkpoint: &mut dyn Checkpoint,
    ) -> anyhow::Result<Vec<LlmClassification>> {
        let mut by_id: HashMap<StayId, LlmClassification> = HashMap::new();
        for record in previous {
            let keep_existing = by_id
                .get(&record.stay_id)
                .is_some_and(|r| r.status.is_settled() && !record.status.is_settled());
            if !keep_existing {
                by_id.insert(record.stay_id, record);
            }
        }

        let mut slots: Vec<Option<LlmClassification>> =
            stays.iter().map(|s| by_id.remove(&s.id)).collect();
        let mut others: Vec<LlmClassification> = by_id.into_values().collect();
        others.sort_by_key(|r| r.stay_id);

        let reused = slots
            .iter()
            .flatten()
            .filter(|r| r.status.is_settled())
            .count();
        info!(
            stays = stays.len(),
            reused,
            model = self.model.model_name(),
            "classifying activities"
        );

        for (n, stay) in stays.iter().enumerate() {
            if slots[n].as_ref().is_some_and(|r| r.status.is_settled()) {
                continue;
            }

            let record = self.classify_one(stay).await;
            info!(
                stay_id = stay.id,
                n = n + 1,
                total = stays.len(),
                status = record.status.as_str(),
                activity = %record.activity_type,
                "classified stay"
            );
            slots[n] = Some(record);

            let snapshot: Vec<LlmClassification> = slots
                .iter()
                .flatten()
                .chain(&others)
                .cloned()
                .collect();
            checkpoint
                .save(&snapshot)
                .with_context(|| format!("saving checkpoint after stay {}", stay.id))?;
        }

        Ok(slots.into_iter().flatten().collect())
    }

    /// Query POIs, prompt the model and parse its reply for one stay.
    pub async fn classify_one(&self, stay: &StayPoint) -> LlmClassification {
        let mut record = LlmClassification {
            stay_id: stay.id,
            place: NONE_SENTINEL.to_string(),
            activity_type: NONE_SENTINEL.to_string(),
            response: String::new(),
            prompt: String::new(),
            status: ClassificationStatus::PoiQueryFailed,
            model: self.model.model_name().to_string(),
            poi_count: 0,
            classified_at: Utc::now(),
        };

        let candidates = match self.candidates(stay.point).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(stay_id = stay.id, error = %e, "POI query failed, skipping model call");
                return record;
            }
        };
        record.poi_count = candidates.len();
        record.prompt = build_prompt(stay, &candidates, self.params);

        let call = self.model.complete(&record.prompt);
        let response = match bounded(self.params.model_timeout(), call).await {
            Ok(response) => response,
            Err(e) => {
                warn!(stay_id = stay.id, error = %e, "model call failed");
                record.status = ClassificationStatus::ModelFailed;
                return record;
            }
        };

        let parsed = parse_reply(&response);
        record.status = if parsed.is_complete() {
            ClassificationStatus::Parsed
        } else {
            warn!(stay_id = stay.id, response = %response, "reply did not match the expected format");
            ClassificationStatus::Unparseable
        };
        record.place = parsed.place;
        record.activity_type = parsed.activity_type;
        record.response = response;
        record
    }

    /// Nearest candidate POIs around `point`, at most `max_pois`.
    pub async fn candidates(&self, point: GeoPoint) -> anyhow::Result<Vec<CandidatePoi>> {
        let bbox = BoundingBox::around(point, self.params.search_radius_m);
        let nodes = bounded(self.params.poi_timeout(), self.pois.nodes_within(&bbox)).await?;
        debug!(nodes = nodes.len(), bbox = %bbox.to_overpass(), "POI query returned");
        Ok(rank_candidates(&nodes, &point, self.params.max_pois))
    }
}

/// Nearest first, capped at `max`.
pub fn rank_candidates(nodes: &[PoiNode], origin: &GeoPoint, max: usize) -> Vec<CandidatePoi> {
    let mut candidates: Vec<CandidatePoi> = nodes
        .iter()
        .map(|node| CandidatePoi::from_node(node, origin))
        .collect();
    candidates.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
    candidates.truncate(max);
    candidates
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => anyhow::bail!("timed out after {}s", limit.as_secs()),
    }
}
