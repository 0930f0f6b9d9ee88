//! End-to-end orchestration: aggregate, identify home/work, classify the rest, merge.

use std::collections::BTreeMap;

use sojourn_core::{
    Checkpoint, LanguageModel, LlmClassification, Location, LocationId, PipelineConfig,
    PoiSource, StayPoint,
};
use tracing::info;

use crate::activity::ActivityClassifier;
use crate::aggregate::{DensityAggregator, LocationAggregator};
use crate::home_work::{HomeWorkSite, WindowReport, home_work_sites, identify_detailed};
use crate::merge::{LabelCounts, merge};
use crate::recurrence::{OsnaClassifier, RecurrenceClassifier};

/// Output of the frequency-based stages.
#[derive(Debug, Clone)]
pub struct HomeWorkStage {
    pub stays: Vec<StayPoint>,
    pub locations: BTreeMap<LocationId, Location>,
    pub sites: Vec<HomeWorkSite>,
    pub windows: Vec<WindowReport>,
}

impl HomeWorkStage {
    /// Stays the frequency stages could not label.
    pub fn unresolved(&self) -> Vec<StayPoint> {
        self.stays
            .iter()
            .filter(|s| s.purpose.is_none())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub stays: Vec<StayPoint>,
    pub locations: BTreeMap<LocationId, Location>,
    pub sites: Vec<HomeWorkSite>,
    pub classifications: Vec<LlmClassification>,
    pub counts: LabelCounts,
}

pub struct Pipeline {
    config: PipelineConfig,
    aggregator: Box<dyn LocationAggregator + Send + Sync>,
    recurrence: Box<dyn RecurrenceClassifier + Send + Sync>,
}

impl Pipeline {
    /// Pipeline with the built-in density aggregator and recurrence classifier.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            aggregator: Box::new(DensityAggregator),
            recurrence: Box::new(OsnaClassifier),
        }
    }

    pub fn with_aggregator(
        mut self,
        aggregator: impl LocationAggregator + Send + Sync + 'static,
    ) -> Self {
        self.aggregator = Box::new(aggregator);
        self
    }

    pub fn with_recurrence(
        mut self,
        recurrence: impl RecurrenceClassifier + Send + Sync + 'static,
    ) -> Self {
        self.recurrence = Box::new(recurrence);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Aggregate into locations and label home/work.
    pub fn home_work(&self, stays: Vec<StayPoint>) -> HomeWorkStage {
        let (stays, locations) = self.aggregator.aggregate(stays, &self.config.aggregation);
        let outcome = identify_detailed(&stays, self.recurrence.as_ref(), &self.config.home_work);
        let sites = home_work_sites(&outcome.assignments, &outcome.stays, &locations);
        HomeWorkStage {
            stays: outcome.stays,
            locations,
            sites,
            windows: outcome.windows,
        }
    }

    /// Run every stage. `previous` holds checkpointed records from an earlier,
    /// interrupted run; pass an empty vec to start fresh.
    pub async fn run(
        &self,
        stays: Vec<StayPoint>,
        pois: &dyn PoiSource,
        model: &dyn LanguageModel,
        checkpoint: &mut dyn Checkpoint,
        previous: Vec<LlmClassification>,
    ) -> anyhow::Result<PipelineOutcome> {
        let stage = self.home_work(stays);
        let unresolved = stage.unresolved();
        info!(
            stays = stage.stays.len(),
            unresolved = unresolved.len(),
            "frequency stages done"
        );

        let classifier = ActivityClassifier::new(pois, model, &self.config.activity);
        let classifications = classifier.resume(&unresolved, previous, checkpoint).await?;

        let stays = merge(stage.stays, &classifications);
        let counts = LabelCounts::of(&stays);
        info!(
            home = counts.home,
            work = counts.work,
            activities = counts.activities.len(),
            unlabelled = counts.unlabelled,
            "pipeline finished"
        );

        Ok(PipelineOutcome {
            stays,
            locations: stage.locations,
            sites: stage.sites,
            classifications,
            counts,
        })
    }
}
