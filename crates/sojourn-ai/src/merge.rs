//! Final label merge: frequency labels first, language-model labels fill gaps.

use std::collections::{BTreeMap, HashMap};

use sojourn_core::{LlmClassification, Purpose, StayId, StayPoint};
use tracing::info;

/// Apply classifications to stays that have no purpose yet.
///
/// Home/work labels are never overwritten. A classification whose type is the
/// `"None"` sentinel leaves the stay unlabelled. When several records share a
/// stay id the last one wins.
pub fn merge(mut stays: Vec<StayPoint>, classifications: &[LlmClassification]) -> Vec<StayPoint> {
    let by_stay: HashMap<StayId, &LlmClassification> =
        classifications.iter().map(|c| (c.stay_id, c)).collect();

    let mut applied = 0usize;
    for stay in stays.iter_mut().filter(|s| s.purpose.is_none()) {
        if let Some(purpose) = by_stay.get(&stay.id).and_then(|c| c.purpose()) {
            stay.purpose = Some(purpose);
            applied += 1;
        }
    }

    info!(
        stays = stays.len(),
        classifications = classifications.len(),
        applied,
        "merged activity labels"
    );
    stays
}

/// Tally of final purposes, for reporting.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LabelCounts {
    pub home: usize,
    pub work: usize,
    pub activities: BTreeMap<String, usize>,
    pub unlabelled: usize,
}

impl LabelCounts {
    pub fn of(stays: &[StayPoint]) -> Self {
        let mut counts = Self::default();
        for stay in stays {
            match &stay.purpose {
                Some(Purpose::Home) => counts.home += 1,
                Some(Purpose::Work) => counts.work += 1,
                Some(Purpose::Activity(label)) => {
                    *counts.activities.entry(label.clone()).or_default() += 1
                }
                None => counts.unlabelled += 1,
            }
        }
        counts
    }

    pub fn labelled(&self) -> usize {
        self.home + self.work + self.activities.values().sum::<usize>()
    }
}
