//! Month-windowed home/work identification.
//!
//! Rarely visited locations are prefiltered, the remaining stays are split
//! into calendar months, and the recurrence classifier runs once per month.
//! A month's home (or work) label is kept only when enough of that month's
//! stays carry it. Accepted labels are then mapped back onto every stay of the
//! labelled location, including stays in months that were skipped.
//!
//! When months disagree about a location, the most recent accepted month wins.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use sojourn_core::{
    GeoPoint, Geocoder, HomeWorkParams, Location, LocationId, MonthWindow, Purpose, StayPoint,
    visit_counts,
};
use tracing::{debug, info, warn};

use crate::recurrence::{HomeWork, RecurrenceClassifier};

/// Shown when reverse geocoding finds nothing for a site.
pub const ADDRESS_NOT_FOUND: &str = "Address not found";

/// What happened to one month window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowReport {
    pub window: MonthWindow,
    /// Stays in the window after prefiltering.
    pub samples: usize,
    /// `false` when the window had fewer than `min_monthly_samples` stays.
    pub evaluated: bool,
    pub home_rate: f64,
    pub work_rate: f64,
    pub accepted: Vec<HomeWork>,
}

pub struct HomeWorkOutcome {
    /// Every input stay, with `purpose` set to home/work or cleared.
    pub stays: Vec<StayPoint>,
    /// Windows in chronological order.
    pub windows: Vec<WindowReport>,
    pub assignments: BTreeMap<LocationId, HomeWork>,
}

/// Label stays as home or work. See the module docs for the algorithm.
pub fn identify(
    stays: &[StayPoint],
    classifier: &dyn RecurrenceClassifier,
    params: &HomeWorkParams,
) -> Vec<StayPoint> {
    identify_detailed(stays, classifier, params).stays
}

/// [`identify`] plus per-window diagnostics and the final location mapping.
pub fn identify_detailed(
    stays: &[StayPoint],
    classifier: &dyn RecurrenceClassifier,
    params: &HomeWorkParams,
) -> HomeWorkOutcome {
    let counts = visit_counts(stays);

    let mut windows: BTreeMap<MonthWindow, Vec<StayPoint>> = BTreeMap::new();
    for stay in stays {
        if let Some(loc) = stay.location_id
            && counts.get(&loc).copied().unwrap_or(0) > params.min_visits_overall
        {
            windows.entry(stay.month()).or_default().push(stay.clone());
        }
    }

    let mut reports = Vec::with_capacity(windows.len());
    let mut assignments: BTreeMap<LocationId, HomeWork> = BTreeMap::new();

    for (window, batch) in &windows {
        let samples = batch.len();
        if samples < params.min_monthly_samples {
            debug!(%window, samples, "too few stays in month, no label");
            reports.push(WindowReport {
                window: *window,
                samples,
                evaluated: false,
                home_rate: 0.0,
                work_rate: 0.0,
                accepted: Vec::new(),
            });
            continue;
        }

        let labels = classifier.classify(batch, &params.recurrence);
        if labels.len() != samples {
            warn!(
                %window,
                expected = samples,
                got = labels.len(),
                "recurrence classifier returned a mismatched label count"
            );
        }

        let rate = |kind: HomeWork| {
            labels.iter().filter(|l| **l == Some(kind)).count() as f64 / samples as f64
        };
        let home_rate = rate(HomeWork::Home);
        let work_rate = rate(HomeWork::Work);
        let accepted: Vec<HomeWork> = [(HomeWork::Home, home_rate), (HomeWork::Work, work_rate)]
            .into_iter()
            .filter(|&(_, r)| r > 0.0 && r >= params.min_monthly_rate)
            .map(|(kind, _)| kind)
            .collect();

        for (stay, label) in batch.iter().zip(&labels) {
            if let (Some(loc), Some(kind)) = (stay.location_id, label)
                && accepted.contains(kind)
            {
                assignments.insert(loc, *kind);
            }
        }

        debug!(%window, samples, home_rate, work_rate, ?accepted, "evaluated month");
        reports.push(WindowReport {
            window: *window,
            samples,
            evaluated: true,
            home_rate,
            work_rate,
            accepted,
        });
    }

    let labelled: Vec<StayPoint> = stays
        .iter()
        .cloned()
        .map(|mut stay| {
            stay.purpose = stay
                .location_id
                .and_then(|loc| assignments.get(&loc))
                .map(|&kind| Purpose::from(kind));
            stay
        })
        .collect();

    info!(
        stays = stays.len(),
        months = reports.len(),
        home_locations = assignments.values().filter(|k| **k == HomeWork::Home).count(),
        work_locations = assignments.values().filter(|k| **k == HomeWork::Work).count(),
        "identified home/work locations"
    );

    HomeWorkOutcome {
        stays: labelled,
        windows: reports,
        assignments,
    }
}

/// A location labelled home or work, for reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct HomeWorkSite {
    pub location_id: LocationId,
    pub purpose: HomeWork,
    pub center: GeoPoint,
    pub visits: usize,
    pub address: Option<String>,
}

/// One site per labelled location, ordered by location id.
pub fn home_work_sites(
    assignments: &BTreeMap<LocationId, HomeWork>,
    stays: &[StayPoint],
    locations: &BTreeMap<LocationId, Location>,
) -> Vec<HomeWorkSite> {
    let counts = visit_counts(stays);
    let missing: BTreeSet<LocationId> = assignments
        .keys()
        .filter(|loc| !locations.contains_key(loc))
        .copied()
        .collect();
    if !missing.is_empty() {
        warn!(?missing, "labelled locations without a centroid, skipped");
    }

    assignments
        .iter()
        .filter_map(|(&loc, &purpose)| {
            let location = locations.get(&loc)?;
            Some(HomeWorkSite {
                location_id: loc,
                purpose,
                center: location.center,
                visits: counts.get(&loc).copied().unwrap_or(0),
                address: None,
            })
        })
        .collect()
}

/// Reverse-geocode each site. Failures and timeouts leave the address unset.
pub async fn attach_addresses(
    sites: &mut [HomeWorkSite],
    geocoder: &dyn Geocoder,
    timeout: Duration,
) {
    for site in sites.iter_mut() {
        match tokio::time::timeout(timeout, geocoder.reverse(site.center)).await {
            Ok(Ok(address)) => {
                site.address = Some(address.unwrap_or_else(|| ADDRESS_NOT_FOUND.to_string()));
            }
            Ok(Err(e)) => {
                warn!(location_id = site.location_id, error = %e, "reverse geocoding failed");
            }
            Err(_) => {
                warn!(location_id = site.location_id, "reverse geocoding timed out");
            }
        }
    }
}
