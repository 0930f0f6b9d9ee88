//! Stay points, locations and the purpose labels attached to them.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::classification::NONE_SENTINEL;
use crate::error::CoreError;
use crate::geo::GeoPoint;

pub type StayId = u64;
pub type LocationId = u64;

/// Semantic purpose of a stay.
///
/// `Home` and `Work` come from the frequency-based identifier; `Activity`
/// carries a free-text label from the language model path. Serialized as a
/// plain string; an empty string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Purpose {
    Home,
    Work,
    Activity(String),
}

impl Purpose {
    /// Free-text activity label. Blank text and the `"None"` sentinel yield `None`.
    ///
    /// The reserved strings `"home"` and `"work"` are capitalized so that the
    /// label stays an activity when it is stored and read back.
    pub fn activity(label: &str) -> Option<Self> {
        let label = label.trim();
        match label {
            "" | NONE_SENTINEL => None,
            "home" => Some(Self::Activity("Home".into())),
            "work" => Some(Self::Activity("Work".into())),
            other => Some(Self::Activity(other.to_string())),
        }
    }

    /// Parse a stored label: `"home"`/`"work"` map to the frequency variants,
    /// anything else non-blank becomes an activity.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim() {
            "home" => Some(Self::Home),
            "work" => Some(Self::Work),
            other => Self::activity(other),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Home => "home",
            Self::Work => "work",
            Self::Activity(label) => label,
        }
    }

    /// Set by the visit-frequency identifier rather than the language model.
    pub fn is_frequency_based(&self) -> bool {
        matches!(self, Self::Home | Self::Work)
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Purpose {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(CoreError::InvalidPurpose(value))
    }
}

impl From<Purpose> for String {
    fn from(value: Purpose) -> Self {
        match value {
            Purpose::Activity(label) => label,
            other => other.as_str().to_string(),
        }
    }
}

/// A time-bounded, geographically anchored stay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StayPoint {
    pub id: StayId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub point: GeoPoint,
    /// Assigned by the location aggregator.
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub purpose: Option<Purpose>,
    /// Label carried over from the upstream export. Not reliable.
    #[serde(default)]
    pub prior_label: Option<String>,
}

impl StayPoint {
    pub fn new(
        id: StayId,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        point: GeoPoint,
    ) -> Self {
        Self {
            id,
            started_at,
            finished_at,
            point,
            location_id: None,
            purpose: None,
            prior_label: None,
        }
    }

    pub fn with_location(mut self, location_id: LocationId) -> Self {
        self.location_id = Some(location_id);
        self
    }

    pub fn month(&self) -> MonthWindow {
        MonthWindow::of(&self.started_at)
    }
}

/// Stay point as it arrives from upstream ingestion, before validation.
///
/// Every field is optional so that a single broken record can be rejected on
/// its own instead of failing the whole input file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StayPointRecord {
    pub id: Option<StayId>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

impl TryFrom<StayPointRecord> for StayPoint {
    type Error = CoreError;

    fn try_from(rec: StayPointRecord) -> Result<Self, Self::Error> {
        let malformed = |reason: &str| CoreError::MalformedStayPoint {
            id: rec.id,
            reason: reason.to_string(),
        };

        let id = rec.id.ok_or_else(|| malformed("missing id"))?;
        let started_at = rec.started_at.ok_or_else(|| malformed("missing start time"))?;
        let finished_at = rec.finished_at.ok_or_else(|| malformed("missing end time"))?;
        if finished_at < started_at {
            return Err(malformed("end time precedes start time"));
        }

        let point = match (rec.lon, rec.lat) {
            (Some(lon), Some(lat)) => GeoPoint::new(lon, lat),
            _ => return Err(malformed("missing coordinates")),
        };
        if !point.is_valid() {
            return Err(malformed("coordinates out of range"));
        }

        Ok(Self {
            id,
            started_at,
            finished_at,
            point,
            location_id: rec.location_id,
            purpose: rec.purpose.as_deref().and_then(Purpose::parse),
            prior_label: rec
                .label
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty()),
        })
    }
}

/// A spatial cluster of stay points. Visit counts are derived, see [`visit_counts`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub center: GeoPoint,
}

/// Number of stay points referencing each location.
pub fn visit_counts(stays: &[StayPoint]) -> HashMap<LocationId, usize> {
    let mut counts = HashMap::new();
    for loc in stays.iter().filter_map(|s| s.location_id) {
        *counts.entry(loc).or_insert(0) += 1;
    }
    counts
}

/// Calendar-month grouping key. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthWindow {
    pub year: i32,
    pub month: u32,
}

impl MonthWindow {
    pub fn of(ts: &DateTime<Utc>) -> Self {
        Self {
            year: ts.year(),
            month: ts.month(),
        }
    }
}

impl fmt::Display for MonthWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
