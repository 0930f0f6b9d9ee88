//! Recurrence-based home/work classification.
//!
//! [`OsnaClassifier`] splits each stay into hourly slices, files every slice
//! under a time frame (rest, work or leisure) and picks, per batch, the
//! location with the most rest time as home and the location with the most
//! work time (other than home) as work.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use sojourn_core::{LocationId, Purpose, RecurrenceParams, StayPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HomeWork {
    Home,
    Work,
}

impl HomeWork {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Work => "work",
        }
    }
}

impl From<HomeWork> for Purpose {
    fn from(value: HomeWork) -> Self {
        match value {
            HomeWork::Home => Purpose::Home,
            HomeWork::Work => Purpose::Work,
        }
    }
}

/// Labels locations in a batch of location-assigned stay points.
pub trait RecurrenceClassifier {
    /// One entry per input stay, in input order. Stays without a location id
    /// are always `None`.
    fn classify(&self, stays: &[StayPoint], params: &RecurrenceParams) -> Vec<Option<HomeWork>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Rest,
    Work,
    Leisure,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OsnaClassifier;

impl RecurrenceClassifier for OsnaClassifier {
    fn classify(&self, stays: &[StayPoint], params: &RecurrenceParams) -> Vec<Option<HomeWork>> {
        // location -> (rest seconds, work seconds)
        let mut time: BTreeMap<LocationId, (i64, i64)> = BTreeMap::new();
        for stay in stays {
            let Some(loc) = stay.location_id else {
                continue;
            };
            let entry = time.entry(loc).or_insert((0, 0));
            for (frame, secs) in frame_durations(stay.started_at, stay.finished_at, params) {
                match frame {
                    Frame::Rest => entry.0 += secs,
                    Frame::Work => entry.1 += secs,
                    Frame::Leisure => {}
                }
            }
        }

        let home = argmax(time.iter().map(|(&loc, &(rest, _))| (loc, rest)));
        let work = argmax(
            time.iter()
                .filter(|&(&loc, _)| Some(loc) != home)
                .map(|(&loc, &(_, work))| (loc, work)),
        );

        stays
            .iter()
            .map(|stay| match stay.location_id {
                Some(loc) if Some(loc) == home => Some(HomeWork::Home),
                Some(loc) if Some(loc) == work => Some(HomeWork::Work),
                _ => None,
            })
            .collect()
    }
}

/// Location with the largest positive duration. Ties go to the smallest id.
fn argmax(items: impl Iterator<Item = (LocationId, i64)>) -> Option<LocationId> {
    let mut best: Option<(LocationId, i64)> = None;
    for (loc, secs) in items {
        if secs > 0 && best.is_none_or(|(_, b)| secs > b) {
            best = Some((loc, secs));
        }
    }
    best.map(|(loc, _)| loc)
}

/// Split `[start, end)` at hour boundaries and sum seconds per frame.
fn frame_durations(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    params: &RecurrenceParams,
) -> Vec<(Frame, i64)> {
    let mut out: Vec<(Frame, i64)> = Vec::new();
    let mut cursor = start;
    while cursor < end {
        let next_hour = (cursor.timestamp().div_euclid(3600) + 1) * 3600;
        let Some(boundary) = DateTime::from_timestamp(next_hour, 0) else {
            break;
        };
        let slice_end = boundary.min(end);
        let secs = (slice_end - cursor).num_seconds();
        let frame = frame_of(&cursor, params);
        match out.iter_mut().find(|(f, _)| *f == frame) {
            Some((_, total)) => *total += secs,
            None => out.push((frame, secs)),
        }
        cursor = slice_end;
    }
    out
}

fn frame_of(ts: &DateTime<Utc>, params: &RecurrenceParams) -> Frame {
    let weekend = matches!(ts.weekday(), Weekday::Sat | Weekday::Sun);
    if weekend && params.weekend_is_rest {
        return Frame::Rest;
    }
    let hour = ts.hour();
    if in_hours(hour, params.rest_start_hour, params.rest_end_hour) {
        Frame::Rest
    } else if !weekend && in_hours(hour, params.work_start_hour, params.work_end_hour) {
        Frame::Work
    } else {
        Frame::Leisure
    }
}

/// `[start, end)` on a 24h clock; wraps past midnight when `start > end`.
fn in_hours(hour: u32, start: u32, end: u32) -> bool {
    if start <= end {
        (start..end).contains(&hour)
    } else {
        hour >= start || hour < end
    }
}
