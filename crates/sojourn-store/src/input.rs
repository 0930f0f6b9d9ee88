//! Stay-point input from a JSON array of records.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::Value;
use sojourn_core::{CoreError, StayPoint, StayPointRecord};
use tracing::{info, warn};

use crate::StoreError;

/// Valid stay points plus the records that were rejected, in input order.
#[derive(Debug, Default)]
pub struct LoadedStays {
    pub stays: Vec<StayPoint>,
    pub rejected: Vec<CoreError>,
}

/// Read stay points from `path`.
///
/// A malformed record is rejected on its own, including one whose fields have
/// the wrong type; the rest of the file still loads. Only an unreadable file or
/// a document that is not a JSON array fails the whole call.
pub fn load_stay_points(path: &Path) -> Result<LoadedStays, StoreError> {
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    let values: Vec<Value> =
        serde_json::from_reader(BufReader::new(file)).map_err(|e| StoreError::json(path, e))?;
    let loaded = validate(values);
    info!(
        path = %path.display(),
        stays = loaded.stays.len(),
        rejected = loaded.rejected.len(),
        "loaded stay points"
    );
    Ok(loaded)
}

fn decode(value: Value) -> Result<StayPointRecord, CoreError> {
    let id = value.get("id").and_then(Value::as_u64);
    serde_json::from_value(value).map_err(|e| CoreError::MalformedStayPoint {
        id,
        reason: e.to_string(),
    })
}

fn validate(values: Vec<Value>) -> LoadedStays {
    let mut loaded = LoadedStays::default();
    let mut seen = HashSet::new();
    for value in values {
        let result = decode(value).and_then(StayPoint::try_from).and_then(|stay| {
            if seen.insert(stay.id) {
                Ok(stay)
            } else {
                Err(CoreError::MalformedStayPoint {
                    id: Some(stay.id),
                    reason: "duplicate id".into(),
                })
            }
        });
        match result {
            Ok(stay) => loaded.stays.push(stay),
            Err(e) => {
                warn!(error = %e, "rejected stay point");
                loaded.rejected.push(e);
            }
        }
    }
    loaded
}
