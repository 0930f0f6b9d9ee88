//! Parquet export of the final stay points.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray, UInt64Array};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use sojourn_core::{StayPoint, stays};
use tracing::info;

use crate::StoreError;

/// One row per stay point, in the `stays::stay_point_schema` layout.
pub fn stays_to_batch(points: &[StayPoint]) -> Result<RecordBatch, StoreError> {
    let schema = Arc::new(stays::stay_point_schema());

    let ids = UInt64Array::from_iter_values(points.iter().map(|s| s.id));
    let started = TimestampMillisecondArray::from_iter_values(
        points.iter().map(|s| s.started_at.timestamp_millis()),
    )
    .with_timezone("UTC");
    let finished = TimestampMillisecondArray::from_iter_values(
        points.iter().map(|s| s.finished_at.timestamp_millis()),
    )
    .with_timezone("UTC");
    let lon = Float64Array::from_iter_values(points.iter().map(|s| s.point.lon));
    let lat = Float64Array::from_iter_values(points.iter().map(|s| s.point.lat));
    let location = UInt64Array::from(points.iter().map(|s| s.location_id).collect::<Vec<_>>());
    let purpose = StringArray::from(
        points
            .iter()
            .map(|s| s.purpose.as_ref().map(|p| p.as_str()))
            .collect::<Vec<_>>(),
    );
    let source = StringArray::from(
        points
            .iter()
            .map(|s| {
                s.purpose.as_ref().map(|p| {
                    if p.is_frequency_based() {
                        "frequency"
                    } else {
                        "llm"
                    }
                })
            })
            .collect::<Vec<_>>(),
    );
    let prior = StringArray::from(
        points
            .iter()
            .map(|s| s.prior_label.as_deref())
            .collect::<Vec<_>>(),
    );

    let columns: Vec<ArrayRef> = vec![
        Arc::new(ids),
        Arc::new(started),
        Arc::new(finished),
        Arc::new(lon),
        Arc::new(lat),
        Arc::new(location),
        Arc::new(purpose),
        Arc::new(source),
        Arc::new(prior),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Write the stay points to a Parquet file, replacing any existing file.
pub fn write_parquet(path: &Path, points: &[StayPoint]) -> Result<(), StoreError> {
    let batch = stays_to_batch(points)?;
    let file = File::create(path).map_err(|e| StoreError::io(path, e))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    info!(path = %path.display(), rows = batch.num_rows(), "wrote stay points");
    Ok(())
}

/// Read a Parquet file into Arrow RecordBatches.
pub fn read_parquet(path: &Path) -> Result<Vec<RecordBatch>, StoreError> {
    let file = File::open(path).map_err(|e| StoreError::io(path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches: Result<Vec<RecordBatch>, _> = reader.collect();
    Ok(batches?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use chrono::{TimeZone, Utc};
    use sojourn_core::{GeoPoint, Purpose};
    use tempfile::TempDir;

    fn stay(id: u64, hours: i64, lon: f64, lat: f64) -> StayPoint {
        let t = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        StayPoint::new(id, t, t + chrono::Duration::hours(hours), GeoPoint::new(lon, lat))
    }

    fn sample() -> Vec<StayPoint> {
        let mut home = stay(1, 2, 6.14, 46.2).with_location(0);
        home.purpose = Some(Purpose::Home);
        let mut cafe = stay(2, 1, 6.18, 46.22);
        cafe.purpose = Some(Purpose::Activity("Cafe".into()));
        cafe.prior_label = Some("Coffee".into());
        vec![home, cafe, stay(3, 1, 7.0, 46.5)]
    }

    #[test]
    fn batch_columns() {
        let batch = stays_to_batch(&sample()).unwrap();
        assert_eq!(batch.num_rows(), 3);
        assert_eq!(batch.num_columns(), 9);

        let source = batch
            .column_by_name("purpose_source")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(source.value(0), "frequency");
        assert_eq!(source.value(1), "llm");
        assert!(source.is_null(2));

        let location = batch
            .column_by_name("location_id")
            .unwrap()
            .as_any()
            .downcast_ref::<UInt64Array>()
            .unwrap();
        assert_eq!(location.value(0), 0);
        assert!(location.is_null(1));
    }

    #[test]
    fn parquet_readback() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("stays.parquet");
        write_parquet(&path, &sample()).unwrap();

        let batches = read_parquet(&path).unwrap();
        let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 3);

        let purpose = batches[0]
            .column_by_name("purpose")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(purpose.value(0), "home");
        assert_eq!(purpose.value(1), "Cafe");
        assert!(purpose.is_null(2));

        let started = batches[0]
            .column_by_name("started_at")
            .unwrap()
            .as_any()
            .downcast_ref::<TimestampMillisecondArray>()
            .unwrap();
        assert_eq!(
            started.value(0),
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap().timestamp_millis()
        );
    }

    #[test]
    fn empty_export_is_valid() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("empty.parquet");
        write_parquet(&path, &[]).unwrap();
        let rows: usize = read_parquet(&path).unwrap().iter().map(|b| b.num_rows()).sum();
        assert_eq!(rows, 0);
    }
}
