/// Arrow schema definitions for exported stay points.
pub mod stays {
    use arrow::datatypes::{DataType, Field, Schema, TimeUnit};

    fn utc_timestamp() -> DataType {
        DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into()))
    }

    /// Schema for the final, fully merged stay-point export.
    ///
    /// `purpose_source` is `frequency` for home/work labels, `llm` for
    /// activity labels and null when the stay remained unlabeled.
    pub fn stay_point_schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::UInt64, false),
            Field::new("started_at", utc_timestamp(), false),
            Field::new("finished_at", utc_timestamp(), false),
            Field::new("lon", DataType::Float64, false),
            Field::new("lat", DataType::Float64, false),
            Field::new("location_id", DataType::UInt64, true),
            Field::new("purpose", DataType::Utf8, true),
            Field::new("purpose_source", DataType::Utf8, true),
            Field::new("prior_label", DataType::Utf8, true),
        ])
    }
}
