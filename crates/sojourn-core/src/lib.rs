pub mod classification;
pub mod config;
pub mod error;
pub mod geo;
pub mod poi;
pub mod schema;
pub mod sources;
pub mod stay;

pub use classification::{ClassificationStatus, LlmClassification, NONE_SENTINEL};
pub use config::{
    ActivityParams, AggregationParams, HomeWorkParams, PipelineConfig, RecurrenceParams,
};
pub use error::CoreError;
pub use geo::{BoundingBox, GeoPoint};
pub use poi::{CandidatePoi, PoiNode};
pub use schema::stays;
pub use sources::{Checkpoint, Geocoder, LanguageModel, PoiSource};
pub use stay::{
    Location, LocationId, MonthWindow, Purpose, StayId, StayPoint, StayPointRecord, visit_counts,
};
