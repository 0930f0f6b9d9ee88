//! Storage layer: JSON stay-point input, the JSON classification checkpoint,
//! and Parquet export of the final stay points.

mod error;
pub use error::StoreError;

mod checkpoint;
pub use checkpoint::JsonCheckpoint;

mod export;
pub use export::{read_parquet, stays_to_batch, write_parquet};

mod input;
pub use input::{LoadedStays, load_stay_points};
