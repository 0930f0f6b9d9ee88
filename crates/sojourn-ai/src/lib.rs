//! Purpose inference: month-windowed home/work detection on top of a recurrence
//! classifier, and a POI-grounded language model fallback for everything else.

pub mod activity;
pub mod aggregate;
pub mod home_work;
pub mod merge;
pub mod pipeline;
pub mod prompt;
pub mod recurrence;
pub mod reply;

pub use activity::ActivityClassifier;
pub use aggregate::{DensityAggregator, LocationAggregator};
pub use home_work::{HomeWorkOutcome, HomeWorkSite, WindowReport, identify, identify_detailed};
pub use merge::{LabelCounts, merge};
pub use pipeline::{HomeWorkStage, Pipeline, PipelineOutcome};
pub use recurrence::{HomeWork, OsnaClassifier, RecurrenceClassifier};
pub use reply::{ParsedReply, parse_reply};
