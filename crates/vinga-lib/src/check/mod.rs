//! Check evaluation
//!
//! Identifies one monitored entity, looks its counter up in the
//! [`registry`], reads the live value, normalizes it and classifies it into
//! a [`Severity`]. The resulting [`CheckOutcome`] renders the single status
//! line and exit code a monitoring scheduler expects.

mod evaluator;
mod output;
pub mod registry;
mod severity;


pub use evaluator::{
    entity_properties, CheckEvaluator, CheckRequest, SAMPLE_INTERVAL_SECS,
    WINDOW_END_OFFSET_SECS, WINDOW_START_OFFSET_SECS,
};
pub use output::{format_number, CheckOutcome, PerfData};
pub use registry::{CounterDefinition, QueryShape};
pub use severity::{classify_status, Severity, Thresholds};
