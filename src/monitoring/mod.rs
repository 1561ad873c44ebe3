//! Run Monitoring Module
//!
//! - [`ExecutionTimeline`]: Step events and timings for the end-of-run summary

pub mod timeline;

pub use timeline::{EventType, ExecutionTimeline, TimelineEvent};
