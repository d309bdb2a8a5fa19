//! Batch orchestration: row cap, chunking, one classifier call per chunk.
//! Threshold summaries and breakdowns over scored rows.

mod analytics;
mod batch;

pub use analytics::{
    apply_threshold, check_threshold, Analytics, AnalyticsBuilder, AmountRangeBucket, HourBucket, Observation,
    ThresholdReport, ThresholdRow, ThresholdSummary, WeekdayBucket, DEFAULT_FLAG_THRESHOLD,
};
pub use batch::{BatchOrchestrator, BatchOutcome, BatchSummary};
