// ============================================================
// TRAFFIC DOMAIN LAYER
// ============================================================
// Core types for usage exports and ISP enrichment
// No I/O, no async

mod record;
mod resolution;

pub use record::{
    Dataset, RawTable, TrafficRecord, APPLICATION_TYPE, BYTES_PER_GB, CATEGORY_TYPE, END_TIME,
    OTHER_UDP, SERVER_IP, START_TIME, TOTAL_TRAFFIC_B, TOTAL_TRAFFIC_GB,
};
pub use resolution::{ResolutionFailure, ResolutionResult, ResolutionTask};
