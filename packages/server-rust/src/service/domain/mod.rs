//! Domain services reached through the operation router, and the scheduled
//! jobs that run over them.

pub mod records;
pub mod stats;

pub use records::RecordService;
pub use stats::{RecordStatsJob, StatsReport};
