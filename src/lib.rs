pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliArgs;
pub use config::RenewalConfig;

pub use adapters::{HttpOpportunityClient, RecordingOpportunityWriter, SnapshotStore};
pub use core::renewal::{BatchSummary, RenewalHandler, RenewalOutcome};
pub use core::trigger::{RenewalEvent, RenewalOperation, RenewalTrigger};
pub use utils::error::{RenewalError, Result};
