// Adapters layer: concrete implementations of the domain ports (opportunity service, snapshot store).

pub mod http;
pub mod recording;
pub mod store;

pub use http::HttpOpportunityClient;
pub use recording::{OpportunityCommand, RecordingOpportunityWriter};
pub use store::{SnapshotStore, TenantSnapshot};
