//! Application layer: the processing pipeline and its supporting state.

pub mod cache;
pub mod service;
pub mod state;

pub use cache::ProcessedCache;
pub use service::{determine_primary_mapping, WebhookService};
pub use state::AppState;
