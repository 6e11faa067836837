pub mod client;
pub mod error;
pub mod types;

pub use client::{ExportClient, ExportService};
pub use error::ServiceError;
pub use types::ExportStatus;
