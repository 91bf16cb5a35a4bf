//! Retrieval, routing and answering pipeline plus configuration for ragvs.

pub mod config;
pub mod error;
pub mod ingest;
pub mod prompt;
pub mod retriever;
pub mod router;
pub mod service;

pub use config::Config;
pub use error::{IngestError, RagError, Stage};
pub use ingest::StoreReport;
pub use retriever::Retriever;
pub use router::{RouteDecision, decide};
pub use service::{QueryAnswer, RagService, RoutedAnswer};
