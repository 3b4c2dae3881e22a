pub mod adapters;
pub mod company;
pub mod config;
pub mod crawl;
pub mod decay;
pub mod error;
pub mod insights;
pub mod orchestrator;
pub mod rate_limiter;
pub mod robots;
pub mod store;
pub mod topics;
pub mod types;

pub use config::{load_config, PipelineConfig};
pub use error::{PipelineError, Result};
pub use orchestrator::Orchestrator;
pub use store::{MemoryStore, PersistenceGateway};
