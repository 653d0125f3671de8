pub mod config;
pub mod error;
pub mod flow_graph;
pub mod types;

pub use config::{ConfigLoader, ConfigValidator, EngineConfig};
pub use error::FlowError;
pub use types::{ErrorCategory, ErrorSeverity};
