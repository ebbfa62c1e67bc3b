pub mod cache;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod ingest;
pub mod intent;
pub mod report;
pub mod timerange;

pub use context::{ContextAssembler, ContextResult};
pub use error::{EngineError, EngineResult};
