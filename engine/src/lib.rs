// Engine library root: configuration, the storage collaborator and the
// emissions service used by the `esg-engine` binary.

pub mod config;
pub mod data;
pub mod error;
pub mod services;

pub use error::EngineError;
