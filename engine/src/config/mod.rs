// Engine configuration
pub mod settings;

pub use settings::{EngineSettings, StorageKind, StorageSettings};
