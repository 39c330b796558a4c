//! Provider configuration records and storage.

mod model;
mod repository;

pub use model::{ConfigId, ProviderConfig, ValidationError, validate_config};
pub use repository::ConfigRepository;
