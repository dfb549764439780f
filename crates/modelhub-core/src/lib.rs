//! modelhub core - provider and model configuration for a task runner
//!
//! This crate provides:
//! - Provider/model records and their validation rules
//! - A store that keeps the records consistent and persisted
//! - Transforms between the editor layout and the runner's deployment files
//! - Import/export of those files

pub mod catalog;
pub mod config;
pub mod deployment;
pub mod error;
pub mod exchange;
pub mod store;
pub mod transform;
pub mod types;
pub mod validation;

pub use config::{Config, ConfigManager};
pub use deployment::{
    ConfigDocument, DeploymentConfig, ModelEntry, ProviderEntry, RoleAssignments, RoleTarget,
    SupportedModels, CONFIG_DOCUMENT, SUPPORTED_MODELS_DOCUMENT,
};
pub use error::{Error, Result};
pub use exchange::{
    DocumentReader, DocumentWriter, EditorSnapshot, Exchange, MemoryDocuments, ProjectDocuments,
};
pub use store::{BlobStore, FileBlobStore, MemoryBlobStore, Store, StoreOptions};
pub use transform::{to_deployment_format, to_editor_format};
pub use types::{
    provider_key, EditorConfig, Model, ModelCost, ModelDraft, Provider, ProviderDraft,
    ProviderType, Role,
};
pub use validation::{validate_batch, validate_model, validate_provider, ValidationResult};
