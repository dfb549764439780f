//! Import/export between the store and the deployment documents
//!
//! Drives the transformer and validators around the injected document
//! reader/writer. Nothing touches the store until every check has passed.

pub mod backup;
pub mod documents;

pub use backup::EditorSnapshot;
pub use documents::{DocumentReader, DocumentWriter, MemoryDocuments, ProjectDocuments};

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::deployment::{
    validate_deployment_shape, validate_entries, ConfigDocument, DeploymentConfig,
    SupportedModels, CONFIG_DOCUMENT, SUPPORTED_MODELS_DOCUMENT,
};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::transform::{to_deployment_format, to_editor_format};
use crate::types::EditorConfig;
use crate::validation::validate_batch;

pub struct Exchange {
    store: Arc<Store>,
    reader: Arc<dyn DocumentReader>,
    writer: Arc<dyn DocumentWriter>,
}

impl Exchange {
    pub fn new(
        store: Arc<Store>,
        reader: Arc<dyn DocumentReader>,
        writer: Arc<dyn DocumentWriter>,
    ) -> Self {
        Self {
            store,
            reader,
            writer,
        }
    }

    /// Use one object as both reader and writer
    pub fn with_documents<D>(store: Arc<Store>, documents: Arc<D>) -> Self
    where
        D: DocumentReader + DocumentWriter + 'static,
    {
        Self::new(store, documents.clone(), documents)
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Write the store contents as deployment documents
    ///
    /// Both documents go to the writer as one batch, so a failure leaves
    /// neither of them replaced.
    pub async fn export_to_deployment_files(&self) -> Result<DeploymentConfig> {
        let snapshot = self.store.snapshot().await;
        let deployment = to_deployment_format(&snapshot.providers, &snapshot.models)?;

        let supported = serde_json::to_value(&deployment.supported_models)?;
        let config = serde_json::to_value(&deployment.config)?;
        validate_deployment_shape(Some(&supported), Some(&config)).into_result()?;

        self.writer
            .write_all(&[
                (SUPPORTED_MODELS_DOCUMENT, &supported),
                (CONFIG_DOCUMENT, &config),
            ])
            .await?;

        info!(
            "Exported {} provider keys with models, {} provider entries",
            deployment.supported_models.len(),
            deployment.config.providers.len()
        );
        Ok(deployment)
    }

    /// Replace the store contents with the deployment documents
    ///
    /// A missing `config.json` is treated as empty; a missing
    /// `supported-models.json` fails the shape check.
    pub async fn import_from_deployment_files(&self) -> Result<EditorConfig> {
        let supported = self.reader.read(SUPPORTED_MODELS_DOCUMENT).await?;
        let config = self
            .reader
            .read(CONFIG_DOCUMENT)
            .await?
            .unwrap_or_else(|| json!({}));

        validate_deployment_shape(supported.as_ref(), Some(&config)).into_result()?;
        let deployment = decode(supported.unwrap_or(Value::Null), config)?;
        validate_entries(&deployment.supported_models).into_result()?;

        let editor = to_editor_format(&deployment)?;
        validate_batch(&editor.providers, &editor.models).into_result()?;

        self.store
            .import_configuration(editor.providers.clone(), editor.models.clone())
            .await?;

        info!(
            "Imported {} providers and {} models from deployment files",
            editor.providers.len(),
            editor.models.len()
        );
        Ok(editor)
    }

    /// Snapshot the store for a backup file
    pub async fn export_backup(&self) -> EditorSnapshot {
        EditorSnapshot::new(self.store.snapshot().await)
    }

    /// Restore a backup, keeping its ids
    pub async fn import_backup(&self, snapshot: EditorSnapshot) -> Result<()> {
        let config = snapshot.into_editor_config();
        self.store
            .import_configuration(config.providers, config.models)
            .await
    }
}

fn decode(supported: Value, config: Value) -> Result<DeploymentConfig> {
    let supported_models: SupportedModels = serde_json::from_value(supported).map_err(|e| {
        Error::validation(vec![format!("{}: {}", SUPPORTED_MODELS_DOCUMENT, e)])
    })?;
    let config: ConfigDocument = serde_json::from_value(config)
        .map_err(|e| Error::validation(vec![format!("{}: {}", CONFIG_DOCUMENT, e)]))?;

    Ok(DeploymentConfig {
        supported_models,
        config,
    })
}
