//! Authoritative provider/model store
//!
//! Owns the editor collections and enforces the integrity rules on every
//! mutation:
//! - every model references a live provider (deleting a provider cascades)
//! - provider names are unique case-insensitively, and so are their keys
//! - `(provider_id, model_id)` pairs are unique
//! - ids are assigned once by the store
//!
//! Each mutation validates, checks the rules against the current state,
//! persists the candidate state through the [`BlobStore`] and only then
//! commits it in memory. All of that happens under one lock, so concurrent
//! callers are serialized and a failed write leaves nothing half-applied.

pub mod blob;

pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::catalog;
use crate::error::{Error, Result};
use crate::transform::provider_keys;
use crate::types::{
    new_model_id, new_provider_id, EditorConfig, Model, ModelDraft, Provider, ProviderDraft, Role,
};
use crate::validation::{validate_batch, validate_model, validate_provider};

/// Blob key used when none is configured
pub const DEFAULT_STORAGE_KEY: &str = "modelhub-editor-config";

/// Store construction options
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Blob key holding the persisted state
    pub storage_key: String,
    /// Seed the catalog's default providers when nothing is persisted yet
    pub seed_defaults: bool,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            seed_defaults: true,
        }
    }
}

/// Persisted blob layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedConfig {
    #[serde(default)]
    pub providers: Vec<Provider>,
    #[serde(default)]
    pub models: Vec<Model>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
struct State {
    providers: Vec<Provider>,
    models: Vec<Model>,
}

impl State {
    fn seeded() -> Self {
        Self {
            providers: catalog::default_providers()
                .into_iter()
                .map(|draft| draft.into_provider(new_provider_id()))
                .collect(),
            models: Vec::new(),
        }
    }

    fn provider_index(&self, id: &str) -> Result<usize> {
        self.providers
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::ProviderNotFound(id.to_string()))
    }

    fn model_index(&self, id: &str) -> Result<usize> {
        self.models
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| Error::ModelNotFound(id.to_string()))
    }
}

/// The provider/model store
pub struct Store {
    blob: Arc<dyn BlobStore>,
    options: StoreOptions,
    state: Mutex<State>,
}

impl Store {
    /// Restore the store from its blob, seeding defaults on first use
    ///
    /// A persisted blob that breaks validation or integrity rules is rejected
    /// rather than loaded.
    pub async fn open(blob: Arc<dyn BlobStore>, options: StoreOptions) -> Result<Self> {
        let raw = blob.get(&options.storage_key).await?;
        let restored = raw.is_some();
        let state = match raw {
            Some(raw) => {
                let persisted: PersistedConfig = serde_json::from_str(&raw)?;
                validate_batch(&persisted.providers, &persisted.models).into_result()?;
                check_integrity(&persisted.providers, &persisted.models)?;
                debug!(
                    "Restored {} providers and {} models (last updated {:?})",
                    persisted.providers.len(),
                    persisted.models.len(),
                    persisted.last_updated
                );
                State {
                    providers: persisted.providers,
                    models: persisted.models,
                }
            }
            None => State::default(),
        };

        let store = Self {
            blob,
            options,
            state: Mutex::new(state),
        };

        if !restored && store.options.seed_defaults {
            let mut guard = store.state.lock().await;
            store.commit(&mut guard, State::seeded()).await?;
            info!("Seeded {} default providers", guard.providers.len());
        }

        Ok(store)
    }

    /// Store backed by a fresh [`MemoryBlobStore`]
    pub async fn in_memory(options: StoreOptions) -> Result<Self> {
        Self::open(Arc::new(MemoryBlobStore::new()), options).await
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    // ---- queries --------------------------------------------------------

    /// All providers in insertion order
    pub async fn providers(&self) -> Vec<Provider> {
        self.state.lock().await.providers.clone()
    }

    /// All models in insertion order
    pub async fn models(&self) -> Vec<Model> {
        self.state.lock().await.models.clone()
    }

    /// Providers and models read under one lock
    pub async fn snapshot(&self) -> EditorConfig {
        let state = self.state.lock().await;
        EditorConfig {
            providers: state.providers.clone(),
            models: state.models.clone(),
        }
    }

    pub async fn provider(&self, id: &str) -> Option<Provider> {
        let state = self.state.lock().await;
        state.providers.iter().find(|p| p.id == id).cloned()
    }

    pub async fn model(&self, id: &str) -> Option<Model> {
        let state = self.state.lock().await;
        state.models.iter().find(|m| m.id == id).cloned()
    }

    pub async fn models_for_provider(&self, provider_id: &str) -> Vec<Model> {
        let state = self.state.lock().await;
        state
            .models
            .iter()
            .filter(|m| m.provider_id == provider_id)
            .cloned()
            .collect()
    }

    pub async fn models_for_role(&self, role: Role) -> Vec<Model> {
        let state = self.state.lock().await;
        state
            .models
            .iter()
            .filter(|m| m.has_role(role))
            .cloned()
            .collect()
    }

    // ---- provider mutations ---------------------------------------------

    /// Add a provider; the store assigns its id
    pub async fn add_provider(&self, draft: ProviderDraft) -> Result<Provider> {
        let provider = draft.into_provider(new_provider_id());
        validate_provider(&provider).into_result()?;

        let mut state = self.state.lock().await;
        check_provider_name(&state.providers, &provider)?;

        let mut candidate = state.clone();
        candidate.providers.push(provider.clone());
        self.commit(&mut state, candidate).await?;

        info!("Added provider {} ({})", provider.name, provider.id);
        Ok(provider)
    }

    /// Replace a provider record; its id selects the record and is kept
    pub async fn update_provider(&self, provider: Provider) -> Result<Provider> {
        validate_provider(&provider).into_result()?;

        let mut state = self.state.lock().await;
        let index = state.provider_index(&provider.id)?;
        check_provider_name(&state.providers, &provider)?;

        let mut candidate = state.clone();
        candidate.providers[index] = provider.clone();
        self.commit(&mut state, candidate).await?;

        info!("Updated provider {} ({})", provider.name, provider.id);
        Ok(provider)
    }

    /// Delete a provider and every model that references it
    ///
    /// Returns the models removed by the cascade. Provider and models go in
    /// the same write.
    pub async fn delete_provider(&self, id: &str) -> Result<Vec<Model>> {
        let mut state = self.state.lock().await;
        let index = state.provider_index(id)?;

        let mut candidate = state.clone();
        let removed = candidate.providers.remove(index);
        let (cascaded, kept): (Vec<Model>, Vec<Model>) = candidate
            .models
            .into_iter()
            .partition(|m| m.provider_id == id);
        candidate.models = kept;
        self.commit(&mut state, candidate).await?;

        info!(
            "Deleted provider {} ({}) and {} models",
            removed.name,
            removed.id,
            cascaded.len()
        );
        Ok(cascaded)
    }

    /// Record the outcome of a connectivity test
    pub async fn set_provider_validity(&self, id: &str, is_valid: bool) -> Result<Provider> {
        let mut state = self.state.lock().await;
        let index = state.provider_index(id)?;

        let mut candidate = state.clone();
        candidate.providers[index].is_valid = is_valid;
        let provider = candidate.providers[index].clone();
        self.commit(&mut state, candidate).await?;

        debug!("Provider {} marked valid={}", id, is_valid);
        Ok(provider)
    }

    // ---- model mutations ------------------------------------------------

    /// Add a model; the store assigns its id
    pub async fn add_model(&self, draft: ModelDraft) -> Result<Model> {
        let model = draft.into_model(new_model_id());
        validate_model(&model).into_result()?;

        let mut state = self.state.lock().await;
        state.provider_index(&model.provider_id)?;
        check_model_id(&state.models, &model)?;

        let mut candidate = state.clone();
        candidate.models.push(model.clone());
        self.commit(&mut state, candidate).await?;

        info!("Added model {} ({}) to provider {}", model.model_id, model.id, model.provider_id);
        Ok(model)
    }

    /// Replace a model record; its id selects the record and is kept
    pub async fn update_model(&self, model: Model) -> Result<Model> {
        validate_model(&model).into_result()?;

        let mut state = self.state.lock().await;
        let index = state.model_index(&model.id)?;
        state.provider_index(&model.provider_id)?;
        check_model_id(&state.models, &model)?;

        let mut candidate = state.clone();
        candidate.models[index] = model.clone();
        self.commit(&mut state, candidate).await?;

        info!("Updated model {} ({})", model.model_id, model.id);
        Ok(model)
    }

    /// Delete one model, returning it
    pub async fn delete_model(&self, id: &str) -> Result<Model> {
        let mut state = self.state.lock().await;
        let index = state.model_index(id)?;

        let mut candidate = state.clone();
        let removed = candidate.models.remove(index);
        self.commit(&mut state, candidate).await?;

        info!("Deleted model {} ({})", removed.model_id, removed.id);
        Ok(removed)
    }

    // ---- bulk operations ------------------------------------------------

    /// Replace both collections with a batch
    ///
    /// Every record is validated and all messages are collected; the batch is
    /// then checked against the integrity rules. Nothing changes unless the
    /// whole batch passes.
    pub async fn import_configuration(
        &self,
        providers: Vec<Provider>,
        models: Vec<Model>,
    ) -> Result<()> {
        validate_batch(&providers, &models).into_result()?;
        check_integrity(&providers, &models)?;

        let mut state = self.state.lock().await;
        let candidate = State { providers, models };
        self.commit(&mut state, candidate).await?;

        info!(
            "Imported {} providers and {} models",
            state.providers.len(),
            state.models.len()
        );
        Ok(())
    }

    /// Drop everything and start over, re-seeding defaults when configured
    pub async fn reset(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if self.options.seed_defaults {
            self.commit(&mut state, State::seeded()).await?;
        } else {
            self.blob.remove(&self.options.storage_key).await?;
            *state = State::default();
        }
        info!("Configuration reset");
        Ok(())
    }

    /// Persist `candidate`, then make it the current state
    async fn commit(&self, state: &mut MutexGuard<'_, State>, candidate: State) -> Result<()> {
        let persisted = PersistedConfig {
            providers: candidate.providers,
            models: candidate.models,
            last_updated: Some(Utc::now()),
        };
        let raw = serde_json::to_string(&persisted)?;
        self.blob.set(&self.options.storage_key, &raw).await?;
        debug!(
            "Persisted {} providers / {} models under '{}'",
            persisted.providers.len(),
            persisted.models.len(),
            self.options.storage_key
        );

        **state = State {
            providers: persisted.providers,
            models: persisted.models,
        };
        Ok(())
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Reject a provider whose name or key clashes with another provider
fn check_provider_name(existing: &[Provider], provider: &Provider) -> Result<()> {
    let others = existing.iter().filter(|p| p.id != provider.id);

    let key = provider.key();
    for other in others {
        if same_name(&other.name, &provider.name) {
            return Err(Error::DuplicateName(provider.name.clone()));
        }
        if other.key() == key {
            return Err(Error::KeyCollision {
                key,
                names: vec![other.name.clone(), provider.name.clone()],
            });
        }
    }
    Ok(())
}

/// Reject a model whose upstream id already exists under the same provider
fn check_model_id(existing: &[Model], model: &Model) -> Result<()> {
    let duplicate = existing.iter().any(|m| {
        m.id != model.id && m.provider_id == model.provider_id && m.model_id == model.model_id
    });
    if duplicate {
        return Err(Error::DuplicateModelId {
            provider_id: model.provider_id.clone(),
            model_id: model.model_id.clone(),
        });
    }
    Ok(())
}

/// Check a whole batch against the integrity rules
fn check_integrity(providers: &[Provider], models: &[Model]) -> Result<()> {
    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for provider in providers {
        if !ids.insert(provider.id.as_str()) {
            return Err(Error::validation(vec![format!(
                "Duplicate provider id: {}",
                provider.id
            )]));
        }
        if !names.insert(provider.name.trim().to_lowercase()) {
            return Err(Error::DuplicateName(provider.name.clone()));
        }
    }
    provider_keys(providers)?;

    let mut model_ids = HashSet::new();
    let mut pairs = HashSet::new();
    for model in models {
        if !model_ids.insert(model.id.as_str()) {
            return Err(Error::validation(vec![format!(
                "Duplicate model id: {}",
                model.id
            )]));
        }
        if !ids.contains(model.provider_id.as_str()) {
            return Err(Error::ProviderNotFound(model.provider_id.clone()));
        }
        if !pairs.insert((model.provider_id.as_str(), model.model_id.as_str())) {
            return Err(Error::DuplicateModelId {
                provider_id: model.provider_id.clone(),
                model_id: model.model_id.clone(),
            });
        }
    }
    Ok(())
}
