//! Editor <-> deployment transformation
//!
//! Both directions are pure apart from id generation. Each validates its
//! output and fails with [`Error::TransformInvalid`] rather than return a
//! partially invalid structure.
//!
//! The two functions are not inverses of each other. Going from deployment
//! to editor regenerates every id, drops providers that list no models, and
//! ignores `config.models`: role membership comes only from each entry's
//! `allowed_roles`.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::catalog;
use crate::deployment::{
    validate_deployment, DeploymentConfig, ModelEntry, ProviderEntry, RoleTarget,
    DEFAULT_MAX_TOKENS,
};
use crate::error::{Error, Result};
use crate::types::{
    new_model_id, new_provider_id, EditorConfig, Model, Provider, ProviderType, Role,
};
use crate::validation::validate_batch;

/// Map provider ids to their deployment keys, rejecting key collisions
pub fn provider_keys(providers: &[Provider]) -> Result<HashMap<&str, String>> {
    let mut by_key: IndexMap<String, Vec<&str>> = IndexMap::new();
    for provider in providers {
        by_key
            .entry(provider.key())
            .or_default()
            .push(provider.name.as_str());
    }

    if let Some((key, names)) = by_key.iter().find(|(_, names)| names.len() > 1) {
        return Err(Error::KeyCollision {
            key: key.clone(),
            names: names.iter().map(|n| n.to_string()).collect(),
        });
    }

    Ok(providers
        .iter()
        .map(|p| (p.id.as_str(), p.key()))
        .collect())
}

/// Build the deployment documents from editor collections
///
/// Models are grouped under their provider's key in provider order. For each
/// role the first model in `models` order that carries it is assigned; roles
/// nobody carries are left out. This is a first-match rule, so callers that
/// want score-based routing must sort `models` first.
pub fn to_deployment_format(providers: &[Provider], models: &[Model]) -> Result<DeploymentConfig> {
    let keys = provider_keys(providers)?;

    if let Some(orphan) = models
        .iter()
        .find(|m| !keys.contains_key(m.provider_id.as_str()))
    {
        return Err(Error::ProviderNotFound(orphan.provider_id.clone()));
    }
    validate_batch(providers, models).into_result()?;

    let mut deployment = DeploymentConfig::default();

    for provider in providers {
        let key = &keys[provider.id.as_str()];
        let entries: Vec<ModelEntry> = models
            .iter()
            .filter(|m| m.provider_id == provider.id)
            .map(model_entry)
            .collect();
        if !entries.is_empty() {
            deployment.supported_models.insert(key.clone(), entries);
        }

        deployment.config.providers.insert(
            key.clone(),
            ProviderEntry {
                name: provider.name.clone(),
                endpoint: provider.endpoint.clone(),
                provider_type: provider.provider_type.to_string(),
                api_key: provider.api_key.clone(),
            },
        );
    }

    for role in Role::ALL {
        if let Some(model) = models.iter().find(|m| m.has_role(role)) {
            let target = RoleTarget {
                provider: keys[model.provider_id.as_str()].clone(),
                model: model.model_id.clone(),
            };
            debug!("Role {} -> {}/{}", role, target.provider, target.model);
            deployment.config.models.set(role, target);
        }
    }

    let report = validate_deployment(&deployment);
    if !report.is_valid() {
        return Err(Error::TransformInvalid {
            errors: report.errors,
        });
    }

    Ok(deployment)
}

fn model_entry(model: &Model) -> ModelEntry {
    ModelEntry {
        id: model.model_id.clone(),
        swe_score: model.swe_score.map(|score| score / 100.0),
        cost_per_1m_tokens: model.cost_per_1m_tokens,
        allowed_roles: Some(model.allowed_roles.clone()),
        max_tokens: Some(model.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
    }
}

/// Build editor collections from deployment documents
///
/// One provider per `supportedModels` key, in document order. Connection
/// settings come from `config.providers[key]` when present, else from the
/// well-known catalog.
pub fn to_editor_format(deployment: &DeploymentConfig) -> Result<EditorConfig> {
    let mut editor = EditorConfig::default();

    for (key, entries) in &deployment.supported_models {
        let provider = synthesize_provider(key, deployment.config.providers.get(key));
        editor
            .models
            .extend(entries.iter().map(|entry| synthesize_model(&provider.id, entry)));
        editor.providers.push(provider);
    }

    let report = validate_batch(&editor.providers, &editor.models);
    if !report.is_valid() {
        return Err(Error::TransformInvalid {
            errors: report.errors,
        });
    }

    Ok(editor)
}

fn synthesize_provider(key: &str, entry: Option<&ProviderEntry>) -> Provider {
    let entry = entry.cloned().unwrap_or_default();

    let name = non_empty(entry.name).unwrap_or_else(|| catalog::display_name(key));
    let endpoint =
        non_empty(entry.endpoint).unwrap_or_else(|| catalog::default_endpoint(key).to_string());
    let provider_type = match non_empty(entry.provider_type) {
        None => catalog::provider_type(key),
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Provider {}: unknown type '{}', treating as custom", key, raw);
            ProviderType::Custom
        }),
    };

    Provider {
        id: new_provider_id(),
        name,
        endpoint,
        is_valid: !entry.api_key.is_empty(),
        api_key: entry.api_key,
        provider_type,
    }
}

fn synthesize_model(provider_id: &str, entry: &ModelEntry) -> Model {
    Model {
        id: new_model_id(),
        name: catalog::model_display_name(&entry.id),
        provider_id: provider_id.to_string(),
        model_id: entry.id.clone(),
        swe_score: entry.swe_score.map(fraction_to_percent),
        max_tokens: Some(entry.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
        cost_per_1m_tokens: entry.cost_per_1m_tokens,
        allowed_roles: entry.allowed_roles.clone().unwrap_or_else(Role::defaults),
    }
}

/// Convert a [0, 1] fraction to a percentage, trimming float noise
/// (0.29 * 100 would otherwise give 28.999999999999996)
fn fraction_to_percent(fraction: f64) -> f64 {
    (fraction * 100.0 * 1e6).round() / 1e6
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelCost;

    fn provider(id: &str, name: &str) -> Provider {
        Provider {
            id: id.into(),
            name: name.into(),
            endpoint: "https://x.dev".into(),
            api_key: String::new(),
            provider_type: ProviderType::OpenAI,
            is_valid: false,
        }
    }

    fn model(id: &str, provider_id: &str, model_id: &str, roles: &[Role]) -> Model {
        Model {
            id: id.into(),
            name: model_id.into(),
            provider_id: provider_id.into(),
            model_id: model_id.into(),
            swe_score: None,
            max_tokens: None,
            cost_per_1m_tokens: ModelCost::default(),
            allowed_roles: roles.to_vec(),
        }
    }

    #[test]
    fn test_key_collision_detected() {
        let providers = vec![provider("p1", "Polo AI"), provider("p2", "PoloAI")];
        let err = to_deployment_format(&providers, &[]).unwrap_err();
        match err {
            Error::KeyCollision { key, names } => {
                assert_eq!(key, "poloai");
                assert_eq!(names, vec!["Polo AI", "PoloAI"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_orphan_model_rejected() {
        let err = to_deployment_format(
            &[provider("p1", "Acme")],
            &[model("m1", "p9", "x", &[])],
        )
        .unwrap_err();
        assert!(matches!(err, Error::ProviderNotFound(id) if id == "p9"));
    }

    #[test]
    fn test_invalid_input_rejected_before_transform() {
        let err = to_deployment_format(&[provider("p1", "Acme")], &[model("m1", "p1", "", &[])])
            .unwrap_err();
        assert!(matches!(err, Error::ValidationFailed { .. }));
    }

    #[test]
    fn test_default_max_tokens_written() {
        let deployment =
            to_deployment_format(&[provider("p1", "Acme")], &[model("m1", "p1", "x", &[])])
                .unwrap();
        assert_eq!(
            deployment.supported_models["acme"][0].max_tokens,
            Some(DEFAULT_MAX_TOKENS)
        );
    }

    #[test]
    fn test_unknown_type_becomes_custom() {
        let entry = ProviderEntry {
            name: "PoloAI".into(),
            endpoint: "https://api.polo.ai".into(),
            provider_type: "polo".into(),
            api_key: String::new(),
        };
        let provider = synthesize_provider("polo", Some(&entry));
        assert_eq!(provider.provider_type, ProviderType::Custom);
        assert!(!provider.is_valid);
    }

    #[test]
    fn test_percent_conversion_trims_noise() {
        assert_eq!(fraction_to_percent(0.29), 29.0);
        assert_eq!(fraction_to_percent(0.5), 50.0);
    }
}
