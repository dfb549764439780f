//! Deployment representation
//!
//! The two JSON documents consumed by the downstream task runner:
//! `supported-models.json` (provider key -> model entries) and `config.json`
//! (role assignments plus provider connection settings). Maps keep document
//! order.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{ModelCost, Role};
use crate::validation::ValidationResult;

/// Document name of the supported models table
pub const SUPPORTED_MODELS_DOCUMENT: &str = "supported-models.json";
/// Document name of the runner configuration
pub const CONFIG_DOCUMENT: &str = "config.json";

/// `max_tokens` written for models without an explicit limit
pub const DEFAULT_MAX_TOKENS: u64 = 200_000;

/// Provider key -> model entries
pub type SupportedModels = IndexMap<String, Vec<ModelEntry>>;

/// One model in `supported-models.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Upstream model id
    pub id: String,
    /// SWE-bench score as a fraction in [0, 1]
    #[serde(default)]
    pub swe_score: Option<f64>,
    #[serde(default)]
    pub cost_per_1m_tokens: ModelCost,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_roles: Option<Vec<Role>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
}

/// Role target in `config.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTarget {
    pub provider: String,
    pub model: String,
}

/// `config.models`: which model fills each role
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<RoleTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<RoleTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research: Option<RoleTarget>,
}

impl RoleAssignments {
    pub fn get(&self, role: Role) -> Option<&RoleTarget> {
        match role {
            Role::Main => self.main.as_ref(),
            Role::Fallback => self.fallback.as_ref(),
            Role::Research => self.research.as_ref(),
        }
    }

    pub fn set(&mut self, role: Role, target: RoleTarget) {
        let slot = match role {
            Role::Main => &mut self.main,
            Role::Fallback => &mut self.fallback,
            Role::Research => &mut self.research,
        };
        *slot = Some(target);
    }
}

/// `config.providers[key]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoint: String,
    /// Kept as a string: downstream files may carry types this tool does not model
    #[serde(rename = "type", default)]
    pub provider_type: String,
    #[serde(rename = "apiKey", default)]
    pub api_key: String,
}

/// Contents of `config.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub models: RoleAssignments,
    #[serde(default)]
    pub providers: IndexMap<String, ProviderEntry>,
}

/// Both deployment documents together
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    #[serde(rename = "supportedModels")]
    pub supported_models: SupportedModels,
    pub config: ConfigDocument,
}

/// Check the model entries of `supported-models.json`
pub fn validate_entries(supported: &SupportedModels) -> ValidationResult {
    let mut result = ValidationResult::default();

    for (key, entries) in supported {
        if key.is_empty() {
            result.errors.push("Provider key must not be empty".to_string());
        }

        let mut ids = HashSet::new();
        for (index, entry) in entries.iter().enumerate() {
            let at = format!("Provider {}, Model {}", key, index + 1);
            if entry.id.trim().is_empty() {
                result.errors.push(format!("{}: ID is required", at));
            } else if !ids.insert(entry.id.as_str()) {
                result.errors.push(format!("{}: duplicate model id '{}'", at, entry.id));
            }
            if let Some(score) = entry.swe_score {
                if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                    result
                        .errors
                        .push(format!("{}: swe_score must be between 0 and 1, got {}", at, score));
                }
            }
            let cost = &entry.cost_per_1m_tokens;
            if !cost.input.is_finite() || cost.input < 0.0 {
                result.errors.push(format!("{}: input cost must be non-negative", at));
            }
            if !cost.output.is_finite() || cost.output < 0.0 {
                result.errors.push(format!("{}: output cost must be non-negative", at));
            }
            if let Some(roles) = &entry.allowed_roles {
                let unique: HashSet<&Role> = roles.iter().collect();
                if unique.len() != roles.len() {
                    result.errors.push(format!("{}: allowed_roles has duplicates", at));
                }
            }
        }
    }

    result
}

/// Check a complete deployment configuration
///
/// Entry checks plus role assignments: each assigned role must point at a
/// model listed under the named provider key, and every key with models must
/// have a provider entry.
pub fn validate_deployment(deployment: &DeploymentConfig) -> ValidationResult {
    let mut result = validate_entries(&deployment.supported_models);

    for role in Role::ALL {
        let Some(target) = deployment.config.models.get(role) else {
            continue;
        };
        let listed = deployment
            .supported_models
            .get(&target.provider)
            .is_some_and(|entries| entries.iter().any(|e| e.id == target.model));
        if !listed {
            result.errors.push(format!(
                "Role {}: model '{}' is not listed under provider '{}'",
                role, target.model, target.provider
            ));
        }
    }

    for key in deployment.supported_models.keys() {
        if !deployment.config.providers.contains_key(key) {
            result
                .errors
                .push(format!("Provider {}: missing entry in config.providers", key));
        }
    }

    result
}

/// Structural check on the raw documents
///
/// Verifies both sections exist, `supportedModels` maps keys to arrays of
/// objects with a string `id`, and `config` is an object. Runs before typed
/// decoding so problems are reported as a list rather than a decode error.
pub fn validate_deployment_shape(
    supported_models: Option<&Value>,
    config: Option<&Value>,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    match supported_models {
        None | Some(Value::Null) => {
            result.errors.push("Missing supportedModels section".to_string());
        }
        Some(Value::Object(map)) => {
            for (key, models) in map {
                let Some(models) = models.as_array() else {
                    result
                        .errors
                        .push(format!("Provider {}: Models must be an array", key));
                    continue;
                };
                for (index, model) in models.iter().enumerate() {
                    let has_id = model
                        .get("id")
                        .and_then(Value::as_str)
                        .is_some_and(|id| !id.is_empty());
                    if !has_id {
                        result
                            .errors
                            .push(format!("Provider {}, Model {}: ID is required", key, index + 1));
                    }
                }
            }
        }
        Some(_) => {
            result
                .errors
                .push("supportedModels section must be an object".to_string());
        }
    }

    match config {
        None | Some(Value::Null) => result.errors.push("Missing config section".to_string()),
        Some(Value::Object(map)) => {
            for section in ["models", "providers"] {
                if let Some(value) = map.get(section) {
                    if !value.is_object() {
                        result
                            .errors
                            .push(format!("config.{} must be an object", section));
                    }
                }
            }
        }
        Some(_) => result.errors.push("config section must be an object".to_string()),
    }

    result
}
