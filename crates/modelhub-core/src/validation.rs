//! Per-record structural validation
//!
//! Pure checks on single providers and models. Every violation is collected
//! so callers can show the whole list at once. Cross-entity rules (name
//! uniqueness, provider existence) belong to the store.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::{Error, Result};
use crate::types::{Model, Provider};

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 50;

static NAME_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\s\-_\.]+$").expect("name regex is valid"));

/// Outcome of validating one record or a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Convert into `Err(ValidationFailed)` when there are errors
    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::validation(self.errors))
        }
    }
}

/// Validate a single provider record
pub fn validate_provider(provider: &Provider) -> ValidationResult {
    let mut result = ValidationResult::default();

    if provider.id.trim().is_empty() {
        result.push("Provider id is required");
    }

    let name = provider.name.trim();
    if name.is_empty() {
        result.push("Name is required");
    } else {
        let len = provider.name.chars().count();
        if len < NAME_MIN_LEN {
            result.push(format!("Name must be at least {} characters", NAME_MIN_LEN));
        } else if len > NAME_MAX_LEN {
            result.push(format!("Name must be at most {} characters", NAME_MAX_LEN));
        }
        if !NAME_CHARSET.is_match(&provider.name) {
            result.push(
                "Name may only contain letters, digits, spaces, hyphens, underscores and dots",
            );
        } else if !provider.name.chars().any(|c| c.is_ascii_alphanumeric()) {
            result.push("Name must contain at least one letter or digit");
        }
    }

    if let Err(message) = check_endpoint(&provider.endpoint) {
        result.push(message);
    }

    result
}

fn check_endpoint(endpoint: &str) -> std::result::Result<(), String> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err("Endpoint is required".to_string());
    }

    let url = Url::parse(endpoint).map_err(|e| format!("Endpoint is not a valid URL: {}", e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(format!("Endpoint must use http or https, got {}", url.scheme()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err("Endpoint must include a host".to_string());
    }
    if endpoint.trim_end_matches('/').ends_with("/v1") {
        return Err("Endpoint must not include the /v1 suffix".to_string());
    }
    Ok(())
}

/// Validate a single model record
pub fn validate_model(model: &Model) -> ValidationResult {
    let mut result = ValidationResult::default();

    if model.id.trim().is_empty() {
        result.push("Model id is required");
    }
    if model.name.trim().is_empty() {
        result.push("Name is required");
    }
    if model.provider_id.trim().is_empty() {
        result.push("Provider ID is required");
    }
    if model.model_id.trim().is_empty() {
        result.push("Model ID is required");
    }

    if let Some(score) = model.swe_score {
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            result.push(format!("SWE score must be between 0 and 100, got {}", score));
        }
    }

    let cost = &model.cost_per_1m_tokens;
    for (label, value) in [("input", cost.input), ("output", cost.output)] {
        if !value.is_finite() || value < 0.0 {
            result.push(format!("Cost per 1M {} tokens must be non-negative, got {}", label, value));
        }
    }

    let mut seen = HashSet::new();
    for role in &model.allowed_roles {
        if !seen.insert(role) {
            result.push(format!("Role '{}' is listed more than once", role));
        }
    }

    result
}

/// Validate a whole editor batch
///
/// Messages are prefixed with the 1-based record position. Besides the
/// per-record checks, models referencing a provider missing from the batch
/// are reported.
pub fn validate_batch(providers: &[Provider], models: &[Model]) -> ValidationResult {
    let mut result = ValidationResult::default();

    for (index, provider) in providers.iter().enumerate() {
        for error in validate_provider(provider).errors {
            result.push(format!("Provider {} ({}): {}", index + 1, provider.name, error));
        }
    }

    let provider_ids: HashSet<&str> = providers.iter().map(|p| p.id.as_str()).collect();
    for (index, model) in models.iter().enumerate() {
        for error in validate_model(model).errors {
            result.push(format!("Model {} ({}): {}", index + 1, model.name, error));
        }
        if !model.provider_id.is_empty() && !provider_ids.contains(model.provider_id.as_str()) {
            result.push(format!(
                "Model {} ({}): Referenced provider not found",
                index + 1,
                model.name
            ));
        }
    }

    result
}
