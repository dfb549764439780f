//! Editor-side configuration records
//!
//! Providers and models as the editor (and the persisted blob) see them.
//! Field names serialize in camelCase to match the persisted layout.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque provider identifier
pub type ProviderId = String;

/// Opaque model record identifier (not the upstream model id)
pub type ModelRecordId = String;

/// Request-shape family of a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// OpenAI-compatible chat completions
    OpenAI,
    Anthropic,
    Google,
    Custom,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::OpenAI => "openai",
            ProviderType::Anthropic => "anthropic",
            ProviderType::Google => "google",
            ProviderType::Custom => "custom",
        }
    }

    pub fn all() -> [ProviderType; 4] {
        [
            ProviderType::OpenAI,
            ProviderType::Anthropic,
            ProviderType::Google,
            ProviderType::Custom,
        ]
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderType::OpenAI),
            "anthropic" => Ok(ProviderType::Anthropic),
            "google" | "gemini" => Ok(ProviderType::Google),
            "custom" => Ok(ProviderType::Custom),
            _ => Err(format!("Unknown provider type: {}", s)),
        }
    }
}

/// Routing role a model may fill downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Main,
    Fallback,
    Research,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Main, Role::Fallback, Role::Research];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Main => "main",
            Role::Fallback => "fallback",
            Role::Research => "research",
        }
    }

    /// Roles assumed when a deployment entry does not list any
    pub fn defaults() -> Vec<Role> {
        vec![Role::Main, Role::Fallback]
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "main" => Ok(Role::Main),
            "fallback" => Ok(Role::Fallback),
            "research" => Ok(Role::Research),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Price per one million tokens
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCost {
    #[serde(default)]
    pub input: f64,
    #[serde(default)]
    pub output: f64,
}

impl ModelCost {
    pub fn new(input: f64, output: f64) -> Self {
        Self { input, output }
    }
}

/// A named upstream API endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    /// Base URL without the `/v1` suffix
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// Last connectivity test outcome. Advisory only.
    #[serde(default)]
    pub is_valid: bool,
}

impl Provider {
    /// Key used for this provider in the deployment documents
    pub fn key(&self) -> String {
        provider_key(&self.name)
    }
}

/// A specific upstream model offered by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    pub id: ModelRecordId,
    pub name: String,
    pub provider_id: ProviderId,
    /// Upstream model identifier, unique within one provider
    pub model_id: String,
    /// SWE-bench score as a percentage
    #[serde(default)]
    pub swe_score: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u64>,
    #[serde(rename = "costPer1MTokens", default)]
    pub cost_per_1m_tokens: ModelCost,
    #[serde(default)]
    pub allowed_roles: Vec<Role>,
}

impl Model {
    pub fn has_role(&self, role: Role) -> bool {
        self.allowed_roles.contains(&role)
    }
}

/// Provider fields supplied by a caller; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderDraft {
    pub name: String,
    pub endpoint: String,
    pub api_key: String,
    pub provider_type: ProviderType,
}

impl ProviderDraft {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        provider_type: ProviderType,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            api_key: String::new(),
            provider_type,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub(crate) fn into_provider(self, id: ProviderId) -> Provider {
        Provider {
            id,
            name: self.name,
            endpoint: self.endpoint,
            api_key: self.api_key,
            provider_type: self.provider_type,
            is_valid: false,
        }
    }
}

/// Model fields supplied by a caller; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDraft {
    pub name: String,
    pub provider_id: ProviderId,
    pub model_id: String,
    pub swe_score: Option<f64>,
    pub max_tokens: Option<u64>,
    pub cost_per_1m_tokens: ModelCost,
    pub allowed_roles: Vec<Role>,
}

impl ModelDraft {
    pub fn new(
        name: impl Into<String>,
        provider_id: impl Into<ProviderId>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            provider_id: provider_id.into(),
            model_id: model_id.into(),
            swe_score: None,
            max_tokens: None,
            cost_per_1m_tokens: ModelCost::default(),
            allowed_roles: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.allowed_roles = roles.into_iter().collect();
        self
    }

    pub fn with_swe_score(mut self, score: f64) -> Self {
        self.swe_score = Some(score);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_cost(mut self, input: f64, output: f64) -> Self {
        self.cost_per_1m_tokens = ModelCost::new(input, output);
        self
    }

    pub(crate) fn into_model(self, id: ModelRecordId) -> Model {
        Model {
            id,
            name: self.name,
            provider_id: self.provider_id,
            model_id: self.model_id,
            swe_score: self.swe_score,
            max_tokens: self.max_tokens,
            cost_per_1m_tokens: self.cost_per_1m_tokens,
            allowed_roles: self.allowed_roles,
        }
    }
}

/// The editor representation: providers and models in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    pub providers: Vec<Provider>,
    pub models: Vec<Model>,
}

/// Normalize a provider name into its deployment key
///
/// Lower-cases the name and drops everything outside `[a-z0-9]`, so
/// "Polo AI" and "PoloAI" both become `poloai`.
pub fn provider_key(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Generate a fresh provider id (time ordered, never reused)
pub fn new_provider_id() -> ProviderId {
    format!("provider_{}", Uuid::now_v7().simple())
}

/// Generate a fresh model record id
pub fn new_model_id() -> ModelRecordId {
    format!("model_{}", Uuid::now_v7().simple())
}
