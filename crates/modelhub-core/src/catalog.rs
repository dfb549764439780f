//! Well-known provider catalog
//!
//! Static fallback data for provider keys that show up in deployment files
//! without a matching `config.providers` entry, and the providers seeded into
//! an empty store. Loaded from embedded JSON at compile time.

use indexmap::IndexMap;
use serde::Deserialize;
use std::sync::LazyLock;

use crate::types::{ProviderDraft, ProviderType};

/// Embedded JSON data
const KNOWN_PROVIDERS_JSON: &str = include_str!("known_providers.json");

/// Catalog entry for one provider key
#[derive(Debug, Clone)]
pub struct KnownProvider {
    pub key: String,
    pub name: String,
    pub endpoint: String,
    pub provider_type: ProviderType,
    /// Seeded into an empty store
    pub seed: bool,
}

impl KnownProvider {
    pub fn draft(&self) -> ProviderDraft {
        ProviderDraft::new(self.name.clone(), self.endpoint.clone(), self.provider_type)
    }
}

#[derive(Deserialize)]
struct RawCatalog {
    providers: IndexMap<String, RawProvider>,
}

#[derive(Deserialize)]
struct RawProvider {
    name: String,
    endpoint: String,
    #[serde(rename = "type")]
    provider_type: ProviderType,
    #[serde(default)]
    seed: bool,
}

static CATALOG: LazyLock<IndexMap<String, KnownProvider>> = LazyLock::new(|| {
    let raw: RawCatalog =
        serde_json::from_str(KNOWN_PROVIDERS_JSON).expect("failed to parse known_providers.json");

    raw.providers
        .into_iter()
        .map(|(key, raw)| {
            let provider = KnownProvider {
                key: key.clone(),
                name: raw.name,
                endpoint: raw.endpoint,
                provider_type: raw.provider_type,
                seed: raw.seed,
            };
            (key, provider)
        })
        .collect()
});

/// Get a provider by key
pub fn get(key: &str) -> Option<&'static KnownProvider> {
    CATALOG.get(key)
}

/// All catalog entries in declaration order
pub fn all() -> impl Iterator<Item = &'static KnownProvider> {
    CATALOG.values()
}

/// Display name for a key, capitalizing unknown keys
pub fn display_name(key: &str) -> String {
    match get(key) {
        Some(known) => known.name.clone(),
        None => {
            let mut chars = key.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

/// Default endpoint for a key, empty when unknown
pub fn default_endpoint(key: &str) -> &'static str {
    get(key).map(|p| p.endpoint.as_str()).unwrap_or("")
}

/// Provider type for a key, OpenAI-compatible when unknown
pub fn provider_type(key: &str) -> ProviderType {
    get(key).map(|p| p.provider_type).unwrap_or(ProviderType::OpenAI)
}

/// Providers an empty store starts with
pub fn default_providers() -> Vec<ProviderDraft> {
    all().filter(|p| p.seed).map(KnownProvider::draft).collect()
}

/// Display name derived from an upstream model id
///
/// Takes the last `/` segment, turns hyphens into spaces and upper-cases the
/// first letter of each word: `meta/llama-3-70b` becomes `Llama 3 70b`.
pub fn model_display_name(model_id: &str) -> String {
    let last = model_id.rsplit('/').next().unwrap_or(model_id);
    let spaced = last.replace('-', " ");

    let mut out = String::with_capacity(spaced.len());
    let mut at_word_start = true;
    for c in spaced.chars() {
        if at_word_start && c.is_alphanumeric() {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !(c.is_alphanumeric() || c == '_');
    }
    out
}
