//! Transform integration tests
//!
//! Tests for the editor <-> deployment conversion including:
//! - Exact deployment output for a known input
//! - First-match role assignment
//! - Providers without models
//! - Deployment -> editor synthesis and its asymmetries

use modelhub_core::deployment::{DeploymentConfig, ModelEntry, ProviderEntry, RoleTarget};
use modelhub_core::transform::{to_deployment_format, to_editor_format};
use modelhub_core::types::{Model, ModelCost, Provider, ProviderType, Role};
use modelhub_core::Error;
use serde_json::json;

fn acme() -> Provider {
    Provider {
        id: "p1".into(),
        name: "Acme".into(),
        endpoint: "https://x".into(),
        api_key: "k".into(),
        provider_type: ProviderType::OpenAI,
        is_valid: true,
    }
}

fn gpt_x() -> Model {
    Model {
        id: "m1".into(),
        name: "GPT X".into(),
        provider_id: "p1".into(),
        model_id: "gpt-x".into(),
        swe_score: Some(50.0),
        max_tokens: Some(1000),
        cost_per_1m_tokens: ModelCost::new(1.0, 2.0),
        allowed_roles: vec![Role::Main],
    }
}

fn model(id: &str, model_id: &str, score: f64, roles: &[Role]) -> Model {
    Model {
        id: id.into(),
        name: model_id.into(),
        provider_id: "p1".into(),
        model_id: model_id.into(),
        swe_score: Some(score),
        max_tokens: None,
        cost_per_1m_tokens: ModelCost::default(),
        allowed_roles: roles.to_vec(),
    }
}

mod to_deployment_tests {
    use super::*;

    #[test]
    fn test_known_example() {
        let deployment = to_deployment_format(&[acme()], &[gpt_x()]).unwrap();

        assert_eq!(
            serde_json::to_value(&deployment.supported_models).unwrap(),
            json!({
                "acme": [{
                    "id": "gpt-x",
                    "swe_score": 0.5,
                    "cost_per_1m_tokens": {"input": 1.0, "output": 2.0},
                    "allowed_roles": ["main"],
                    "max_tokens": 1000
                }]
            })
        );
        assert_eq!(
            deployment.config.models.main,
            Some(RoleTarget {
                provider: "acme".into(),
                model: "gpt-x".into()
            })
        );
        assert_eq!(deployment.config.models.fallback, None);
        assert_eq!(deployment.config.models.research, None);

        let entry = &deployment.config.providers["acme"];
        assert_eq!(entry.name, "Acme");
        assert_eq!(entry.endpoint, "https://x");
        assert_eq!(entry.provider_type, "openai");
        assert_eq!(entry.api_key, "k");
    }

    #[test]
    fn test_config_document_wire_format() {
        let deployment = to_deployment_format(&[acme()], &[gpt_x()]).unwrap();
        assert_eq!(
            serde_json::to_value(&deployment.config).unwrap(),
            json!({
                "models": {"main": {"provider": "acme", "model": "gpt-x"}},
                "providers": {
                    "acme": {
                        "name": "Acme",
                        "endpoint": "https://x",
                        "type": "openai",
                        "apiKey": "k"
                    }
                }
            })
        );
    }

    #[test]
    fn test_first_match_wins_over_higher_score() {
        let models = vec![
            model("m1", "weak", 10.0, &[Role::Main]),
            model("m2", "strong", 90.0, &[Role::Main, Role::Research]),
        ];
        let deployment = to_deployment_format(&[acme()], &models).unwrap();

        assert_eq!(deployment.config.models.main.unwrap().model, "weak");
        assert_eq!(deployment.config.models.research.unwrap().model, "strong");
    }

    #[test]
    fn test_provider_without_models() {
        let mut other = acme();
        other.id = "p2".into();
        other.name = "Other Co".into();

        let deployment = to_deployment_format(&[acme(), other], &[gpt_x()]).unwrap();
        assert!(!deployment.supported_models.contains_key("otherco"));
        assert!(deployment.config.providers.contains_key("otherco"));
        let keys: Vec<_> = deployment.config.providers.keys().cloned().collect();
        assert_eq!(keys, vec!["acme", "otherco"]);
    }

    #[test]
    fn test_models_grouped_in_provider_order() {
        let mut other = acme();
        other.id = "p2".into();
        other.name = "Beta".into();
        let mut beta_model = gpt_x();
        beta_model.id = "m2".into();
        beta_model.provider_id = "p2".into();

        let deployment =
            to_deployment_format(&[other, acme()], &[gpt_x(), beta_model]).unwrap();
        let keys: Vec<_> = deployment.supported_models.keys().cloned().collect();
        assert_eq!(keys, vec!["beta", "acme"]);
    }

    #[test]
    fn test_zero_score_exported_as_zero() {
        let deployment =
            to_deployment_format(&[acme()], &[model("m1", "x", 0.0, &[])]).unwrap();
        assert_eq!(deployment.supported_models["acme"][0].swe_score, Some(0.0));
        assert_eq!(deployment.config.models.main, None);
    }

    #[test]
    fn test_empty_input() {
        let deployment = to_deployment_format(&[], &[]).unwrap();
        assert_eq!(deployment, DeploymentConfig::default());
    }

    #[test]
    fn test_key_collision() {
        let mut twin = acme();
        twin.id = "p2".into();
        twin.name = "A.C.M.E".into();
        assert!(matches!(
            to_deployment_format(&[acme(), twin], &[]),
            Err(Error::KeyCollision { .. })
        ));
    }
}

mod to_editor_tests {
    use super::*;

    fn entry(id: &str) -> ModelEntry {
        ModelEntry {
            id: id.into(),
            swe_score: Some(0.29),
            cost_per_1m_tokens: ModelCost::new(3.0, 15.0),
            allowed_roles: None,
            max_tokens: None,
        }
    }

    #[test]
    fn test_catalog_fallbacks() {
        let mut deployment = DeploymentConfig::default();
        deployment
            .supported_models
            .insert("anthropic".into(), vec![entry("claude-sonnet-4")]);

        let editor = to_editor_format(&deployment).unwrap();
        let provider = &editor.providers[0];
        assert_eq!(provider.name, "Anthropic");
        assert_eq!(provider.endpoint, "https://api.anthropic.com");
        assert_eq!(provider.provider_type, ProviderType::Anthropic);
        assert!(!provider.is_valid);

        let model = &editor.models[0];
        assert_eq!(model.provider_id, provider.id);
        assert_eq!(model.swe_score, Some(29.0));
        assert_eq!(model.max_tokens, Some(200_000));
        assert_eq!(model.allowed_roles, vec![Role::Main, Role::Fallback]);
    }

    #[test]
    fn test_config_entry_preferred_over_catalog() {
        let mut deployment = DeploymentConfig::default();
        deployment.supported_models.insert("polo".into(), vec![entry("polo-1")]);
        deployment.config.providers.insert(
            "polo".into(),
            ProviderEntry {
                name: "Polo Staging".into(),
                endpoint: "https://staging.polo.ai".into(),
                provider_type: "anthropic".into(),
                api_key: "secret".into(),
            },
        );

        let editor = to_editor_format(&deployment).unwrap();
        let provider = &editor.providers[0];
        assert_eq!(provider.name, "Polo Staging");
        assert_eq!(provider.endpoint, "https://staging.polo.ai");
        assert_eq!(provider.provider_type, ProviderType::Anthropic);
        assert_eq!(provider.api_key, "secret");
        assert!(provider.is_valid);
    }

    #[test]
    fn test_unknown_key_without_entry() {
        let mut deployment = DeploymentConfig::default();
        deployment.supported_models.insert("mistral".into(), vec![entry("m")]);

        // No catalog endpoint to fall back on
        match to_editor_format(&deployment).unwrap_err() {
            Error::TransformInvalid { errors } => {
                assert_eq!(errors, vec!["Provider 1 (Mistral): Endpoint is required"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        deployment.config.providers.insert(
            "mistral".into(),
            ProviderEntry {
                endpoint: "https://api.mistral.ai".into(),
                ..Default::default()
            },
        );
        let editor = to_editor_format(&deployment).unwrap();
        assert_eq!(editor.providers[0].name, "Mistral");
        assert_eq!(editor.providers[0].provider_type, ProviderType::OpenAI);
    }

    #[test]
    fn test_invalid_synthesized_record() {
        let mut deployment = DeploymentConfig::default();
        let mut bad = entry("x");
        bad.swe_score = Some(2.0);
        deployment.supported_models.insert("openai".into(), vec![bad]);

        assert!(matches!(
            to_editor_format(&deployment),
            Err(Error::TransformInvalid { .. })
        ));
    }

    #[test]
    fn test_round_trip_asymmetry() {
        let mut idle = acme();
        idle.id = "p2".into();
        idle.name = "Idle".into();
        let providers = vec![acme(), idle];
        let models = vec![gpt_x()];

        let deployment = to_deployment_format(&providers, &models).unwrap();
        let editor = to_editor_format(&deployment).unwrap();

        // Providers without models do not come back
        assert_eq!(editor.providers.len(), 1);
        let provider = &editor.providers[0];
        assert_ne!(provider.id, "p1");
        assert_eq!(provider.name, "Acme");
        assert_eq!(provider.endpoint, "https://x");
        assert_eq!(provider.provider_type, ProviderType::OpenAI);
        assert_eq!(provider.api_key, "k");

        let model = &editor.models[0];
        assert_ne!(model.id, "m1");
        assert_eq!(model.provider_id, provider.id);
        assert_eq!(model.model_id, "gpt-x");
        assert_eq!(model.allowed_roles, vec![Role::Main]);
        assert_eq!(model.max_tokens, Some(1000));
        assert_eq!(model.cost_per_1m_tokens, ModelCost::new(1.0, 2.0));
        assert_eq!(model.swe_score, Some(50.0));
    }
}
