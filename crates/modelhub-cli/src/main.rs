//! modelhub CLI - provider/model configuration editor
//!
//! Edits the persisted provider and model records and syncs them with a
//! task-runner project's deployment files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use console::style;
use tracing::debug;

use modelhub_core::config::ConfigManager;
use modelhub_core::exchange::{EditorSnapshot, Exchange, ProjectDocuments};
use modelhub_core::store::{FileBlobStore, Store};
use modelhub_core::types::{Model, ModelDraft, Provider, ProviderDraft, ProviderType, Role};

#[derive(Parser)]
#[command(name = "modelhub")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Manage AI provider and model configuration for a task runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to <config dir>/modelhub/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Task-runner project directory (defaults to config setting, then ".")
    #[arg(short, long)]
    project: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage providers
    #[command(subcommand)]
    Providers(ProviderCommands),

    /// Manage models
    #[command(subcommand)]
    Models(ModelCommands),

    /// Write supported-models.json and config.json into the project
    Export,

    /// Replace the stored configuration with the project's deployment files
    Import,

    /// Save a full backup of the stored configuration
    Backup {
        /// Output file (defaults to a dated name in the current directory)
        path: Option<PathBuf>,
    },

    /// Restore a backup written by `backup`
    Restore {
        path: PathBuf,
    },

    /// Discard the stored configuration
    Reset {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },

    /// Show or change tool configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ProviderCommands {
    /// List providers
    List,

    /// Add a provider
    Add {
        name: String,
        /// Base URL without /v1
        #[arg(long)]
        endpoint: String,
        /// openai, anthropic, google or custom
        #[arg(long = "type", default_value = "openai")]
        provider_type: ProviderType,
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Change a provider's settings
    Update {
        /// Provider id or name
        provider: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long = "type")]
        provider_type: Option<ProviderType>,
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Remove a provider and its models
    Remove {
        /// Provider id or name
        provider: String,
    },

    /// Record a connectivity test result
    Mark {
        /// Provider id or name
        provider: String,
        #[arg(long, conflicts_with = "invalid")]
        valid: bool,
        #[arg(long)]
        invalid: bool,
    },
}

#[derive(Subcommand)]
enum ModelCommands {
    /// List models, optionally for one provider
    List {
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        role: Option<Role>,
    },

    /// Add a model to a provider
    Add {
        /// Provider id or name
        provider: String,
        /// Upstream model id
        model_id: String,
        /// Display name (defaults to the model id)
        #[arg(long)]
        name: Option<String>,
        /// Comma separated roles
        #[arg(long, value_delimiter = ',', default_value = "main,fallback")]
        roles: Vec<Role>,
        /// SWE-bench score in percent
        #[arg(long)]
        swe_score: Option<f64>,
        #[arg(long)]
        max_tokens: Option<u64>,
        /// Input cost per 1M tokens
        #[arg(long, default_value_t = 0.0)]
        input_cost: f64,
        /// Output cost per 1M tokens
        #[arg(long, default_value_t = 0.0)]
        output_cost: f64,
    },

    /// Change a model's metadata
    Update {
        /// Model record id
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_delimiter = ',')]
        roles: Option<Vec<Role>>,
        #[arg(long)]
        swe_score: Option<f64>,
        #[arg(long)]
        max_tokens: Option<u64>,
    },

    /// Remove a model
    Remove {
        /// Model record id
        id: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show configuration
    Show,

    /// Remember the task-runner project directory
    SetProject {
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone())?,
        None => ConfigManager::new()?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(config_manager.config().log_filter(cli.verbose))
        .init();

    if let Commands::Config(cmd) = cli.command {
        return handle_config_command(&mut config_manager, cmd);
    }

    let project = resolve_project(cli.project.as_deref().or(config_manager.project_dir()));
    debug!("Using project directory {:?}", project);
    let config = config_manager.config();
    let blob = Arc::new(FileBlobStore::new(config.storage_dir()));
    let store = Arc::new(
        Store::open(blob, config.store_options())
            .await
            .context("Failed to load stored configuration")?,
    );
    let exchange = Exchange::with_documents(store.clone(), Arc::new(ProjectDocuments::new(&project)));

    match cli.command {
        Commands::Providers(cmd) => handle_provider_command(&store, cmd).await?,
        Commands::Models(cmd) => handle_model_command(&store, cmd).await?,
        Commands::Export => {
            let deployment = exchange.export_to_deployment_files().await?;
            println!(
                "{} Exported {} providers to {}",
                style("✓").green(),
                deployment.config.providers.len(),
                style(project.display()).cyan()
            );
        }
        Commands::Import => {
            let editor = exchange.import_from_deployment_files().await?;
            println!(
                "{} Imported {} providers and {} models from {}",
                style("✓").green(),
                editor.providers.len(),
                editor.models.len(),
                style(project.display()).cyan()
            );
        }
        Commands::Backup { path } => {
            let snapshot = exchange.export_backup().await;
            let path = path.unwrap_or_else(|| PathBuf::from(snapshot.file_name()));
            std::fs::write(&path, snapshot.to_json_pretty()?)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} Backup written to {}", style("✓").green(), style(path.display()).cyan());
        }
        Commands::Restore { path } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            exchange.import_backup(EditorSnapshot::from_json(&raw)?).await?;
            println!("{} Restored {}", style("✓").green(), style(path.display()).cyan());
        }
        Commands::Reset { yes } => {
            if !yes {
                bail!("Refusing to reset without --yes");
            }
            store.reset().await?;
            println!("{} Configuration reset", style("✓").green());
        }
        Commands::Config(_) => unreachable!("handled above"),
    }

    Ok(())
}

/// Canonicalize the project path, falling back to an absolute path
fn resolve_project(dir: Option<&Path>) -> PathBuf {
    let dir = dir.unwrap_or(Path::new("."));
    dunce::canonicalize(dir).unwrap_or_else(|_| {
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(dir))
                .unwrap_or_else(|_| dir.to_path_buf())
        }
    })
}

/// Find a provider by id, then by case-insensitive name
async fn find_provider(store: &Store, ident: &str) -> anyhow::Result<Provider> {
    if let Some(provider) = store.provider(ident).await {
        return Ok(provider);
    }
    store
        .providers()
        .await
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(ident))
        .with_context(|| format!("No provider with id or name '{}'", ident))
}

async fn handle_provider_command(store: &Store, cmd: ProviderCommands) -> anyhow::Result<()> {
    match cmd {
        ProviderCommands::List => {
            println!("{}", style("Providers:").bold());
            println!();

            let providers = store.providers().await;
            if providers.is_empty() {
                println!("  {}", style("No providers configured").dim());
                return Ok(());
            }
            for provider in providers {
                let status = if provider.is_valid {
                    style("valid").green()
                } else {
                    style("untested").yellow()
                };
                let models = store.models_for_provider(&provider.id).await.len();
                println!(
                    "  {} {} ({}) [{}]",
                    style("•").cyan(),
                    style(&provider.name).bold(),
                    provider.provider_type,
                    status
                );
                println!("    {}", style(&provider.endpoint).dim());
                println!("    id: {}  key: {}  models: {}", provider.id, provider.key(), models);
            }
        }
        ProviderCommands::Add {
            name,
            endpoint,
            provider_type,
            api_key,
        } => {
            let mut draft = ProviderDraft::new(name, endpoint, provider_type);
            if let Some(key) = api_key {
                draft = draft.with_api_key(key);
            }
            let provider = store.add_provider(draft).await?;
            println!(
                "{} Added provider {} ({})",
                style("✓").green(),
                style(&provider.name).bold(),
                provider.id
            );
        }
        ProviderCommands::Update {
            provider,
            name,
            endpoint,
            provider_type,
            api_key,
        } => {
            let mut provider = find_provider(store, &provider).await?;
            if let Some(name) = name {
                provider.name = name;
            }
            if let Some(endpoint) = endpoint {
                provider.endpoint = endpoint;
            }
            if let Some(provider_type) = provider_type {
                provider.provider_type = provider_type;
            }
            if let Some(api_key) = api_key {
                provider.api_key = api_key;
            }
            let provider = store.update_provider(provider).await?;
            println!("{} Updated provider {}", style("✓").green(), style(&provider.name).bold());
        }
        ProviderCommands::Remove { provider } => {
            let provider = find_provider(store, &provider).await?;
            let removed = store.delete_provider(&provider.id).await?;
            println!(
                "{} Removed provider {} and {} models",
                style("✓").green(),
                style(&provider.name).bold(),
                removed.len()
            );
        }
        ProviderCommands::Mark {
            provider,
            valid,
            invalid,
        } => {
            if valid == invalid {
                bail!("Pass either --valid or --invalid");
            }
            let provider = find_provider(store, &provider).await?;
            let provider = store.set_provider_validity(&provider.id, valid).await?;
            println!(
                "{} {} marked {}",
                style("✓").green(),
                style(&provider.name).bold(),
                if provider.is_valid { "valid" } else { "invalid" }
            );
        }
    }
    Ok(())
}

fn print_model(model: &Model, provider_name: &str) {
    let roles: Vec<&str> = model.allowed_roles.iter().map(Role::as_str).collect();
    println!(
        "  {} {} {} ({})",
        style("•").cyan(),
        style(&model.name).bold(),
        style(format!("[{}]", model.model_id)).dim(),
        provider_name
    );
    println!(
        "    id: {}  roles: {}  swe: {}  max tokens: {}  cost: {}/{}",
        model.id,
        if roles.is_empty() { "-".to_string() } else { roles.join(",") },
        model
            .swe_score
            .map(|s| format!("{}%", s))
            .unwrap_or_else(|| "-".to_string()),
        model
            .max_tokens
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string()),
        model.cost_per_1m_tokens.input,
        model.cost_per_1m_tokens.output
    );
}

async fn handle_model_command(store: &Store, cmd: ModelCommands) -> anyhow::Result<()> {
    match cmd {
        ModelCommands::List { provider, role } => {
            let mut models = match &provider {
                Some(ident) => {
                    let provider = find_provider(store, ident).await?;
                    store.models_for_provider(&provider.id).await
                }
                None => store.models().await,
            };
            if let Some(role) = role {
                models.retain(|m| m.has_role(role));
            }

            println!("{}", style("Models:").bold());
            println!();
            if models.is_empty() {
                println!("  {}", style("No models configured").dim());
                return Ok(());
            }

            let providers = store.providers().await;
            for model in &models {
                let provider_name = providers
                    .iter()
                    .find(|p| p.id == model.provider_id)
                    .map(|p| p.name.as_str())
                    .unwrap_or("?");
                print_model(model, provider_name);
            }
        }
        ModelCommands::Add {
            provider,
            model_id,
            name,
            roles,
            swe_score,
            max_tokens,
            input_cost,
            output_cost,
        } => {
            let provider = find_provider(store, &provider).await?;
            let name = name.unwrap_or_else(|| model_id.clone());
            let mut draft = ModelDraft::new(name, &provider.id, model_id)
                .with_roles(roles)
                .with_cost(input_cost, output_cost);
            if let Some(score) = swe_score {
                draft = draft.with_swe_score(score);
            }
            if let Some(max_tokens) = max_tokens {
                draft = draft.with_max_tokens(max_tokens);
            }
            let model = store.add_model(draft).await?;
            println!(
                "{} Added model {} to {} ({})",
                style("✓").green(),
                style(&model.model_id).bold(),
                provider.name,
                model.id
            );
        }
        ModelCommands::Update {
            id,
            name,
            roles,
            swe_score,
            max_tokens,
        } => {
            let Some(mut model) = store.model(&id).await else {
                bail!("No model with id '{}'", id);
            };
            if let Some(name) = name {
                model.name = name;
            }
            if let Some(roles) = roles {
                model.allowed_roles = roles;
            }
            if swe_score.is_some() {
                model.swe_score = swe_score;
            }
            if max_tokens.is_some() {
                model.max_tokens = max_tokens;
            }
            let model = store.update_model(model).await?;
            println!("{} Updated model {}", style("✓").green(), style(&model.model_id).bold());
        }
        ModelCommands::Remove { id } => {
            let model = store.delete_model(&id).await?;
            println!("{} Removed model {}", style("✓").green(), style(&model.model_id).bold());
        }
    }
    Ok(())
}

fn handle_config_command(config_manager: &mut ConfigManager, cmd: ConfigCommands) -> anyhow::Result<()> {
    match cmd {
        ConfigCommands::Show => {
            let config = config_manager.config();
            println!("{}", style("Configuration:").bold());
            println!();
            println!(
                "  Config file: {}",
                style(config_manager.config_path().display()).dim()
            );
            println!("  Storage dir: {}", style(config.storage_dir().display()).green());
            println!("  Storage key: {}", config.storage.key);
            println!("  Seed defaults: {}", config.storage.seed_defaults);
            println!(
                "  Project: {}",
                config
                    .project
                    .dir
                    .as_ref()
                    .map(|d| style(d.display().to_string()).green())
                    .unwrap_or_else(|| style("(current directory)".to_string()).dim())
            );
        }
        ConfigCommands::SetProject { dir } => {
            let dir = resolve_project(Some(&dir));
            config_manager.set_project_dir(Some(dir.clone()));
            config_manager.save()?;
            println!("{} Project set to {}", style("✓").green(), style(dir.display()).cyan());
        }
    }
    Ok(())
}
