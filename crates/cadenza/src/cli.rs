use std::path::PathBuf;
use std::sync::Arc;

use cadenza_core::kernel::{Error, Result};
use cadenza_core::storage::ConfigMap;
use cadenza_core::{Application, ManifestRegistry, ProviderConfig, RuntimeHooks, StaticEntryResolver, StoreSettings};
use clap::{Parser, Subcommand};
use serde_json::Value;

/// Cadenza: inspect and edit the settings of a Cadenza server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Directory holding settings.json (defaults to the current directory)
    #[arg(long, global = true)]
    pub storage_dir: Option<PathBuf>,

    /// Store settings file (JSON, YAML or TOML)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// JSON file with the provider manifests
    #[arg(long, global = true)]
    pub manifests: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the value stored at a path
    Get { path: String },
    /// Store a value (JSON, or a plain string) at a path
    Set { path: String, value: String },
    /// Remove the value stored at a path
    Remove { path: String },
    /// Manage provider configs
    Provider {
        #[command(subcommand)]
        command: ProviderCommand,
    },
    /// Encrypt a secret with this server's key
    Encrypt { text: String },
    /// Decrypt a value encrypted with this server's key
    Decrypt { text: String },
}

#[derive(Subcommand, Debug)]
pub enum ProviderCommand {
    /// List configured provider instances
    List {},
    /// Add an instance of a provider domain
    Add {
        domain: String,
        /// Config value as key=value; repeatable
        #[arg(long = "set", value_parser = parse_assignment)]
        values: Vec<(String, Value)>,
    },
    /// Update a provider instance
    Update {
        instance_id: String,
        #[arg(long = "set", value_parser = parse_assignment)]
        values: Vec<(String, Value)>,
    },
    /// Remove a provider instance
    Remove { instance_id: String },
}

/// Parse `key=value`; the value is read as JSON and falls back to a string.
fn parse_assignment(input: &str) -> std::result::Result<(String, Value), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", input))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", input));
    }
    Ok((key.to_string(), parse_value(value)))
}

fn parse_value(input: &str) -> Value {
    serde_json::from_str(input).unwrap_or_else(|_| Value::String(input.to_string()))
}

fn to_pretty(value: &Value) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::Other(e.to_string()))
}

fn store_settings(args: &CliArgs) -> Result<StoreSettings> {
    let mut settings = match &args.settings {
        Some(path) => StoreSettings::from_file(path)?,
        None => StoreSettings::default(),
    };
    if let Some(storage_dir) = &args.storage_dir {
        settings.storage_dir = storage_dir.clone();
    }
    Ok(settings)
}

fn manifests(args: &CliArgs) -> Result<ManifestRegistry> {
    match &args.manifests {
        Some(path) => Ok(ManifestRegistry::from_file(path)?),
        None => Ok(ManifestRegistry::new()),
    }
}

/// Bring up the core, run the command and shut down again, which flushes
/// every change to disk.
pub async fn run(args: CliArgs) -> Result<()> {
    let settings = store_settings(&args)?;
    let manifests = manifests(&args)?;
    let resolver = Arc::new(StaticEntryResolver::new(Arc::new(manifests.clone())));
    let mut app = Application::bootstrap(&settings, manifests, resolver, RuntimeHooks::offline()).await?;
    app.start().await?;

    let result = execute(&app, args.command).await;
    let shutdown = app.shutdown().await;
    result.and(shutdown)
}

async fn execute(app: &Application, command: Commands) -> Result<()> {
    tracing::debug!(?command, "Running command");
    let store = app.store();
    let controller = app.controller();
    match command {
        Commands::Get { path } => {
            let value = store
                .get_opt(&path)
                .ok_or_else(|| Error::Other(format!("Nothing stored at '{}'", path)))?;
            println!("{}", to_pretty(&value)?);
        }
        Commands::Set { path, value } => {
            store.set(&path, parse_value(&value));
        }
        Commands::Remove { path } => {
            store
                .remove(&path)
                .ok_or_else(|| Error::Other(format!("Nothing stored at '{}'", path)))?;
        }
        Commands::Provider { command } => execute_provider(app, command).await?,
        Commands::Encrypt { text } => println!("{}", controller.cipher().encrypt(&text)?),
        Commands::Decrypt { text } => println!("{}", controller.cipher().decrypt(&text)?),
    }
    Ok(())
}

async fn execute_provider(app: &Application, command: ProviderCommand) -> Result<()> {
    let controller = app.controller();
    match command {
        ProviderCommand::List {} => {
            let configs = controller.get_provider_configs(None, None, false).await?;
            if configs.is_empty() {
                println!("No providers configured.");
            }
            for config in configs {
                let status = if config.enabled { "enabled" } else { "disabled" };
                println!(
                    "{}\t{}\t{}\t{}",
                    config.instance_id,
                    config.provider_type,
                    status,
                    config.display_name()
                );
            }
        }
        ProviderCommand::Add { domain, values } => {
            let config = controller
                .save_provider_config(&domain, values.into_iter().collect::<ConfigMap>(), None)
                .await?;
            print_provider(&config)?;
        }
        ProviderCommand::Update { instance_id, values } => {
            let current = controller.get_provider_config(&instance_id).await?;
            let config = controller
                .save_provider_config(
                    &current.domain,
                    values.into_iter().collect::<ConfigMap>(),
                    Some(&instance_id),
                )
                .await?;
            print_provider(&config)?;
        }
        ProviderCommand::Remove { instance_id } => {
            controller.remove_provider_config(&instance_id).await?;
            println!("Removed {}", instance_id);
        }
    }
    Ok(())
}

fn print_provider(config: &ProviderConfig) -> Result<()> {
    println!("{}", to_pretty(&config.to_display())?);
    Ok(())
}
