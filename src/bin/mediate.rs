//! mediate CLI - validate component configuration and resolve parameters
//!
//! Loads component models and configuration documents from YAML, builds every
//! configured component according to its model's kind and, on request, resolves one
//! against a sample payload.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

use mediate::component::{Component, ComponentFactory};
use mediate::config::{load_config_file, ConfigDocument};
use mediate::model::ComponentModelLoader;
use mediate::parser::ParameterParser;
use mediate::types::TypeCatalog;
use mediate::{Event, Message, RuntimeServices, Value, ValueResolver};

#[derive(Parser)]
#[command(name = "mediate")]
#[command(version, about = "Parameter resolution for message mediation components", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate component models and the configuration that uses them
    Validate {
        /// Directory containing component model YAML files
        #[arg(short, long, default_value = "config/models")]
        models: PathBuf,

        /// Configuration document to check against the models
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Resolve the parameters of one configured component
    Resolve {
        /// Directory containing component model YAML files
        #[arg(short, long, default_value = "config/models")]
        models: PathBuf,

        /// Configuration document
        #[arg(short, long)]
        config: PathBuf,

        /// Global name of the element to resolve
        #[arg(short, long)]
        element: String,

        /// JSON payload of the event to resolve against
        #[arg(short, long)]
        payload: Option<String>,
    },
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { models, config } => validate(&models, config.as_deref()),
        Commands::Resolve {
            models,
            config,
            element,
            payload,
        } => resolve(&models, &config, &element, payload.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_models(models: &Path) -> Result<ComponentModelLoader, Box<dyn std::error::Error>> {
    let mut loader = ComponentModelLoader::new(TypeCatalog::new());
    let count = loader.load_dir(models)?;
    println!("  ✓ Loaded {} component models from {}", count, models.display());
    Ok(loader)
}

fn describe(component: &Component) -> String {
    match component {
        Component::Configuration(provider) if provider.is_dynamic() => "configuration, dynamic".to_string(),
        Component::Configuration(_) => "configuration, static".to_string(),
        Component::ConnectionProvider(resolver) if resolver.is_dynamic() => "connection provider, dynamic".to_string(),
        Component::ConnectionProvider(_) => "connection provider, static".to_string(),
        Component::Operation(set) if set.is_dynamic() => format!(
            "operation, {} parameters, dynamic: [{}]",
            set.len(),
            set.dynamic_parameters().join(", ")
        ),
        Component::Operation(set) => format!("operation, {} parameters, static", set.len()),
        Component::Source(source) => format!("source, {} parameters", source.parameters.len()),
    }
}

fn validate(models: &Path, config: Option<&Path>) -> CliResult {
    println!("🔍 Validating component models...");
    let loader = load_models(models)?;
    for model in loader.components() {
        println!("  • {} ({:?}, {} parameters)", model.name, model.kind, model.parameters.len());
    }

    let Some(config) = config else {
        println!("✨ Validation complete!");
        return Ok(());
    };

    let document: ConfigDocument = load_config_file(config)?;
    println!("  ✓ Loaded {} elements from {}", document.len(), config.display());

    let parser = ParameterParser::new(RuntimeServices::default());
    let factory = ComponentFactory::new(&loader, &parser);
    for element in document.elements() {
        if loader.component(element.identifier()).is_none() {
            println!("  ℹ No component model for '{}', skipping", element.qualified_identifier());
            continue;
        }
        let label = element.name().unwrap_or(element.identifier());
        let component = factory.create(element)?;
        println!("  ✓ {}: {}", label, describe(&component));
    }

    println!("✨ Validation complete!");
    Ok(())
}

fn resolve(models: &Path, config: &Path, name: &str, payload: Option<&str>) -> CliResult {
    let loader = load_models(models)?;
    let document = load_config_file(config)?;
    let element = document
        .global(name)
        .ok_or_else(|| format!("No element named '{}' in {}", name, config.display()))?;

    let services = RuntimeServices::default();
    let parser = ParameterParser::new(services.clone());
    let component = ComponentFactory::new(&loader, &parser).create(element)?;

    let payload = match payload {
        Some(json) => Value::from(serde_json::from_str::<serde_json::Value>(json)?),
        None => Value::Null,
    };
    let event = Event::new(Message::of(payload)).with_flow_name("cli");
    let ctx = services.context(&event);

    let resolved = match &component {
        Component::Configuration(provider) => {
            let instance = provider.get(&ctx)?;
            let mut json = instance.values().to_json();
            if let (Some(connection), serde_json::Value::Object(fields)) =
                (instance.connection_provider(), &mut json)
            {
                fields.insert("connection".to_string(), connection.to_json());
            }
            json
        }
        Component::ConnectionProvider(resolver) => resolver.resolve(&ctx)?.to_json(),
        Component::Operation(set) => set.resolve(&ctx)?.to_json(),
        Component::Source(source) => source.parameters.to_json(),
    };

    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}
