use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::collections::BTreeSet;
use std::path::PathBuf;

use modelguard::document::ModelSet;
use modelguard::loader::{ModelLoader, ParseError};
use modelguard::protocol::ProtocolRegistry;
use modelguard::validation::{ErrorMode, ValidationError, Validator, direct_references};

#[derive(Parser)]
#[command(
    name = "modelguard",
    about = "Validates declarative data model definitions before they drive code generation, storage or UI",
    version,
    author,
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Protocol registry overrides (YAML or JSON)
    #[arg(short, long, global = true, env = "MODELGUARD_PROTOCOL")]
    protocol: Option<PathBuf>,

    /// Enable verbose output (use -vv for debug output)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate model files or directories as one model set
    Validate {
        /// Model files (.json, .yaml, .yml) or directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Report every failing model instead of stopping at the first
        #[arg(long, env = "MODELGUARD_COLLECT")]
        collect: bool,
    },

    /// List the models that the given models reference
    Refs {
        /// Model files (.json, .yaml, .yml) or directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Model id to start from (repeatable)
        #[arg(short, long = "model", required = true)]
        models: Vec<String>,

        /// Only list direct references
        #[arg(long)]
        direct: bool,
    },

    /// Print the default protocol registry as YAML
    Protocol,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    init_logging(cli.verbose);

    let registry = match &cli.protocol {
        Some(path) => ProtocolRegistry::from_path(path)?,
        None => ProtocolRegistry::default(),
    };

    match cli.command {
        Commands::Validate { paths, collect } => validate_command(&paths, registry, collect),
        Commands::Refs {
            paths,
            models,
            direct,
        } => refs_command(&paths, registry, &models, direct),
        Commands::Protocol => protocol_command(&registry),
    }
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbose {
        0 => EnvFilter::new("modelguard=warn"), // Default: warnings and errors only
        1 => EnvFilter::new("modelguard=info"), // -v: info messages
        _ => EnvFilter::new("modelguard=debug"), // -vv or more: full debug
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Load models, rendering parse failures with their source location
fn load_models(paths: &[PathBuf]) -> Result<serde_json::Value> {
    match ModelLoader::load(paths) {
        Ok(models) => Ok(models),
        Err(err) => match err.downcast::<ParseError>() {
            Ok(parse_error) => {
                eprintln!("{:?}", miette::Report::new(parse_error));
                bail!("Failed to load models");
            }
            Err(err) => Err(err),
        },
    }
}

fn render(err: ValidationError) {
    eprintln!();
    eprintln!("{:?}", miette::Report::new(err));
}

fn validate_command(paths: &[PathBuf], registry: ProtocolRegistry, collect: bool) -> Result<()> {
    println!("Validating models from: {}", display_paths(paths));

    let models = load_models(paths)?;
    let count = models.as_array().map_or(0, Vec::len);

    let mode = if collect {
        ErrorMode::Collect
    } else {
        ErrorMode::FailFast
    };
    let validator = Validator::with_registry(registry).with_mode(mode);

    let report = match validator.validate(&models) {
        Ok(report) => report,
        Err(err) => {
            render(err);
            bail!("Validation failed");
        }
    };

    for warning in &report.warnings {
        println!("{} {warning}", "warning:".yellow().bold());
    }

    if !report.is_clean() {
        let failed = report.errors.len();
        for err in report.errors {
            render(err);
        }
        bail!("{failed} of {count} models failed validation");
    }

    println!("\n{} All {count} models passed validation!", "✅".green());
    Ok(())
}

fn refs_command(
    paths: &[PathBuf],
    registry: ProtocolRegistry,
    seeds: &[String],
    direct: bool,
) -> Result<()> {
    let models = load_models(paths)?;
    let validator = Validator::with_registry(registry);

    let references = if direct {
        direct_closure(&models, seeds)
    } else {
        validator.get_references(&models, seeds)
    };

    match references {
        Ok(references) => {
            for id in references {
                println!("{id}");
            }
            Ok(())
        }
        Err(err) => {
            render(err);
            bail!("Failed to resolve references");
        }
    }
}

fn direct_closure(
    models: &serde_json::Value,
    seeds: &[String],
) -> Result<BTreeSet<String>, ValidationError> {
    let set = ModelSet::from_value(models)?;
    let mut references = BTreeSet::new();

    for seed in seeds {
        let model = set
            .get(seed)
            .ok_or_else(|| ValidationError::reference(format!("missing model \"{seed}\"")))?;
        references.extend(direct_references(model).into_iter().map(str::to_owned));
    }

    Ok(references)
}

fn protocol_command(registry: &ProtocolRegistry) -> Result<()> {
    print!("{}", serde_yaml::to_string(registry)?);
    Ok(())
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
