//! optset - option parsing for shell scripts.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use optset::output::{generate_error_output, generate_help_output, persist_script};
use optset::{generate_help, generate_output_string, DeclaredRegistry, RegistryConfig};
use std::path::PathBuf;

/// Program name used in help when none is configured.
const DEFAULT_NAME: &str = "script";

/// POSIX/GNU-style option parsing for shell scripts.
#[derive(Parser, Debug)]
#[command(name = "optset", version, about, disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the option declarations come from.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Source {
    /// Short-option specification such as "ab:c::"
    #[arg(long)]
    spec: Option<String>,

    /// JSON declaration of the options
    #[arg(long)]
    config: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse script arguments and output environment variables
    Parse {
        #[command(flatten)]
        source: Source,

        /// Environment variable prefix (overrides config)
        #[arg(long, env = "OPTSET_PREFIX")]
        prefix: Option<String>,

        /// Arguments to parse for the target script
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Print help text for the target script
    Help {
        #[command(flatten)]
        source: Source,

        /// Program name shown in the usage line
        #[arg(long)]
        name: Option<String>,
    },
}

/// Read the declarations, treating a bare spec string as a minimal config.
fn load(source: &Source) -> Result<(RegistryConfig, DeclaredRegistry)> {
    let config = match source.config {
        Some(ref json) => RegistryConfig::from_json(json).context("failed to parse config JSON")?,
        None => RegistryConfig {
            spec: source.spec.clone(),
            ..RegistryConfig::default()
        },
    };
    let declared = config.to_registry().context("invalid option declarations")?;
    Ok((config, declared))
}

fn write_error(message: &str) -> Result<PathBuf> {
    generate_error_output(message).context("failed to generate error output file")
}

fn run_parse(source: &Source, prefix: Option<&str>, args: &[String]) -> Result<PathBuf> {
    let (config, declared) = load(source)?;
    let prefix = prefix.unwrap_or_else(|| config.effective_prefix());

    let set = match declared.registry.parse(args) {
        Ok(set) => set,
        Err(err) => return write_error(&err.to_string()),
    };
    if let Err(err) = declared.check_values(&set) {
        return write_error(&err.to_string());
    }

    if set.specs().iter().any(|d| d.is_for_help()) {
        let name = config.name.as_deref().unwrap_or(DEFAULT_NAME);
        return generate_help_output(&generate_help(&declared.registry, name))
            .context("failed to generate help output file");
    }
    match generate_output_string(&set, prefix) {
        Ok(script) => persist_script(&script).context("failed to generate output file"),
        Err(err) => write_error(&err.to_string()),
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse {
            source,
            prefix,
            args,
        } => {
            let path = run_parse(&source, prefix.as_deref(), &args)?;
            println!("{}", path.display());
        }
        Commands::Help { source, name } => {
            let (config, declared) = load(&source)?;
            let name = name.or(config.name).unwrap_or_else(|| DEFAULT_NAME.to_string());
            print!("{}", generate_help(&declared.registry, &name));
        }
    }

    Ok(())
}
