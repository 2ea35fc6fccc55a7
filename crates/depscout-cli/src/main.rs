mod output;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use depscout_agent::DependencyResolver;
use depscout_ai::{ModelClient, OpenAICompatibleConfig, OpenAICompatibleProvider};
use depscout_core::{ConfigManager, DepScoutConfig, LLMConfig, LoggingConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "depscout")]
#[command(about = "DepScout - extract per-file dependency metadata with a tool-using model", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./.depscout.toml or ~/.depscout/config.toml)
    #[arg(short, long, global = true, env = "DEPSCOUT_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract dependency records for a batch of files
    Resolve(ResolveArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args)]
struct ResolveArgs {
    /// Files to analyze, relative to the workspace root
    files: Vec<String>,

    /// Read additional file paths from this file, one per line
    #[arg(long)]
    files_from: Option<PathBuf>,

    /// Workspace root the file tools are confined to
    #[arg(long)]
    root: Option<PathBuf>,

    /// Maximum number of files analyzed at once
    #[arg(long)]
    concurrency: Option<usize>,

    /// Maximum model turns per file
    #[arg(long)]
    max_turns: Option<usize>,

    /// Model identifier
    #[arg(long)]
    model: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write the default configuration
    Init {
        /// Destination (defaults to ./.depscout.toml)
        #[arg(short, long, default_value = ".depscout.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Resolve(args) => {
            let mut manager = load_config(cli.config.as_deref(), cli.verbose)?;
            apply_overrides(manager.config_mut(), &args);
            ConfigManager::validate_config(manager.config()).context("Invalid configuration")?;
            init_tracing(&manager.config().logging, cli.verbose);
            if let Some(path) = manager.config_path() {
                info!(path = %path.display(), "Using configuration file");
            }
            execute_resolve(manager.config().clone(), args).await
        }
        Commands::Config(ConfigCommands::Init { path, force }) => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            ConfigManager::create_default_config(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("{} {}", "Wrote".green().bold(), path.display());
            Ok(())
        }
        Commands::Config(ConfigCommands::Show) => {
            let mut config = load_config(cli.config.as_deref(), cli.verbose)?
                .config()
                .clone();
            if config.llm.api_key.is_some() {
                config.llm.api_key = Some("***".to_string());
            }
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Load configuration under a provisional stderr subscriber; the configured
/// one can only be installed once the logging section is known
fn load_config(path: Option<&Path>, verbose: bool) -> Result<ConfigManager> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let provisional = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::with_default(provisional, || match path {
        Some(path) => ConfigManager::load_from(path),
        None => ConfigManager::load(),
    })
    .context("Failed to load configuration")
}

fn apply_overrides(config: &mut DepScoutConfig, args: &ResolveArgs) {
    if let Some(root) = &args.root {
        config.workspace.root = root.clone();
    }
    if let Some(concurrency) = args.concurrency {
        config.agent.concurrency_limit = concurrency;
    }
    if let Some(max_turns) = args.max_turns {
        config.agent.max_turns = max_turns;
    }
    if let Some(model) = &args.model {
        config.llm.model = model.clone();
    }
}

/// Initialize tracing on stderr so stdout carries only results
fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter);

    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn create_model(llm: &LLMConfig) -> Result<Arc<dyn ModelClient>> {
    let config = match llm.provider.as_str() {
        "openai" | "openai-compatible" => OpenAICompatibleConfig::from_llm_config(llm),
        "lmstudio" | "ollama" => {
            let defaults = if llm.provider == "lmstudio" {
                OpenAICompatibleConfig::lm_studio(llm.model.clone())
            } else {
                OpenAICompatibleConfig::ollama(llm.model.clone())
            };
            let mut config = OpenAICompatibleConfig::from_llm_config(llm);
            // Keep the local endpoint unless one was configured explicitly
            if llm.base_url == LLMConfig::default().base_url {
                config.base_url = defaults.base_url;
            }
            config
        }
        other => bail!(
            "Unsupported LLM provider '{}'. Available: openai, openai-compatible, lmstudio, ollama",
            other
        ),
    };

    Ok(Arc::new(OpenAICompatibleProvider::new(config)?))
}

async fn execute_resolve(config: DepScoutConfig, args: ResolveArgs) -> Result<()> {
    let files = collect_files(&args.files, args.files_from.as_deref())?;
    if files.is_empty() {
        bail!("No files to resolve; pass paths or --files-from");
    }

    let model = create_model(&config.llm)?;
    info!(
        provider = %model.provider_name(),
        model = %model.model_name(),
        root = %config.workspace.root.display(),
        "Model client ready"
    );

    let resolver = DependencyResolver::from_config(&config, model)?;
    let resolutions = resolver.resolve_detailed(&files).await;

    match args.output {
        OutputFormat::Json => println!("{}", output::render_json(&resolutions)?),
        OutputFormat::Pretty => print!("{}", output::render_pretty(&resolutions)),
    }
    Ok(())
}

/// Positional paths followed by the non-blank, non-comment lines of `files_from`
fn collect_files(positional: &[String], files_from: Option<&Path>) -> Result<Vec<String>> {
    let mut files = positional.to_vec();
    if let Some(list) = files_from {
        let content = std::fs::read_to_string(list)
            .with_context(|| format!("Failed to read file list {}", list.display()))?;
        files.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }
    Ok(files)
}
