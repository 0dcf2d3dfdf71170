//! modplace - deploy package files into an application tree
//!
//! Usage:
//!   modplace install <package>       # Deploy a package declared in modplace.toml
//!   modplace update <package>        # Clean the previous placement, then redeploy
//!   modplace uninstall <package>     # Remove what the package placed
//!   modplace mappings <package>      # Show the resolved mapping list

mod host;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modplace_core::config::parse_toml_file;
use modplace_core::prelude::*;

use crate::host::{LocalHost, ProjectFile};

#[derive(Parser)]
#[command(name = "modplace")]
#[command(about = "Deploy package files into an application root", long_about = None)]
struct Cli {
    /// Project file declaring the installer settings and packages
    #[arg(long, short, global = true, default_value = "modplace.toml")]
    config: PathBuf,

    /// Override the deploy strategy (symlink, link, copy)
    #[arg(long, global = true)]
    strategy: Option<String>,

    /// Overwrite existing targets
    #[arg(long, global = true)]
    force: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a package into the application root
    Install {
        /// Package name as declared in a [[package]] table
        name: String,
    },

    /// Clean a package's previous placement and deploy it again
    ///
    /// With --from, the previous placement is computed from an older copy of
    /// the package instead of the currently declared source.
    Update {
        name: String,
        /// Directory holding the previously deployed version
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// Remove everything the package placed
    #[command(alias = "rm")]
    Uninstall { name: String },

    /// Print the mappings a package resolves to
    Mappings { name: String },
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modplace=info,modplace_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let config_path = absolute(&cli.config)?;
    let base_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .context("config path has no parent directory")?;

    let project: ProjectFile = parse_toml_file(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    let mut settings = project.settings.clone();
    if let Some(strategy) = cli.strategy {
        settings.deploy_strategy = Some(strategy);
    }
    if cli.force {
        settings.force = true;
    }
    let config = settings
        .resolve(&base_dir)
        .context("Invalid installer settings")?;

    let host = LocalHost::new(&base_dir, &project.packages)
        .with_modman_root_dir(config.modman_root_dir.clone());
    let mut installer = Installer::new(config, host)?;

    match cli.command {
        Commands::Install { name } => {
            let package = installer.host().package(&name)?;
            let report = installer.install(&package)?;
            print_lifecycle("Installed", &report, cli.format)
        }
        Commands::Update { name, from } => {
            let target = installer.host().package(&name)?;
            let initial = match from {
                Some(dir) => {
                    let dir = absolute(&dir)?;
                    installer.host_mut().register_previous(&target, dir)
                }
                None => target.clone(),
            };
            let report = installer.update(&initial, &target)?;
            print_lifecycle("Updated", &report, cli.format)
        }
        Commands::Uninstall { name } => {
            let package = installer.host().package(&name)?;
            let report = installer.uninstall(&package)?;
            print_lifecycle("Uninstalled", &report, cli.format)
        }
        Commands::Mappings { name } => {
            let package = installer.host().package(&name)?;
            let mappings = installer.resolve_mappings(&package)?;
            print_mappings(&package, &mappings, cli.format)
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;
    Ok(cwd.join(path))
}

fn print_lifecycle(verb: &str, report: &LifecycleReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if report.skipped() {
                println!("• {} '{}' (deployment skipped)", verb, report.package);
                return Ok(());
            }
            println!("✓ {} '{}'", verb, report.package);
            if let Some(cleaned) = &report.cleaned {
                println!("  Removed {} entr(ies)", cleaned.removed.len());
                for warning in &cleaned.warnings {
                    println!("  ⚠ {}", warning);
                }
            }
            if let Some(deployed) = &report.deployed {
                for mapping in &deployed.placed {
                    println!("  {} -> {}", display_source(mapping), mapping.target());
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report)?);
        }
    }
    Ok(())
}

fn print_mappings(package: &Package, mappings: &[PathMapping], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if mappings.is_empty() {
                bail!("package '{}' resolves to no mappings", package.name);
            }
            let width = mappings
                .iter()
                .map(|m| display_source(m).len())
                .max()
                .unwrap_or(0)
                .max("Source".len());
            println!("{:<width$}  Target", "Source", width = width);
            println!("{}", "-".repeat(width + 40));
            for mapping in mappings {
                println!(
                    "{:<width$}  {}",
                    display_source(mapping),
                    mapping.target(),
                    width = width
                );
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "package": package.name,
                "mappings": mappings,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn display_source(mapping: &PathMapping) -> &str {
    if mapping.is_whole_root() {
        "."
    } else {
        mapping.source()
    }
}
