//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, warn};

use crate::build::{BuildContext, BuildMode};
use crate::config::loader::{
    default_config, find_config, load_config, merge_cli_overrides, CliOverrides,
};

/// Exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;

/// Sitepipe - build static site assets and serve them with live reload
#[derive(Parser, Debug)]
#[command(name = "sitepipe")]
#[command(about = "Sitepipe - compile styles, scripts and markup into a deployable site")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Production build: BASEURL from the environment, cache-busting version token
    #[arg(long, global = true)]
    pub production: bool,

    /// Override source directory
    #[arg(long, global = true)]
    pub src: Option<PathBuf>,

    /// Override output directory
    #[arg(short, long, global = true)]
    pub out: Option<PathBuf>,

    /// Override dev server port
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Use this config file instead of searching for sitepipe.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Clean the output directory and run every build step once
    Build,
    /// Build, then serve the output with live reload and rebuild on change
    Dev,
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    crate::logging::init_logging(cli.verbose);

    let context = match load_context(&cli) {
        Ok(context) => context,
        Err(code) => return code,
    };

    match cli.command.unwrap_or(Commands::Dev) {
        Commands::Build => build::run_build(context),
        Commands::Dev => build::run_dev(context),
    }
}

/// Locate the project, load config and `.env`, and build the context.
fn load_context(cli: &Cli) -> Result<BuildContext, ExitCode> {
    let config_path = cli.config.clone().or_else(find_config);

    let project_root = project_root(config_path.as_deref(), std::env::current_dir)?;
    let mut config = match config_path {
        Some(config_path) => {
            debug!("using config {}", config_path.display());
            load_config(Some(&config_path)).map_err(|e| {
                eprintln!("Error loading config: {}", e);
                ExitCode::from(EXIT_ERROR)
            })?
        }
        None => {
            debug!("no sitepipe.toml found, using defaults");
            default_config()
        }
    };

    let overrides = CliOverrides { out: cli.out.clone(), src: cli.src.clone(), port: cli.port };
    merge_cli_overrides(&mut config, &overrides);

    let errors = config.validate(&project_root);
    if !errors.is_empty() {
        for error in errors {
            eprintln!("Error: {}", error);
        }
        return Err(ExitCode::from(EXIT_ERROR));
    }

    load_dotenv(&project_root);

    let mode = BuildMode::from_flag(cli.production);
    Ok(BuildContext::new(config, project_root, mode).with_verbose(cli.verbose))
}

/// The directory holding the config file, or the working directory when
/// there is none.
fn project_root<F>(config_path: Option<&Path>, current_dir: F) -> Result<PathBuf, ExitCode>
where
    F: FnOnce() -> std::io::Result<PathBuf>,
{
    match config_path.and_then(Path::parent) {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(parent.to_path_buf()),
        _ => current_dir().map_err(|e| {
            eprintln!("Error: cannot determine the current directory: {}", e);
            ExitCode::from(EXIT_ERROR)
        }),
    }
}

/// Load `<root>/.env` without overriding variables already set.
fn load_dotenv(project_root: &Path) {
    let path = project_root.join(".env");
    match dotenvy::from_path(&path) {
        Ok(()) => debug!("loaded {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("ignoring {}: {}", path.display(), e),
    }
}
