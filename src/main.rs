//! zensync CLI
//!
//! Keeps Zen Browser profile data in an S3-compatible bucket.

mod cli;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::Colorize;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigureArgs, TransferArgs};
use zensync::config::{detect_zen_paths, Settings};
use zensync::fs::S3Store;
use zensync::profiles::{list_profiles, profile_info};
use zensync::sync::{RunOptions, SyncContext, SyncEngine, SyncMode};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    init_logging(verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Error: {:#}", e);
            if verbose {
                eprintln!("{:?}", e);
            }
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
/// `--verbose` raises only this crate to debug; store and HTTP internals stay at info.
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "info,zensync=debug"
    } else {
        "info"
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .init();
}

/// Returns whether the command succeeded.
async fn run(cli: Cli) -> Result<bool> {
    let mut settings = Settings::load(&cli.config);
    if let Some(path) = &cli.roaming_path {
        settings.sync.zen_roaming_path = path.clone();
    }
    if let Some(path) = &cli.local_path {
        settings.sync.zen_local_path = path.clone();
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(true);
    };

    match command {
        Commands::Configure(args) => {
            configure(settings, args)?;
            Ok(true)
        }
        Commands::ListProfiles => {
            print_profiles(&settings);
            Ok(true)
        }
        Commands::ProfileInfo => {
            print_profile_info(&settings);
            Ok(true)
        }
        Commands::Upload {
            transfer,
            force_full,
        } => transfer_run(settings, SyncMode::Push, &transfer, !force_full).await,
        Commands::Download {
            transfer,
            force_full,
        } => transfer_run(settings, SyncMode::Pull, &transfer, !force_full).await,
        Commands::Sync { transfer } => {
            transfer_run(settings, SyncMode::Bidirectional, &transfer, true).await
        }
    }
}

async fn transfer_run(
    mut settings: Settings,
    mode: SyncMode,
    transfer: &TransferArgs,
    incremental: bool,
) -> Result<bool> {
    if let Some(bucket) = &transfer.bucket {
        settings.aws.bucket = bucket.clone();
    }
    if let Some(prefix) = &transfer.prefix {
        settings.aws.prefix = prefix.clone();
    }
    if transfer.no_cache {
        settings.sync.sync_cache_data = false;
        info!("Cache sync disabled for this operation");
    }
    if transfer.dry_run {
        info!("Dry run: analyzing without changing anything");
    }

    let store = S3Store::connect(&settings.aws)
        .await
        .context("Failed to initialize S3 client")?;
    let ctx = SyncContext::new(settings, Arc::new(store))?;
    let mut engine = SyncEngine::new(ctx);

    let options = RunOptions {
        dry_run: transfer.dry_run,
        incremental,
        cleanup: transfer.cleanup,
    };
    let report = match mode {
        SyncMode::Push => engine.push(options).await,
        SyncMode::Pull => engine.pull(options).await,
        SyncMode::Bidirectional => engine.sync(options).await,
    }
    .with_context(|| format!("{} failed", mode))?;

    if report.success() {
        info!("{} finished: {}", mode, report.summary);
    } else {
        warn!(
            "{} finished with {} failed operation(s)",
            mode, report.stats.failed
        );
    }
    Ok(report.success())
}

fn configure(mut settings: Settings, args: ConfigureArgs) -> Result<()> {
    if let Some(bucket) = args.bucket {
        settings.aws.bucket = bucket;
    }
    if let Some(region) = args.region {
        settings.aws.region = region;
    }
    if let Some(endpoint) = args.endpoint_url {
        info!("Using custom S3 endpoint: {}", endpoint);
        settings.aws.endpoint_url = endpoint;
    }
    if let Some(key) = args.access_key {
        warn!("Storing AWS access key in config file");
        settings.aws.access_key_id = key;
    }
    if let Some(secret) = args.secret_key {
        warn!("Storing AWS secret key in config file");
        settings.aws.secret_access_key = secret;
    }
    if let Some(profile) = args.profile {
        info!("Configured to use AWS profile: {}", profile);
        settings.aws.profile = profile;
    }

    if args.auto_detect {
        let detected = detect_zen_paths();
        if let Some(roaming) = detected.roaming {
            println!("Auto-detected roaming path: {}", roaming.display());
            settings.sync.zen_roaming_path = roaming.display().to_string();
        }
        if let Some(local) = detected.local {
            println!("Auto-detected local path: {}", local.display());
            settings.sync.zen_local_path = local.display().to_string();
        }
    }

    if args.enable_cache_sync {
        settings.sync.sync_cache_data = true;
    }
    if args.disable_cache_sync {
        settings.sync.sync_cache_data = false;
    }
    if args.enable_metadata {
        settings.aws.disable_metadata = false;
        info!("S3 metadata enabled");
    }
    if args.disable_metadata {
        settings.aws.disable_metadata = true;
        info!("S3 metadata disabled");
    }
    if let Some(version) = args.signature_version {
        settings.aws.signature_version = version.as_str().to_string();
        info!("AWS signature version set to: {}", version.as_str());
    }

    settings.save().context("Failed to save configuration")?;

    println!("\n{}", "Configuration updated:".green().bold());
    println!("{}", settings.redacted_json()?);
    Ok(())
}

fn print_profiles(settings: &Settings) {
    let Some(roaming) = settings.roaming_root() else {
        error!("Roaming path not configured");
        println!("No profiles found");
        return;
    };

    let profiles = list_profiles(&roaming);
    if profiles.is_empty() {
        println!("No profiles found");
        return;
    }

    println!("\n{}", "Available Zen Browser Profiles:".bold());
    println!("{}", "=".repeat(70));
    for profile in profiles {
        let status = if profile.is_default { " (Default)".green().to_string() } else { String::new() };
        println!("• {}{}", profile.name.cyan().bold(), status);
        println!("  Profile ID: {}", profile.id);
        println!("  Path: {}", profile.path);
        println!(
            "  Store ID: {}",
            if profile.store_id.is_empty() { "N/A" } else { profile.store_id.as_str() }
        );
        println!("  Full Path: {}", display_opt(profile.full_path.as_ref()));
        println!();
    }
}

fn print_profile_info(settings: &Settings) {
    let roaming = settings.roaming_root();
    let local = settings.local_root();
    let info = profile_info(roaming.as_deref(), local.as_deref());

    println!("\n{}", "Zen Browser Profile System Information:".bold());
    println!("{}", "=".repeat(70));
    println!("\nPaths:");
    println!("  roaming: {}", display_opt(info.roaming.as_ref()));
    println!("  local: {}", display_opt(info.local.as_ref()));
    println!("  roaming_exists: {}", info.roaming_exists);
    println!("  local_exists: {}", info.local_exists);

    println!("\nProfiles Found: {}", info.profiles.len());
    for profile in &info.profiles {
        let status = if profile.is_default { " (Default)" } else { "" };
        println!("  • {}{}", profile.name, status);
    }

    if let Some(groups) = info.profile_groups {
        println!("\nProfile Groups:");
        match groups {
            Some(groups) => {
                println!("  Path: {}", groups.path.display());
                println!("  Databases: {}", groups.databases.join(", "));
            }
            None => println!("  {}", "Not found".yellow()),
        }
    }
}

fn display_opt(path: Option<&PathBuf>) -> String {
    path.map(|p| p.display().to_string())
        .unwrap_or_else(|| "Not configured".to_string())
}
