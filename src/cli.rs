//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use zensync::config::DEFAULT_CONFIG_FILE;

/// Zen Browser profile sync to S3-compatible storage
#[derive(Parser, Debug)]
#[command(name = "zensync")]
#[command(version, about, long_about = None)]
#[command(after_help = "Examples:
  zensync upload --bucket my-backup-bucket
  zensync download --bucket my-backup-bucket
  zensync sync --bucket my-backup-bucket
  zensync configure --bucket my-bucket --endpoint-url http://localhost:9000
  zensync list-profiles")]
pub struct Cli {
    /// Configuration file path
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Override the roaming data path (`configure` saves it)
    #[arg(long, global = true)]
    pub roaming_path: Option<String>,

    /// Override the local (cache) data path (`configure` saves it)
    #[arg(long, global = true)]
    pub local_path: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Store selection and run switches shared by the transfer commands.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct TransferArgs {
    /// S3 bucket name
    #[arg(long)]
    pub bucket: Option<String>,

    /// Key prefix inside the bucket
    #[arg(long)]
    pub prefix: Option<String>,

    /// Show what would change without touching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Leave cache data out of this run
    #[arg(long)]
    pub no_cache: bool,

    /// Delete destination files with no source counterpart
    #[arg(long)]
    pub cleanup: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Upload profiles to the store
    Upload {
        #[command(flatten)]
        transfer: TransferArgs,

        /// Transfer everything, skipping comparison
        #[arg(long)]
        force_full: bool,
    },

    /// Download profiles from the store
    Download {
        #[command(flatten)]
        transfer: TransferArgs,

        /// Transfer everything, skipping comparison
        #[arg(long)]
        force_full: bool,
    },

    /// Sync both ways; the newer copy wins
    Sync {
        #[command(flatten)]
        transfer: TransferArgs,
    },

    /// List local browser profiles
    ListProfiles,

    /// Show profile system information
    ProfileInfo,

    /// Update and save settings
    Configure(ConfigureArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ConfigureArgs {
    /// S3 bucket name
    #[arg(long)]
    pub bucket: Option<String>,

    /// AWS region
    #[arg(long)]
    pub region: Option<String>,

    /// Endpoint of an S3-compatible service
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Access key ID, stored in the config file
    #[arg(long)]
    pub access_key: Option<String>,

    /// Secret access key, stored in the config file
    #[arg(long)]
    pub secret_key: Option<String>,

    /// AWS profile name from the shared credentials file
    #[arg(long)]
    pub profile: Option<String>,

    /// Detect browser paths for this platform
    #[arg(long)]
    pub auto_detect: bool,

    /// Include cache data in transfers
    #[arg(long, conflicts_with = "disable_cache_sync")]
    pub enable_cache_sync: bool,

    #[arg(long)]
    pub disable_cache_sync: bool,

    /// Attach mtime and hash metadata to uploads
    #[arg(long, conflicts_with = "disable_metadata")]
    pub enable_metadata: bool,

    #[arg(long)]
    pub disable_metadata: bool,

    /// Request signing version
    #[arg(long, value_enum)]
    pub signature_version: Option<SignatureVersion>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureVersion {
    #[value(name = "s3")]
    S3,
    #[value(name = "s3v4")]
    S3v4,
}

impl SignatureVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureVersion::S3 => "s3",
            SignatureVersion::S3v4 => "s3v4",
        }
    }
}
