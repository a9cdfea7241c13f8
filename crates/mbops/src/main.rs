//! `mbops` — publishing automation for a Micro.blog-hosted site.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use mbops::config::load_config;
use mbops::ops::auth::AuthOptions;
use mbops::ops::backup::BackupOptions;
use mbops::ops::deploy::DeployOptions;
use mbops::ops::{auth, backup, deploy};

#[derive(Parser, Debug)]
#[command(
    name = "mbops",
    about = "Authenticate, deploy and back up a Micro.blog-hosted site",
    version
)]
struct Cli {
    /// Path to the JSON config file.
    #[arg(long, global = true, default_value = "mbops.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Obtain a fresh session cookie via the sign-in email
    Auth {
        /// Write the cookie to this file instead of the configured path
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the cookie to stdout instead of writing a file
        #[arg(long, conflicts_with = "output")]
        stdout: bool,

        /// Override the number of inbox poll attempts
        #[arg(long)]
        max_retries: Option<u32>,

        /// Override the seconds between poll attempts
        #[arg(long)]
        retry_interval: Option<u64>,
    },
    /// Reload the theme, rebuild the site and optionally watch the build
    Deploy {
        /// Reload theme templates from their source repository
        #[arg(long)]
        reload: bool,

        /// Trigger a site rebuild
        #[arg(long)]
        rebuild: bool,

        /// Watch the rebuild until it completes
        #[arg(long)]
        monitor: bool,

        /// Shorthand for --reload --rebuild --monitor
        #[arg(long)]
        all: bool,

        /// Only check that the session cookie is still valid
        #[arg(long, conflicts_with_all = ["reload", "rebuild", "monitor", "all"])]
        validate_only: bool,

        /// Build monitor budget in seconds
        #[arg(long, default_value_t = 300)]
        timeout: u64,

        /// Seconds between build status polls
        #[arg(long, default_value_t = 5)]
        interval: u64,

        /// Session cookie value (overrides the cookie file and env var)
        #[arg(long)]
        session_cookie: Option<String>,
    },
    /// Export the site, download the archive and refresh the local content
    Backup {
        /// Also replace layouts/ and static/, not just content/ and data/
        #[arg(long)]
        all: bool,

        /// Stop after downloading the export archive
        #[arg(long, conflicts_with = "extract_only")]
        export_only: bool,

        /// Skip the export and extract this local archive instead
        #[arg(long, value_name = "ZIP")]
        extract_only: Option<PathBuf>,

        /// Do not snapshot the current content/ before replacing it
        #[arg(long)]
        no_backup: bool,

        /// Override the number of inbox poll attempts
        #[arg(long)]
        max_retries: Option<u32>,

        /// Override the seconds between poll attempts
        #[arg(long)]
        retry_interval: Option<u64>,

        /// Session cookie value (overrides the cookie file and env var)
        #[arg(long)]
        session_cookie: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mbops=info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> mbops::Result<()> {
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Auth {
            output,
            stdout,
            max_retries,
            retry_interval,
        } => {
            auth::run(
                &config,
                &AuthOptions {
                    output,
                    stdout,
                    max_retries,
                    retry_interval,
                },
            )
            .await
        }
        Commands::Deploy {
            reload,
            rebuild,
            monitor,
            all,
            validate_only,
            timeout,
            interval,
            session_cookie,
        } => {
            deploy::run(
                &config,
                &DeployOptions {
                    reload: reload || all,
                    rebuild: rebuild || all,
                    monitor: monitor || all,
                    validate_only,
                    timeout: Duration::from_secs(timeout),
                    poll_interval: Duration::from_secs(interval),
                    session_cookie,
                },
            )
            .await
        }
        Commands::Backup {
            all,
            export_only,
            extract_only,
            no_backup,
            max_retries,
            retry_interval,
            session_cookie,
        } => {
            backup::run(
                &config,
                &BackupOptions {
                    export_only,
                    extract_only,
                    extract_all: all,
                    no_backup,
                    max_retries,
                    retry_interval,
                    session_cookie,
                },
            )
            .await
        }
    }
}
