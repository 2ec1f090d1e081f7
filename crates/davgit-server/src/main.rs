//! DavGit server binary.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result, anyhow};
use clap::{Parser, Subcommand};
use davgit_git::RepositoryManager;
use davgit_server::{AppState, ServerConfig, metrics::init_metrics, run_server_with_state};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "davgit")]
#[command(about = "Git smart/dumb HTTP and WebDAV server for bare repositories", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./davgit.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (default)
    Serve,
    /// Create a bare repository with an initial commit
    Create {
        /// Repository directory; `.git` is appended when missing
        path: PathBuf,
    },
    /// Mirror a remote repository into a new bare repository
    Mirror {
        /// Remote repository URL
        url: String,
        /// Repository directory; `.git` is appended when missing
        path: PathBuf,
        #[arg(long, requires = "password")]
        username: Option<String>,
        #[arg(long, requires = "username")]
        password: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ServerConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Create { path } => {
            let manager = RepositoryManager::new(&backend_config(&config)?);
            let created = manager
                .create_repository(&path)
                .await
                .with_context(|| format!("failed to create repository {}", path.display()))?;
            println!("Created repository {}", created.display());
            Ok(())
        },
        Commands::Mirror {
            url,
            path,
            username,
            password,
        } => {
            let manager = RepositoryManager::new(&backend_config(&config)?);
            let credentials = username.as_deref().zip(password.as_deref());
            let mirrored = manager
                .mirror_repository(&url, &path, credentials)
                .await
                .with_context(|| format!("failed to mirror {url}"))?;
            println!("Mirrored {url} into {}", mirrored.display());
            Ok(())
        },
    }
}

fn backend_config(config: &ServerConfig) -> Result<davgit_git::BackendConfig> {
    config
        .backend_config()
        .map_err(|e| anyhow!("invalid backend configuration: {e}"))
}

async fn serve(config: ServerConfig) -> Result<()> {
    let addr = config
        .socket_addr()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;

    tracing::info!("Starting DavGit server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Repository root: {}", config.root_path.display());
    tracing::info!("Root link: {}", config.root_link());
    tracing::info!("Users configured: {}", config.users.len());

    if !config.root_path.is_dir() {
        tracing::warn!(
            "Repository root {} does not exist; every request will fail",
            config.root_path.display()
        );
    }

    let state = AppState::from_config(&config).map_err(|e| anyhow!("invalid configuration: {e}"))?;
    match state.backend().config().resolve_http_backend() {
        Some(backend) => tracing::info!("Git HTTP backend: {}", backend.display()),
        None => tracing::warn!("git-http-backend not found, serving the dumb protocol only"),
    }

    let prometheus_handle = init_metrics().context("failed to initialize metrics")?;
    run_server_with_state(addr, state, prometheus_handle).await?;
    Ok(())
}
