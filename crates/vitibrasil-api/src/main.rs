//! Vitibrasil API entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use vitibrasil::{
    AcquisitionPipeline, Category, HttpTableSource, SqliteStore, TableAddressResolver, YEAR_RANGE,
};
use vitibrasil_api::auth::DEFAULT_TOKEN_TTL_MINUTES;
use vitibrasil_api::config::{
    database_path, resolve_addr, resolve_base_url, resolve_data_dir, resolve_jwt_secret,
};
use vitibrasil_api::{AppState, JwtAuthorizer};

#[derive(Parser)]
#[command(
    name = "vitibrasil-api",
    about = "Authenticated API for Brazilian viticulture statistics (Embrapa VitiBrasil)",
    version
)]
struct Cli {
    /// Directory holding the dataset store.
    /// Also reads from VITIBRASIL_DATA_DIR.
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// Upstream page to fetch tables from.
    /// Also reads from VITIBRASIL_BASE_URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Upstream request timeout in seconds.
    #[arg(long, global = true, default_value = "10")]
    timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API.
    Serve {
        /// Listen address (host:port).
        /// Also reads from VITIBRASIL_ADDR.
        #[arg(long)]
        addr: Option<String>,

        /// Secret used to verify bearer tokens.
        /// Also reads from VITIBRASIL_JWT_SECRET.
        #[arg(long)]
        jwt_secret: Option<String>,
    },

    /// Acquire one dataset and print it as JSON.
    Fetch {
        /// Category (producao, processamento, comercializacao, importacao, exportacao).
        category: String,

        /// Sub-table name, e.g. "Viníferas".
        #[arg(long)]
        sub_table: Option<String>,

        #[arg(long)]
        year: Option<u16>,

        /// Skip the local store and fetch fresh data.
        #[arg(long)]
        force: bool,
    },

    /// Mint an access token.
    Token {
        /// Subject (user name) to embed in the token.
        #[arg(long)]
        sub: String,

        #[arg(long, default_value_t = DEFAULT_TOKEN_TTL_MINUTES)]
        ttl_minutes: i64,

        /// Signing secret. Also reads from VITIBRASIL_JWT_SECRET.
        #[arg(long)]
        jwt_secret: Option<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

fn open_pipeline(cli: &Cli) -> anyhow::Result<(AcquisitionPipeline, Arc<SqliteStore>)> {
    let data_dir = resolve_data_dir(cli.data_dir.as_deref());
    let db_path = database_path(&data_dir);
    let store = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("failed to open store at {}", db_path.display()))?,
    );

    let base_url = resolve_base_url(cli.base_url.as_deref());
    let source = Arc::new(HttpTableSource::new(Duration::from_secs(cli.timeout_secs))?);
    tracing::info!("Store: {}", db_path.display());
    tracing::info!("Upstream: {base_url}");

    let pipeline = AcquisitionPipeline::new(TableAddressResolver::new(base_url), source, store.clone());
    Ok((pipeline, store))
}

fn close_store(store: Arc<SqliteStore>) {
    match Arc::try_unwrap(store) {
        Ok(store) => {
            if let Err(e) = store.close() {
                tracing::warn!("failed to close store cleanly: {e}");
            }
        }
        Err(_) => tracing::warn!("store still in use at shutdown"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Serve { addr, jwt_secret } => {
            let Some(secret) = resolve_jwt_secret(jwt_secret.as_deref()) else {
                bail!("a JWT secret is required: pass --jwt-secret or set VITIBRASIL_JWT_SECRET");
            };
            let addr = resolve_addr(addr.as_deref());
            let (pipeline, store) = open_pipeline(&cli)?;
            let state = Arc::new(AppState {
                pipeline,
                authorizer: Arc::new(JwtAuthorizer::from_secret(secret.as_bytes())),
            });

            vitibrasil_api::serve(&addr, state).await?;
            close_store(store);
        }

        Commands::Fetch {
            category,
            sub_table,
            year,
            force,
        } => {
            let category: Category = category.parse()?;
            if let Some(year) = year {
                if !YEAR_RANGE.contains(year) {
                    bail!(
                        "year must be between {} and {}",
                        YEAR_RANGE.start(),
                        YEAR_RANGE.end()
                    );
                }
            }

            let (pipeline, store) = open_pipeline(&cli)?;
            let acquisition = pipeline
                .acquire_detailed(category, sub_table.as_deref(), *year, *force)
                .await?;
            tracing::info!(
                origin = acquisition.origin.as_str(),
                rejected = acquisition.rejected,
                "acquired {} records",
                acquisition.records.len()
            );
            println!("{}", serde_json::to_string_pretty(&acquisition.records)?);

            drop(pipeline);
            close_store(store);
        }

        Commands::Token {
            sub,
            ttl_minutes,
            jwt_secret,
        } => {
            let Some(secret) = resolve_jwt_secret(jwt_secret.as_deref()) else {
                bail!("a JWT secret is required: pass --jwt-secret or set VITIBRASIL_JWT_SECRET");
            };
            let token = JwtAuthorizer::from_secret(secret.as_bytes())
                .issue(sub, chrono::Duration::minutes(*ttl_minutes))?;
            println!("{token}");
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "vitibrasil-api", &mut std::io::stdout());
        }
    }

    Ok(())
}
