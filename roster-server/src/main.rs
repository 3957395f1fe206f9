//! Roster server and command-line tool.
//!
//! ```bash
//! roster serve --bind 0.0.0.0:4000
//! roster migrate
//! roster schema > schema.graphql
//! roster --in-memory query '{ users { id name email } }'
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use roster::async_graphql::{Request, Variables};
use roster::config::StorageBackend;
use roster::{App, MemoryGateway, RosterConfig, UserService};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "GraphQL user directory over PostgreSQL")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to config/config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database connection URL, overrides the configuration
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Use the in-memory store instead of PostgreSQL
    #[arg(long, global = true)]
    in_memory: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve GraphQL over HTTP
    Serve {
        /// Listen address, overrides `server.bind`
        #[arg(long)]
        bind: Option<String>,

        /// Coroutine scheduler worker threads, overrides `server.workers`
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Create the users table if it does not exist
    Migrate,

    /// Print the GraphQL schema (SDL)
    Schema,

    /// Execute one GraphQL document against the configured store
    Query {
        /// Query or mutation document
        document: String,

        /// Variables as a JSON object
        #[arg(long)]
        variables: Option<String>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("--variables must be a JSON object: {0}")]
    InvalidVariables(serde_json::Error),
    #[error("GraphQL execution returned {0} error(s)")]
    QueryFailed(usize),
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Serve { bind, workers } => handle_serve(config, bind, workers),
        Commands::Migrate => handle_migrate(&config),
        Commands::Schema => handle_schema(),
        Commands::Query {
            document,
            variables,
        } => handle_query(&config, document, variables),
    }
}

fn load_config(cli: &Cli) -> Result<RosterConfig> {
    let mut config = match &cli.config {
        Some(path) => RosterConfig::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => RosterConfig::load().context("loading configuration")?,
    };

    if let Some(url) = &cli.database_url {
        config.database.url = url.clone();
    }
    if cli.in_memory {
        config.database.backend = StorageBackend::Memory;
    }
    Ok(config)
}

fn handle_serve(mut config: RosterConfig, bind: Option<String>, workers: Option<usize>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(workers) = workers {
        config.server.workers = workers;
    }
    may::config().set_workers(config.server.workers.max(1));

    let app = App::from_config(&config).context("starting roster")?;
    let server = roster::http::serve(app.http(&config), &config.server.bind)
        .with_context(|| format!("binding {}", config.server.bind))?;

    server
        .join()
        .map_err(|e| anyhow!("server encountered an error: {:?}", e))?;
    Ok(())
}

fn handle_migrate(config: &RosterConfig) -> Result<()> {
    roster::bootstrap::migrate(&config.database).context("migrating schema")?;
    log::info!("schema is up to date");
    Ok(())
}

fn handle_schema() -> Result<()> {
    // The SDL does not depend on the store, so no connection is opened.
    let service = UserService::new(Arc::new(MemoryGateway::new()));
    println!("{}", roster::build_schema(service).sdl());
    Ok(())
}

fn handle_query(config: &RosterConfig, document: String, variables: Option<String>) -> Result<()> {
    let mut request = Request::new(document);
    if let Some(raw) = variables {
        let value: serde_json::Value =
            serde_json::from_str(&raw).map_err(CliError::InvalidVariables)?;
        request = request.variables(Variables::from_json(value));
    }

    let app = App::from_config(config).context("starting roster")?;
    let response = futures::executor::block_on(app.schema.execute(request));
    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.errors.is_empty() {
        Ok(())
    } else {
        Err(CliError::QueryFailed(response.errors.len()).into())
    }
}
