//! cellsync CLI - drive the editor core against live services
//!
//! Usage:
//!   cellsync parse <script.flux>
//!   cellsync run <script.flux> --proxy <url>
//!   cellsync resolve <query> [--id <id>]
//!   cellsync influxql <config.json>
//!
//! Service endpoints come from cellsync.toml (see `Settings::load`).

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use cellsync::config::Settings;
use cellsync::flux::ScriptStatus;
use cellsync::observability::init_logging;
use cellsync::query::template::TEMP_VAR_DASHBOARD_TIME;
use cellsync::query::{build_query, DraftStore, QueryConfig, TimeRange};
use cellsync::service::{FluxHttpClient, HttpConfigResolver, LogNotifier, Service};
use cellsync::sync::ScriptSync;

#[derive(Parser)]
#[command(name = "cellsync")]
#[command(about = "cellsync - script and query-draft synchronization for dashboard cells")]
#[command(version)]
struct Cli {
    /// Path to a config file (overrides the default search)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a script and print its body tree as JSON
    Parse {
        /// Path to the script
        file: PathBuf,
    },

    /// Validate and execute a script, printing the result tables
    Run {
        /// Path to the script
        file: PathBuf,

        /// Proxy link of the service to run against
        #[arg(short, long)]
        proxy: String,
    },

    /// Resolve raw query text into a structured draft
    Resolve {
        /// Raw query text
        query: String,

        /// Draft id sent with the query
        #[arg(short, long, default_value = "cli")]
        id: String,
    },

    /// Render a query config (JSON) as InfluxQL
    Influxql {
        /// Path to the query config
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(settings.logging.format);

    match cli.command {
        Commands::Parse { file } => cmd_parse(&settings, &file).await,
        Commands::Run { file, proxy } => cmd_run(&settings, &file, proxy).await,
        Commands::Resolve { query, id } => cmd_resolve(&settings, &query, &id).await,
        Commands::Influxql { file } => cmd_influxql(&file),
    }
}

fn read_file(file: &Path) -> Option<String> {
    match fs::read_to_string(file) {
        Ok(s) => Some(s),
        Err(e) => {
            eprintln!("Error reading file '{}': {}", file.display(), e);
            None
        }
    }
}

fn build_sync(settings: &Settings) -> Option<ScriptSync> {
    let client = match FluxHttpClient::from_settings(settings) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            eprintln!("Config error: {}", e);
            return None;
        }
    };
    Some(ScriptSync::with_debounce(
        client.clone(),
        client,
        Arc::new(LogNotifier),
        settings.flux.debounce(),
    ))
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error encoding output: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn cmd_parse(settings: &Settings, file: &Path) -> ExitCode {
    let Some(script) = read_file(file) else {
        return ExitCode::FAILURE;
    };
    let Some(sync) = build_sync(settings) else {
        return ExitCode::FAILURE;
    };

    sync.load_suggestions().await;
    match sync.request_parse(&script, true).await {
        ScriptStatus::Error(message) => {
            eprintln!("Parse error: {}", message);
            ExitCode::FAILURE
        }
        _ => print_json(&sync.body()),
    }
}

async fn cmd_run(settings: &Settings, file: &Path, proxy: String) -> ExitCode {
    let Some(script) = read_file(file) else {
        return ExitCode::FAILURE;
    };
    let Some(sync) = build_sync(settings) else {
        return ExitCode::FAILURE;
    };
    let sync = sync.with_script(script);

    let service = Service::with_proxy(proxy);
    if let ScriptStatus::Error(message) = sync.fetch_time_series(&service).await {
        eprintln!("Parse error: {}", message);
        return ExitCode::FAILURE;
    }
    print_json(&sync.data())
}

async fn cmd_resolve(settings: &Settings, query: &str, id: &str) -> ExitCode {
    let url = match settings.config_url() {
        Ok(url) => url,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let resolver = HttpConfigResolver::with_timeout(settings.execution.timeout());

    let mut store = DraftStore::from_drafts(vec![QueryConfig::with_id(id)], None)
        .with_interval_defaults(settings.explorer.pixels, settings.explorer.default_duration_ms);
    if let Err(e) = store.edit_raw_text(&resolver, &url, id, query).await {
        eprintln!("Resolution error: {}", e);
        return ExitCode::FAILURE;
    }
    match store.draft(id) {
        Some(draft) => print_json(draft),
        None => ExitCode::FAILURE,
    }
}

fn cmd_influxql(file: &Path) -> ExitCode {
    let Some(json) = read_file(file) else {
        return ExitCode::FAILURE;
    };
    let config: QueryConfig = match serde_json::from_str(&json) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid query config: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let range = config.range.clone().unwrap_or_else(|| TimeRange {
        upper: None,
        lower: TEMP_VAR_DASHBOARD_TIME.to_string(),
    });
    match build_query(&range, &config) {
        Some(query) => {
            println!("{}", query);
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("Query config needs a database, a measurement and at least one field");
            ExitCode::FAILURE
        }
    }
}
