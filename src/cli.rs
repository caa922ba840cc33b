//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::http_api_adapter::HttpMarketApi;
use crate::adapters::web::{AppState, build_router};
use crate::domain::backtest::{BacktestForm, DEFAULT_INITIAL_CAPITAL, DEFAULT_ROE_MIN};
use crate::domain::company::{filter_companies, nifty50};
use crate::domain::error::DashError;
use crate::domain::export::ExportFormat;
use crate::ports::market_api::MarketApi;
use crate::settings::Settings;

const CLI_LOG_FILTER: &str = "trademo=warn";

#[derive(Parser, Debug)]
#[command(name = "trademo", about = "Web dashboard for NIFTY 50 prices, fundamentals and backtests")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the web dashboard
    Serve {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List companies, filtered by name and sector
    Companies {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        sector: Option<String>,
        /// List the backend's companies instead of the built-in NIFTY 50
        #[arg(long)]
        remote: bool,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// List strategies stored by the backend
    Strategies {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Run a portfolio backtest and export its result
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        strategy_id: i64,
        /// Start date, YYYY-MM-DD
        #[arg(long)]
        start: String,
        /// End date, YYYY-MM-DD
        #[arg(long)]
        end: String,
        #[arg(long, default_value_t = DEFAULT_INITIAL_CAPITAL)]
        capital: f64,
        #[arg(long, default_value_t = DEFAULT_ROE_MIN)]
        roe_min: f64,
        #[arg(long, default_value = "csv")]
        format: ExportFormat,
        /// Write the export here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Serve { config } => run_serve(&config),
        Command::Companies {
            name,
            sector,
            remote,
            config,
        } => run_companies(
            name.as_deref().unwrap_or_default(),
            sector.as_deref().unwrap_or_default(),
            remote,
            config.as_deref(),
        ),
        Command::Strategies { config } => run_strategies(&config),
        Command::Backtest {
            config,
            strategy_id,
            start,
            end,
            capital,
            roe_min,
            format,
            output,
        } => {
            let form = BacktestForm {
                strategy_id: strategy_id.to_string(),
                start_date: start,
                end_date: end,
                initial_capital: capital.to_string(),
                roe_min: roe_min.to_string(),
            };
            run_backtest(&config, &form, format, output.as_deref())
        }
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(&e)
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, DashError> {
    FileConfigAdapter::from_file(path)
}

pub fn load_settings(path: &Path) -> Result<Settings, DashError> {
    eprintln!("Loading config from {}", path.display());
    let config = load_config(path)?;
    Settings::from_config(&config)
}

/// Install the global subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn runtime() -> Result<tokio::runtime::Runtime, DashError> {
    Ok(tokio::runtime::Builder::new_multi_thread().enable_all().build()?)
}

fn backend(settings: &Settings) -> Result<Arc<dyn MarketApi>, DashError> {
    Ok(Arc::new(HttpMarketApi::from_settings(settings)?))
}

fn run_serve(config_path: &Path) -> Result<(), DashError> {
    let settings = load_settings(config_path)?;
    init_tracing(&settings.log_filter());
    runtime()?.block_on(serve(settings))
}

pub async fn serve(settings: Settings) -> Result<(), DashError> {
    if !settings.static_dir.is_dir() {
        warn!(dir = %settings.static_dir.display(), "static directory not found; stylesheet will 404");
    }
    let state = AppState::new(backend(&settings)?, settings.result_cache_size);
    let router = build_router(state, &settings.static_dir);

    let listener = tokio::net::TcpListener::bind(settings.listen).await?;
    info!(addr = %settings.listen, backend = %settings.backend_url, "dashboard listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("dashboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

fn run_companies(name: &str, sector: &str, remote: bool, config_path: Option<&Path>) -> Result<(), DashError> {
    if !remote {
        init_tracing(CLI_LOG_FILTER);
        let companies = filter_companies(&nifty50(), name, sector);
        for c in &companies {
            println!("{}\t{}\t{}\t{}", c.id, c.symbol, c.name, c.sector);
        }
        eprintln!("{} companies", companies.len());
        return Ok(());
    }

    let settings = match config_path {
        Some(path) => load_settings(path)?,
        None => Settings::from_config(&FileConfigAdapter::empty())?,
    };
    init_tracing(&settings.log_filter_or(CLI_LOG_FILTER));
    let api = backend(&settings)?;
    let records = runtime()?.block_on(api.list_companies())?;

    let name = name.trim().to_lowercase();
    let sector = sector.trim().to_lowercase();
    let mut shown = 0;
    for r in &records {
        let r_sector = r.sector.as_deref().unwrap_or("-");
        if r.name.to_lowercase().contains(&name) && r_sector.to_lowercase().contains(&sector) {
            println!("{}\t{}\t{}\t{}", r.id, r.symbol, r.name, r_sector);
            shown += 1;
        }
    }
    eprintln!("{shown} of {} companies from {}", records.len(), settings.backend_url);
    Ok(())
}

fn run_strategies(config_path: &Path) -> Result<(), DashError> {
    let settings = load_settings(config_path)?;
    init_tracing(&settings.log_filter_or(CLI_LOG_FILTER));
    let api = backend(&settings)?;
    let strategies = runtime()?.block_on(api.list_strategies())?;

    if strategies.is_empty() {
        eprintln!("No strategies found");
    }
    for s in &strategies {
        println!("{}\t{}\t{}", s.id, s.name, s.description.as_deref().unwrap_or_default());
    }
    Ok(())
}

fn run_backtest(
    config_path: &Path,
    form: &BacktestForm,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<(), DashError> {
    let request = form.validate()?;
    let settings = load_settings(config_path)?;
    init_tracing(&settings.log_filter_or(CLI_LOG_FILTER));
    let api = backend(&settings)?;

    eprintln!(
        "Running strategy {} from {} to {}...",
        request.strategy_id, request.start_date, request.end_date
    );
    let report = runtime()?.block_on(api.run_backtest(&request))?;
    if let Some(message) = &report.message {
        eprintln!("{message}");
    }
    for m in &report.metrics {
        eprintln!("  {}: {}", m.name, m.value);
    }

    let export = format.render(&report)?;
    match output {
        Some(path) => {
            fs::write(path, &export.body)?;
            eprintln!("Wrote {} to {}", export.filename, path.display());
        }
        None => println!("{}", export.body),
    }
    Ok(())
}
