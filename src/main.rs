//! Day-ahead bidding entry point: CLI wiring and config-driven optimization.

use std::path::Path;
use std::process;

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use tracing::info;
use tracing_subscriber::EnvFilter;

use da_bidding::bidding::BidOptimization;
use da_bidding::config::BiddingConfig;
use da_bidding::ensemble::combine_forecasts;
use da_bidding::forecast::{
    DEFAULT_CONFIDENCE_MARGIN, DEFAULT_INTERVAL_MINUTES, ForecastSet, NaiveForecast,
};
use da_bidding::io::export::{export_blend_csv, export_grid_csv};
use da_bidding::io::import::{load_forecast_csv, load_model_predictions_csv};

/// Forecast length used when no input file is given.
const DEFAULT_HORIZON: usize = 24;

/// Parsed CLI arguments.
struct CliArgs {
    config_path: Option<String>,
    preset: Option<String>,
    forecast_path: Option<String>,
    models_path: Option<String>,
    horizon: Option<usize>,
    grid_out: Option<String>,
    blend_out: Option<String>,
    #[cfg(feature = "api")]
    serve: bool,
    #[cfg(feature = "api")]
    port: u16,
}

fn print_help() {
    eprintln!("da-bidding: day-ahead bid optimizer with forecast ensembling");
    eprintln!();
    eprintln!("Usage: da-bidding [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>      Load configuration from TOML file");
    eprintln!("  --preset <name>      Use a built-in preset (baseline, tight_margin)");
    eprintln!("  --forecast <path>    Real-time price forecast CSV");
    eprintln!("  --models <path>      Model predictions CSV (truth + one column per model)");
    eprintln!("  --horizon <usize>    Tile/truncate the price series to this many points");
    eprintln!("  --grid-out <path>    Export per-price search results to CSV");
    eprintln!("  --blend-out <path>   Export the blended forecast to CSV (needs --models)");
    #[cfg(feature = "api")]
    {
        eprintln!("  --serve              Start REST API server after the run");
        eprintln!("  --port <u16>         API server port (default: 3000)");
    }
    eprintln!("  --help               Show this help message");
    eprintln!();
    eprintln!("If no --config or --preset is given, the baseline preset is used.");
    eprintln!("If neither --forecast nor --models is given, a flat forecast at the");
    eprintln!("middle of the price grid is used. Set RUST_LOG to change log verbosity.");
}

/// Returns the value following flag `args[*i]`, exiting if it is missing.
fn flag_value(args: &[String], i: &mut usize, what: &str) -> String {
    *i += 1;
    if *i >= args.len() {
        eprintln!("error: {} requires {what}", args[*i - 1]);
        process::exit(1);
    }
    args[*i].clone()
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        config_path: None,
        preset: None,
        forecast_path: None,
        models_path: None,
        horizon: None,
        grid_out: None,
        blend_out: None,
        #[cfg(feature = "api")]
        serve: false,
        #[cfg(feature = "api")]
        port: 3000,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--config" => cli.config_path = Some(flag_value(&args, &mut i, "a path argument")),
            "--preset" => cli.preset = Some(flag_value(&args, &mut i, "a name argument")),
            "--forecast" => {
                cli.forecast_path = Some(flag_value(&args, &mut i, "a path argument"));
            }
            "--models" => cli.models_path = Some(flag_value(&args, &mut i, "a path argument")),
            "--horizon" => {
                let raw = flag_value(&args, &mut i, "a usize argument");
                match raw.parse::<usize>() {
                    Ok(h) if h > 0 => cli.horizon = Some(h),
                    _ => {
                        eprintln!("error: --horizon value \"{raw}\" is not a positive integer");
                        process::exit(1);
                    }
                }
            }
            "--grid-out" => cli.grid_out = Some(flag_value(&args, &mut i, "a path argument")),
            "--blend-out" => cli.blend_out = Some(flag_value(&args, &mut i, "a path argument")),
            #[cfg(feature = "api")]
            "--serve" => {
                cli.serve = true;
            }
            #[cfg(feature = "api")]
            "--port" => {
                let raw = flag_value(&args, &mut i, "a u16 argument");
                if let Ok(p) = raw.parse::<u16>() {
                    cli.port = p;
                } else {
                    eprintln!("error: --port value \"{raw}\" is not a valid u16");
                    process::exit(1);
                }
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    if cli.forecast_path.is_some() && cli.models_path.is_some() {
        eprintln!("error: --forecast and --models are mutually exclusive");
        process::exit(1);
    }
    if cli.blend_out.is_some() && cli.models_path.is_none() {
        eprintln!("error: --blend-out requires --models");
        process::exit(1);
    }

    cli
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Midnight UTC of the next delivery day.
fn delivery_day_start() -> DateTime<Utc> {
    let today = Utc::now().date_naive();
    today
        .succ_opt()
        .unwrap_or(today)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Builds a forecast set from a bare series, tiled to `horizon` if given.
fn series_forecast(prices: &[f64], horizon: Option<usize>) -> ForecastSet {
    let prices = match horizon {
        Some(h) => NaiveForecast.forecast(prices, h),
        None => prices.to_vec(),
    };
    ForecastSet::from_series(
        delivery_day_start(),
        TimeDelta::minutes(DEFAULT_INTERVAL_MINUTES),
        &prices,
        DEFAULT_CONFIDENCE_MARGIN,
    )
    .unwrap_or_else(|e| {
        eprintln!("error: {e}");
        process::exit(1);
    })
}

/// Resolves the forecast from `--forecast`, `--models`, or the flat default.
fn build_forecast(cli: &CliArgs, cfg: &BiddingConfig) -> ForecastSet {
    if let Some(ref path) = cli.forecast_path {
        return load_forecast_csv(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("error: failed to read forecast \"{path}\": {e}");
            process::exit(1);
        });
    }

    if let Some(ref path) = cli.models_path {
        let models = load_model_predictions_csv(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("error: failed to read model predictions \"{path}\": {e}");
            process::exit(1);
        });
        let outcome = combine_forecasts(&models.predictions, &models.truth, &cfg.ensemble)
            .unwrap_or_else(|e| {
                eprintln!("error: ensemble failed: {e}");
                process::exit(1);
            });
        println!("{outcome}\n");

        if let Some(ref out) = cli.blend_out {
            if let Err(e) = export_blend_csv(&outcome.blended_forecast, Path::new(out)) {
                eprintln!("error: failed to write CSV: {e}");
                process::exit(1);
            }
            info!(path = %out, "blended forecast written");
        }
        return series_forecast(&outcome.blended_forecast, cli.horizon);
    }

    let mid = (cfg.grid.price_min + cfg.grid.price_max) / 2.0;
    series_forecast(&[mid], Some(cli.horizon.unwrap_or(DEFAULT_HORIZON)))
}

fn main() {
    let cli = parse_args();
    init_tracing();

    // Load config: --config takes priority, then --preset, then baseline default
    let config = if let Some(ref path) = cli.config_path {
        match BiddingConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match BiddingConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        BiddingConfig::baseline()
    };

    // Validate
    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let forecast = build_forecast(&cli, &config);
    info!(points = forecast.len(), "forecast loaded");

    let optimization: BidOptimization = match config.optimize(&forecast) {
        Ok(opt) => opt,
        Err(e) => {
            eprintln!("error: optimization failed: {e}");
            process::exit(1);
        }
    };

    // Print per-price results
    for r in &optimization.results {
        println!("{r}");
    }

    // Print summary
    println!("\n{optimization}");

    // Export CSV if requested
    if let Some(ref path) = cli.grid_out {
        if let Err(e) = export_grid_csv(&optimization.results, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        info!(path = %path, "grid results written");
    }

    // Start API server if requested
    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let state = Arc::new(da_bidding::api::AppState { config });
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(da_bidding::api::serve(state, addr)) {
            eprintln!("error: API server failed: {e}");
            process::exit(1);
        }
    }
}
