use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pool_core::config::{FareConfig, MatcherConfig, RoutingConfig};
use pool_core::polyline;
use pool_core::service::{
    parse_request, EstimateFareRequest, MatchRouteRequest, OptimizeRouteRequest,
    RoutePoolService, ServiceConfig, ServiceError,
};
use pool_core::Coordinate;
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "routepool",
    version,
    about = "Match passengers to shared driver routes",
    long_about = "Runs ride-pooling requests through the route matcher, route optimizer\n\
                  and fare estimator. Requests and responses are JSON."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Routes whose estimated detour exceeds this many minutes are excluded
    #[arg(long, global = true, env = "MAX_DETOUR_MINUTES", default_value_t = 15)]
    max_detour_minutes: u32,

    /// Reserved threshold, carried in the matcher configuration
    #[arg(long, global = true, env = "MIN_EXTRA_TIME_MINUTES", default_value_t = 5)]
    min_extra_time_minutes: u32,

    /// Maximum distance from pickup and dropoff to the route, in km
    #[arg(long, global = true, env = "MAX_PICKUP_RADIUS_KM", default_value_t = 2.0)]
    max_pickup_radius_km: f64,

    /// OSRM endpoint used when the `osrm` feature is enabled
    #[arg(long, global = true, env = "OSRM_API_URL")]
    osrm_url: Option<String>,

    /// Mapbox token; takes precedence over OSRM when set
    #[arg(long, global = true, env = "MAPBOX_ACCESS_TOKEN", hide_env_values = true)]
    mapbox_token: Option<String>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank candidate routes for a passenger
    Match {
        /// JSON request file, or `-` for stdin
        #[arg(long, default_value = "-")]
        request: PathBuf,
    },
    /// Build a route through start, waypoints and end
    Optimize {
        /// JSON request file, or `-` for stdin
        #[arg(long, default_value = "-")]
        request: PathBuf,
    },
    /// Estimate a fare from distance and duration
    Fare {
        #[arg(long)]
        distance_km: f64,
        #[arg(long)]
        duration_minutes: f64,
        /// 1.0 = normal demand; clamped to the surge range
        #[arg(long)]
        demand_factor: Option<f64>,
    },
    /// Encode `lat,lng;lat,lng` points into a polyline
    Encode {
        #[arg(long)]
        points: String,
    },
    /// Decode a polyline into points
    Decode {
        #[arg(long)]
        polyline: String,
    },
    /// Print service health
    Health,
}

// ── Entry point ────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(value) => {
            println!("{value}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let code = match err.downcast_ref::<ServiceError>() {
                Some(service_err) => exit_code_for(service_err.status_code()),
                None => 1,
            };
            println!("{}", json!({ "error": format!("{err:#}") }));
            ExitCode::from(code)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // stdout carries the JSON response; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// 4xx client errors exit with 2, unprocessable input with 3, the rest with 1.
fn exit_code_for(status: u16) -> u8 {
    match status {
        422 => 3,
        400..=499 => 2,
        _ => 1,
    }
}

fn run(cli: &Cli) -> Result<Value> {
    match &cli.command {
        Commands::Health => to_json(build_service(cli)?.health()),
        Commands::Match { request } => {
            let request: MatchRouteRequest = parse_request(&read_request(request)?)?;
            to_json(build_service(cli)?.match_route(&request)?)
        }
        Commands::Optimize { request } => {
            let request: OptimizeRouteRequest = parse_request(&read_request(request)?)?;
            to_json(build_service(cli)?.optimize_route(&request)?)
        }
        Commands::Fare {
            distance_km,
            duration_minutes,
            demand_factor,
        } => {
            let request = EstimateFareRequest {
                distance_km: Some(*distance_km),
                duration_minutes: Some(*duration_minutes),
                demand_factor: *demand_factor,
                ..Default::default()
            };
            to_json(build_service(cli)?.estimate_fare(&request)?)
        }
        Commands::Encode { points } => {
            let coordinates = parse_points(points)?;
            Ok(json!({ "polyline": polyline::encode(&coordinates) }))
        }
        Commands::Decode { polyline: encoded } => {
            let points = polyline::decode(encoded)
                .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
            Ok(json!({ "points": points }))
        }
    }
}

fn build_service(cli: &Cli) -> Result<RoutePoolService> {
    let defaults = RoutingConfig::default();
    let config = ServiceConfig {
        matcher: MatcherConfig {
            max_detour_minutes: cli.max_detour_minutes,
            min_extra_time_minutes: cli.min_extra_time_minutes,
            max_pickup_radius_km: cli.max_pickup_radius_km,
        },
        fares: FareConfig::from_env().context("invalid fare configuration")?,
        routing: RoutingConfig {
            osrm_endpoint: non_blank(&cli.osrm_url).unwrap_or_else(|| defaults.osrm_endpoint.clone()),
            mapbox_token: non_blank(&cli.mapbox_token),
            ..defaults
        },
    };
    debug!(matcher = ?config.matcher, "building service");
    RoutePoolService::from_config(&config).context("service failed to start")
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn read_request(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut body = String::new();
        io::stdin()
            .read_to_string(&mut body)
            .context("failed to read request from stdin")?;
        return Ok(body);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Parse `lat,lng;lat,lng` into coordinates.
fn parse_points(raw: &str) -> Result<Vec<Coordinate>, ServiceError> {
    raw.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (lat, lng) = pair
                .split_once(',')
                .ok_or_else(|| ServiceError::InvalidInput(format!("expected lat,lng: {pair:?}")))?;
            let parse = |v: &str| {
                v.trim()
                    .parse::<f64>()
                    .map_err(|err| ServiceError::InvalidInput(format!("{v:?}: {err}")))
            };
            Ok(Coordinate::new(parse(lat)?, parse(lng)?))
        })
        .collect()
}

fn to_json(value: impl serde::Serialize) -> Result<Value> {
    serde_json::to_value(value).map_err(|err| ServiceError::Internal(err.to_string()).into())
}
