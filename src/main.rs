//! CLI entry point for the GTFS-RT lookup tool.
//!
//! Each invocation answers one query: static trips or departures for a date
//! and time, live vehicles matched from a freshly fetched GTFS-RT snapshot,
//! or both.

use anyhow::Result;
use chrono::{NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use gtfs_rt_lookup::{
    config::Config,
    correlate::{CorrelationMatch, Filter, correlate},
    departures::{Departure, upcoming},
    error::FetchError,
    fetch::{BasicClient, FETCH_TIMEOUT, fetch_feed},
    fleet::{FleetVehicle, find_vehicles, load_roster},
    gtfs_rt::FeedMessage,
    output::{
        MatchView, describe_departures, describe_trip_schedule, describe_trip_update,
        describe_vehicle, log_snapshot, print_json,
    },
    schedule::{ScheduleIndex, TripSchedule},
    static_data::StaticScheduleStore,
    stats::{MatchSummary, SnapshotStats},
};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Static trips listed per route query.
const STATIC_TRIPS_SHOWN: usize = 10;
/// Realtime matches listed per route query.
const ROUTE_MATCHES_SHOWN: usize = 50;
/// Fleet entries listed by `fleet`.
const FLEET_SHOWN: usize = 50;

#[derive(Parser)]
#[command(name = "gtfs_rt_lookup")]
#[command(about = "Point-in-time queries over a GTFS schedule and its GTFS-RT feed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory containing the GTFS static files (overrides GTFS_DIR)
    #[arg(long, global = true)]
    gtfs_dir: Option<PathBuf>,

    /// GTFS-RT endpoint (overrides GTFS_RT_URL)
    #[arg(long, global = true)]
    feed_url: Option<String>,

    /// Fleet roster file (overrides FLEET_FILE)
    #[arg(long, global = true)]
    fleet_file: Option<PathBuf>,

    /// Which data to query
    #[arg(short, long, value_enum, default_value_t = Source::Both, global = true)]
    source: Source,

    /// Service date, YYYY-MM-DD (default: today in the feed timezone)
    #[arg(short, long, global = true)]
    date: Option<NaiveDate>,

    /// Query time, HH:MM (default: 00:00)
    #[arg(short, long, value_parser = parse_hhmm, global = true)]
    time: Option<NaiveTime>,

    /// Emit results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Trips and live vehicles of a route
    Route {
        /// Route short name or route_id (substring match)
        query: String,

        /// Index of the route to use when several match
        #[arg(long, default_value_t = 0)]
        pick: usize,
    },
    /// Live position of a vehicle by garage number or registration
    Vehicle {
        #[arg(value_name = "GARAGE_OR_REGISTRATION")]
        id: String,
    },
    /// Departures and live trips at a stop id
    Stop { stop_id: String },
    /// Departures and live trips at a stop found by name
    StopName {
        /// Part of the stop name
        query: String,

        /// Index of the stop to use when several match
        #[arg(long, default_value_t = 0)]
        pick: usize,
    },
    /// List the fleet roster
    Fleet,
    /// List the service ids active on the query date
    Services,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    Realtime,
    Static,
    Both,
}

impl Source {
    fn includes_static(self) -> bool {
        self != Source::Realtime
    }

    fn includes_realtime(self) -> bool {
        self != Source::Static
    }
}

fn parse_hhmm(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|e| format!("expected HH:MM: {e}"))
}

/// Everything one query needs, loaded once at startup.
struct Context {
    config: Config,
    store: StaticScheduleStore,
    roster: Vec<FleetVehicle>,
    date: NaiveDate,
    time: NaiveTime,
    source: Source,
    json: bool,
}

enum StaticPart {
    Trips(String),
    Departures(String),
}

#[derive(Serialize, Default)]
struct Report<'a> {
    title: String,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fleet: Option<Vec<&'a FleetVehicle>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    static_trips: Option<Vec<TripSchedule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    departures: Option<Vec<Departure>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    realtime: Option<Vec<MatchView<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<MatchSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    realtime_error: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gtfs_rt_lookup.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gtfs_rt_lookup.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(dir) = cli.gtfs_dir {
        config.gtfs_dir = dir;
    }
    if let Some(url) = cli.feed_url {
        config.feed_url = url;
    }
    if let Some(path) = cli.fleet_file {
        config.fleet_file = path;
    }

    let roster = load_roster(&config.fleet_file).unwrap_or_else(|e| {
        warn!(path = %config.fleet_file.display(), error = %e, "Fleet roster unreadable");
        Vec::new()
    });

    let store = match cli.command {
        Commands::Fleet => StaticScheduleStore::default(),
        _ => StaticScheduleStore::load_dir(&config.gtfs_dir),
    };

    let ctx = Context {
        date: cli
            .date
            .unwrap_or_else(|| Utc::now().with_timezone(&config.timezone).date_naive()),
        time: cli.time.unwrap_or(NaiveTime::MIN),
        source: cli.source,
        json: cli.json,
        config,
        store,
        roster,
    };

    match cli.command {
        Commands::Route { query, pick } => route_query(&ctx, &query, pick).await,
        Commands::Vehicle { id } => vehicle_query(&ctx, &id).await,
        Commands::Stop { stop_id } => {
            let title = format!("Stop {} ({stop_id})", ctx.store.stop_name(&stop_id));
            run_query(&ctx, title, StaticPart::Departures(stop_id.clone()), Filter::ByStop(stop_id), None).await
        }
        Commands::StopName { query, pick } => stop_name_query(&ctx, &query, pick).await,
        Commands::Fleet => fleet_listing(&ctx),
        Commands::Services => services_listing(&ctx),
    }
}

#[tracing::instrument(skip(ctx))]
async fn route_query(ctx: &Context, query: &str, pick: usize) -> Result<()> {
    let routes = ctx.store.find_routes(query);
    if routes.is_empty() {
        return nothing_found(ctx, format!("Route {query}"), "Route not found in routes.txt.");
    }
    if routes.len() > 1 && !ctx.json {
        for (i, r) in routes.iter().enumerate() {
            println!("[{i}] {} {} {}", r.route_id, r.short_name, r.long_name);
        }
    }
    let Some(route) = routes.get(pick) else {
        return nothing_found(ctx, format!("Route {query}"), &format!("Invalid index {pick}."));
    };

    info!(route_id = %route.route_id, "Route selected");
    let label = if route.short_name.is_empty() { &route.route_id } else { &route.short_name };
    run_query(
        ctx,
        format!("Route {label}"),
        StaticPart::Trips(route.route_id.clone()),
        Filter::ByRoute(route.route_id.clone()),
        Some(ROUTE_MATCHES_SHOWN),
    )
    .await
}

#[tracing::instrument(skip(ctx))]
async fn stop_name_query(ctx: &Context, query: &str, pick: usize) -> Result<()> {
    let stops = ctx.store.find_stops_by_name(query);
    if stops.is_empty() {
        return nothing_found(ctx, format!("Stop {query}"), "No stops match the query.");
    }
    if stops.len() > 1 && !ctx.json {
        println!("Several stops found:");
        for (i, s) in stops.iter().enumerate() {
            println!("[{i}] {} - {}", s.stop_id, s.name);
        }
    }
    let Some(stop) = stops.get(pick) else {
        return nothing_found(ctx, format!("Stop {query}"), &format!("Invalid index {pick}."));
    };

    run_query(
        ctx,
        format!("Stop {} ({})", stop.name, stop.stop_id),
        StaticPart::Departures(stop.stop_id.clone()),
        Filter::ByStop(stop.stop_id.clone()),
        None,
    )
    .await
}

#[tracing::instrument(skip(ctx))]
async fn vehicle_query(ctx: &Context, id: &str) -> Result<()> {
    let found = find_vehicles(&ctx.roster, id);

    if !ctx.json {
        print_title(&format!("Vehicle search: {id}"));
        if found.is_empty() {
            println!("Vehicle not found in the fleet roster.");
        }
        for v in &found {
            println!(" Garage number: {}", v.garage_number.as_deref().unwrap_or("-"));
            println!(" Registration: {}", v.registration.as_deref().unwrap_or("-"));
            println!(" Model: {}", v.model);
            println!("{}", "-".repeat(40));
        }
    }

    let feed = fetch_if_wanted(ctx).await;
    let matches = correlated(ctx, &feed, &Filter::ByVehicle(id.to_string()));

    let report = Report {
        title: format!("Vehicle {id}"),
        fleet: Some(found),
        ..realtime_report(&feed, matches.as_deref())
    };
    if ctx.json {
        return print_json(&report);
    }
    print_realtime(ctx, &report, matches.as_deref(), None);
    Ok(())
}

/// Reports a search that resolved to nothing. With `--json` the message goes
/// to the log and stdout still carries a report, with no results.
fn nothing_found(ctx: &Context, title: String, message: &str) -> Result<()> {
    if ctx.json {
        warn!(%title, "{message}");
        return print_json(&empty_report(title, ctx.date, ctx.time));
    }
    println!("{message}");
    Ok(())
}

fn empty_report(title: String, date: NaiveDate, time: NaiveTime) -> Report<'static> {
    Report {
        title,
        date: Some(date),
        time: Some(time),
        ..Default::default()
    }
}

/// Runs the static part for the query date, then the realtime part, and
/// prints both. A realtime failure never hides the static results.
async fn run_query(
    ctx: &Context,
    title: String,
    static_part: StaticPart,
    filter: Filter,
    shown: Option<usize>,
) -> Result<()> {
    let mut static_trips = None;
    let mut departures = None;

    if ctx.source.includes_static() {
        let active = ctx.store.active_services(ctx.date);
        info!(date = %ctx.date, active_services = active.len(), "Calendar resolved");

        match static_part {
            StaticPart::Trips(route_id) => {
                let index = ScheduleIndex::build(
                    &route_id,
                    &active,
                    ctx.store.trips(),
                    ctx.store.stop_times(),
                    ctx.store.stops(),
                );
                static_trips = Some(index.into_trips());
            }
            StaticPart::Departures(stop_id) => {
                departures = Some(upcoming(
                    &stop_id,
                    ctx.time,
                    ctx.store.stop_times(),
                    ctx.store.trips(),
                    &active,
                ));
            }
        }
    }

    let feed = fetch_if_wanted(ctx).await;
    let matches = correlated(ctx, &feed, &filter);

    let report = Report {
        title,
        date: Some(ctx.date),
        time: Some(ctx.time),
        static_trips,
        departures,
        ..realtime_report(&feed, matches.as_deref())
    };

    if ctx.json {
        return print_json(&report);
    }

    print_title(&report.title);
    if let Some(trips) = &report.static_trips {
        println!("Static trips ({}): {}", ctx.date, trips.len());
        for trip in trips.iter().take(STATIC_TRIPS_SHOWN) {
            println!("{}", describe_trip_schedule(trip));
        }
    }
    if let Some(deps) = &report.departures {
        println!("Static schedule from {}:", ctx.time.format("%H:%M"));
        if deps.is_empty() {
            println!(" No departures.");
        }
        for line in describe_departures(deps) {
            println!("{line}");
        }
    }
    print_realtime(ctx, &report, matches.as_deref(), shown);
    Ok(())
}

async fn fetch_if_wanted(ctx: &Context) -> Option<Result<FeedMessage, FetchError>> {
    if !ctx.source.includes_realtime() {
        return None;
    }
    Some(fetch_snapshot(&ctx.config.feed_url).await)
}

async fn fetch_snapshot(url: &str) -> Result<FeedMessage, FetchError> {
    let client = BasicClient::new(FETCH_TIMEOUT)?;
    let feed = fetch_feed(&client, url).await?;
    log_snapshot(&SnapshotStats::from_feed(&feed));
    Ok(feed)
}

fn correlated<'a>(
    ctx: &Context,
    feed: &'a Option<Result<FeedMessage, FetchError>>,
    filter: &Filter,
) -> Option<Vec<CorrelationMatch<'a>>> {
    match feed {
        Some(Ok(feed)) => {
            let matches = correlate(feed, &ctx.store.trip_to_route(), filter);
            info!(matches = matches.len(), "Realtime entities correlated");
            Some(matches)
        }
        Some(Err(e)) => {
            error!(error = %e, "Realtime fetch failed");
            None
        }
        None => None,
    }
}

fn realtime_report<'a>(
    feed: &Option<Result<FeedMessage, FetchError>>,
    matches: Option<&[CorrelationMatch<'a>]>,
) -> Report<'a> {
    Report {
        realtime: matches.map(|m| m.iter().map(MatchView::from).collect()),
        summary: matches.map(MatchSummary::from_matches),
        realtime_error: match feed {
            Some(Err(e)) => Some(e.to_string()),
            _ => None,
        },
        ..Default::default()
    }
}

fn print_realtime(ctx: &Context, report: &Report<'_>, matches: Option<&[CorrelationMatch<'_>]>, shown: Option<usize>) {
    if let Some(e) = &report.realtime_error {
        println!("\nRealtime unavailable: {e}");
    }
    let Some(matches) = matches else {
        return;
    };

    println!("\nRealtime entities: {}", matches.len());
    let stop_names = ctx.store.stop_names();
    for m in matches.iter().take(shown.unwrap_or(usize::MAX)) {
        println!("\nEntity {} trip {}", m.entity_id, m.trip_id.unwrap_or("-"));
        if let Some(tu) = m.trip_update {
            for line in describe_trip_update(tu, &stop_names, ctx.config.timezone) {
                println!("{line}");
            }
        }
        if let Some(veh) = m.vehicle {
            for line in describe_vehicle(veh, &ctx.roster, ctx.config.timezone) {
                println!("{line}");
            }
        }
    }

    if let Some(summary) = report.summary {
        println!("\nGPS-equipped vehicles: {}", summary.gps_equipped);
        println!("Scheduled trips without GPS: {}", summary.scheduled_without_gps);
    }
}

fn fleet_listing(ctx: &Context) -> Result<()> {
    if ctx.json {
        return print_json(&ctx.roster);
    }

    print_title("Fleet roster");
    if ctx.roster.is_empty() {
        println!("Fleet roster {} is missing or empty.", ctx.config.fleet_file.display());
        return Ok(());
    }
    println!("Entries: {}", ctx.roster.len());
    for v in ctx.roster.iter().take(FLEET_SHOWN) {
        println!(
            " {} / {} / {}",
            v.garage_number.as_deref().unwrap_or("-"),
            v.registration.as_deref().unwrap_or("-"),
            v.model
        );
    }
    Ok(())
}

fn services_listing(ctx: &Context) -> Result<()> {
    let mut services: Vec<String> = ctx.store.active_services(ctx.date).into_iter().collect();
    services.sort();

    if ctx.json {
        return print_json(&services);
    }

    print_title(&format!("Active services on {}", ctx.date));
    if services.is_empty() {
        println!(" None.");
    }
    for service_id in &services {
        println!(" {service_id}");
    }
    Ok(())
}

fn print_title(title: &str) {
    println!("\n{}", "=".repeat(70));
    println!("  {title}");
    println!("{}", "=".repeat(70));
}
