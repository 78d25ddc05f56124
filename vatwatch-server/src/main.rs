//! vatwatch: CLI for live VATSIM ATC coverage.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use comfy_table::{Cell, Table};

use vatwatch_core::config::{self, Config};
use vatwatch_core::filter::{PayloadFilter, PrefixFilter};
use vatwatch_core::{
    BoxedFilter, Catalog, Change, Payload, Radar, Reconciler, Result, Role, TrackedAirport,
    WatchError,
};
use vatwatch_server::fetch::{fetch_catalog, fetch_live};
use vatwatch_server::logging::init_logging;
use vatwatch_server::{AutoFetcher, Scheduler, SchedulerConfig, Sources};

#[derive(Parser)]
#[command(name = "vatwatch", version, about = "Live VATSIM ATC coverage tracker")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Config file (default: ~/.vatwatch/config.yaml)
    #[arg(long, global = true, env = "VATWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// VATSpy.dat URL or path
    #[arg(long, global = true, env = "VATWATCH_CATALOG")]
    catalog: Option<String>,

    /// FIRBoundaries.dat URL or path
    #[arg(long, global = true, env = "VATWATCH_BOUNDARIES")]
    boundaries: Option<String>,

    /// Live data feed URL or path
    #[arg(long, global = true, env = "VATWATCH_LIVE")]
    live: Option<String>,

    /// Log filter when RUST_LOG is unset (e.g. "debug", "vatwatch_server=trace")
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Follow coverage changes until interrupted
    Watch {
        /// Queue capacity (default from config)
        #[arg(long)]
        capacity: Option<usize>,

        /// Include airports without any controller
        #[arg(long)]
        all: bool,

        /// Only show these payload types (comma-separated: countries,airports,radars)
        #[arg(long)]
        only: Option<String>,

        /// Only show changes under these ICAO prefixes (comma-separated)
        #[arg(long)]
        prefix: Option<String>,

        /// Print one JSON object per change
        #[arg(long)]
        json: bool,

        /// Live refresh period in seconds (default from config)
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Fetch once and print who is online
    Online,

    /// Parse the catalog and print a summary
    Catalog {
        /// Look up an airport, FIR, UIR or country prefix
        #[arg(long)]
        lookup: Option<String>,
    },

    /// Show the effective configuration
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.log_level.as_deref());

    let config = effective_config(&cli.global);

    let result = match cli.command {
        Commands::Watch {
            capacity,
            all,
            only,
            prefix,
            json,
            interval,
        } => {
            let opts = WatchOptions {
                capacity: capacity.unwrap_or(config.subscription.queue_capacity),
                controlled_only: config.subscription.controlled_only && !all,
                only,
                prefix,
                json,
            };
            let mut config = config;
            if let Some(secs) = interval {
                config.refresh.live_secs = secs;
            }
            cmd_watch(&config, opts).await
        }
        Commands::Online => cmd_online(&config).await,
        Commands::Catalog { lookup } => cmd_catalog(&config, lookup.as_deref()).await,
        Commands::Config { init } => cmd_config(&config, cli.global.config.as_deref(), init),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// File config with command-line overrides applied.
fn effective_config(args: &GlobalArgs) -> Config {
    let mut config = match &args.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };
    if let Some(catalog) = &args.catalog {
        config.sources.catalog = catalog.clone();
    }
    if let Some(boundaries) = &args.boundaries {
        config.sources.boundaries = boundaries.clone();
    }
    if let Some(live) = &args.live {
        config.sources.live = live.clone();
    }
    config
}

// ---------------------------------------------------------------------------
// watch
// ---------------------------------------------------------------------------

struct WatchOptions {
    capacity: usize,
    controlled_only: bool,
    only: Option<String>,
    prefix: Option<String>,
    json: bool,
}

fn build_filters(opts: &WatchOptions) -> Result<Vec<BoxedFilter>> {
    let mut filters: Vec<BoxedFilter> = Vec::new();
    if let Some(list) = &opts.only {
        let filter = PayloadFilter::from_list(list)
            .ok_or_else(|| WatchError::Config(format!("unknown payload type in '{list}'")))?;
        filters.push(Box::new(filter));
    }
    if let Some(list) = &opts.prefix {
        let prefixes = list
            .split(',')
            .map(|p| p.trim().to_ascii_uppercase())
            .filter(|p| !p.is_empty());
        filters.push(Box::new(PrefixFilter::new(prefixes)));
    }
    Ok(filters)
}

async fn cmd_watch(config: &Config, opts: WatchOptions) -> Result<()> {
    let filters = build_filters(&opts)?;
    let scheduler = Scheduler::start(
        SchedulerConfig::from(config),
        Arc::new(AutoFetcher::new()),
    );
    let mut subscription = scheduler.subscribe(opts.capacity, opts.controlled_only, filters);

    tracing::info!(
        catalog = %config.sources.catalog,
        live = %config.sources.live,
        live_secs = config.refresh.live_secs,
        "watching, press Ctrl-C to stop"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            change = subscription.recv() => match change {
                Some(change) if opts.json => print_json(&change)?,
                Some(change) => println!("{}", describe(&change)),
                None => break,
            },
        }
    }

    scheduler.shutdown().await;
    if subscription.dropped() > 0 {
        eprintln!("{} changes dropped (queue full)", subscription.dropped());
    }
    Ok(())
}

fn print_json(change: &Change) -> Result<()> {
    let line = serde_json::to_string(change).map_err(WatchError::Decode)?;
    println!("{line}");
    Ok(())
}

/// One-line human description of a change.
fn describe(change: &Change) -> String {
    let detail = match &change.payload {
        Payload::Country(c) => format!("{} ({})", c.name, c.prefix),
        Payload::Airport(a) => {
            let roles = staffed_roles(a);
            if roles.is_empty() {
                format!("{} {}", a.icao(), a.airport.name)
            } else {
                format!("{} {} [{roles}]", a.icao(), a.airport.name)
            }
        }
        Payload::Radar(r) => format!("{} {} [{}]", r.callsign(), r.name, fir_list(r)),
    };
    format!(
        "{:<6} {:<7} {detail}",
        change.kind.to_string().to_uppercase(),
        change.payload.type_name()
    )
}

fn staffed_roles(airport: &TrackedAirport) -> String {
    airport
        .controllers
        .iter()
        .map(|c| c.role.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn fir_list(radar: &Radar) -> String {
    radar
        .firs
        .iter()
        .map(|f| f.id.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

// ---------------------------------------------------------------------------
// online
// ---------------------------------------------------------------------------

async fn cmd_online(config: &Config) -> Result<()> {
    let fetcher = AutoFetcher::new();
    let sources = Sources::from(&config.sources);
    let catalog = fetch_catalog(&fetcher, &sources).await?;
    let live = fetch_live(&fetcher, &sources).await?;

    let mut reconciler = Reconciler::new(true);
    reconciler.process_static(&catalog);
    let pass = reconciler.process_dynamic(&live, &catalog);
    for miss in &pass.misses {
        tracing::warn!(callsign = %miss.callsign, kind = ?miss.kind, "{miss}");
    }

    let state = reconciler.state();
    println!();
    println!(
        "Controllers: {} online, {} ATIS, {} airports staffed, {} radars",
        live.controllers().len(),
        live.atis().len(),
        state.airports.len(),
        state.radars.len()
    );
    println!();

    if !state.airports.is_empty() {
        let mut table = Table::new();
        let mut header = vec!["ICAO".to_string(), "Name".to_string()];
        header.extend(Role::ALL.iter().map(|r| r.to_string()));
        table.set_header(header);

        for airport in state.airports.values() {
            let mut row = vec![Cell::new(airport.icao()), Cell::new(&airport.airport.name)];
            for role in Role::ALL {
                let callsign = airport
                    .controllers
                    .slot(role)
                    .as_ref()
                    .map(|c| c.callsign())
                    .unwrap_or("-");
                row.push(Cell::new(callsign));
            }
            table.add_row(row);
        }
        println!("{table}");
    }

    if !state.radars.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Callsign", "Name", "Frequency", "FIRs"]);
        for radar in state.radars.values() {
            table.add_row(vec![
                Cell::new(radar.callsign()),
                Cell::new(&radar.name),
                Cell::new(&radar.controller.frequency),
                Cell::new(fir_list(radar)),
            ]);
        }
        println!("{table}");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// catalog
// ---------------------------------------------------------------------------

async fn cmd_catalog(config: &Config, lookup: Option<&str>) -> Result<()> {
    let fetcher = AutoFetcher::new();
    let catalog = fetch_catalog(&fetcher, &Sources::from(&config.sources)).await?;

    println!();
    println!("Catalog: {}", config.sources.catalog);
    println!();
    println!("  Countries:  {}", catalog.countries().len());
    println!("  Airports:   {}", catalog.airports().len());
    println!("  FIRs:       {}", catalog.firs().len());
    println!("  UIRs:       {}", catalog.uirs().len());
    println!();

    if let Some(id) = lookup {
        print_lookup(&catalog, &id.to_ascii_uppercase());
    }
    Ok(())
}

fn print_lookup(catalog: &Catalog, id: &str) {
    let mut table = Table::new();
    table.set_header(vec!["Kind", "Id", "Name", "Detail"]);
    let mut found = 0;

    if let Some(a) = catalog.find_airport(id) {
        found += 1;
        table.add_row(vec![
            Cell::new("airport"),
            Cell::new(&a.icao),
            Cell::new(&a.name),
            Cell::new(format!(
                "IATA {} FIR {} ({:.4}, {:.4})",
                if a.iata.is_empty() { "-" } else { &a.iata },
                a.fir_id,
                a.position.lat,
                a.position.lng
            )),
        ]);
    }
    if let Some(f) = catalog.find_fir(id) {
        found += 1;
        table.add_row(vec![
            Cell::new("fir"),
            Cell::new(&f.id),
            Cell::new(&f.name),
            Cell::new(format!("{} boundary points", f.boundaries.points.len())),
        ]);
    }
    if let Some(u) = catalog.find_uir(id) {
        found += 1;
        table.add_row(vec![
            Cell::new("uir"),
            Cell::new(&u.id),
            Cell::new(&u.name),
            Cell::new(u.fir_ids.join(",")),
        ]);
    }
    if let Some(c) = catalog.find_country_by_prefix(id) {
        found += 1;
        table.add_row(vec![
            Cell::new("country"),
            Cell::new(&c.prefix),
            Cell::new(&c.name),
            Cell::new(&c.control_custom_name),
        ]);
    }

    if found == 0 {
        println!("No catalog entry for {id}");
    } else {
        println!("{table}");
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config(config: &Config, path: Option<&std::path::Path>, init: bool) -> Result<()> {
    if init {
        let defaults = Config::default();
        let written = match path {
            Some(path) => {
                config::save_config_to(&defaults, path)?;
                path.to_path_buf()
            }
            None => config::save_config(&defaults)?,
        };
        println!("Wrote {}", written.display());
        return Ok(());
    }

    print!("{}", config::serialize_config(config));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vatwatch_core::{Airport, ChangeKind, Country, Point};

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "vatwatch", "--live", "feed.json", "watch", "--all", "--only", "airports", "--json",
        ])
        .unwrap();
        assert_eq!(cli.global.live.as_deref(), Some("feed.json"));
        assert!(matches!(
            cli.command,
            Commands::Watch { all: true, json: true, .. }
        ));
    }

    #[test]
    fn test_build_filters_rejects_unknown_type() {
        let opts = WatchOptions {
            capacity: 1,
            controlled_only: true,
            only: Some("pilots".into()),
            prefix: None,
            json: false,
        };
        assert!(build_filters(&opts).is_err());
    }

    #[test]
    fn test_describe() {
        let country = Change::new(
            ChangeKind::Add,
            Payload::Country(Country {
                name: "Germany".into(),
                prefix: "ED".into(),
                control_custom_name: String::new(),
            }),
        );
        assert_eq!(describe(&country), "ADD    country Germany (ED)");

        let airport = Change::new(
            ChangeKind::Remove,
            Payload::Airport(TrackedAirport::new(Airport {
                icao: "EDDF".into(),
                name: "Frankfurt".into(),
                position: Point::default(),
                iata: "FRA".into(),
                fir_id: "EDGG".into(),
                is_pseudo: false,
            })),
        );
        assert_eq!(describe(&airport), "REMOVE airport EDDF Frankfurt");
    }
}
