//! fleet-sim entry point: CLI wiring, logging, and runtime start-up.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fleet_sim::config::ServiceConfig;
use fleet_sim::devices::ModelCatalog;
use fleet_sim::io::export::export_consumption_csv;
use fleet_sim::sim::FleetRuntime;
use fleet_sim::store::{DeviceId, MemoryStore};

/// Device fleet simulator with crash recovery and periodic consumption snapshots.
#[derive(Parser)]
#[command(name = "fleet-sim", version, about)]
struct Cli {
    /// Load configuration from a TOML file
    #[arg(long, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Use a built-in preset (demo, empty)
    #[arg(long)]
    preset: Option<String>,

    /// Wall-clock seconds to run before shutting down
    #[arg(long, default_value_t = 10)]
    duration_secs: u64,

    /// Export stored consumption history to CSV on shutdown
    #[arg(long)]
    consumption_out: Option<PathBuf>,

    /// Serve the REST API until Ctrl-C instead of running for a fixed duration
    #[cfg(feature = "api")]
    #[arg(long)]
    serve: bool,

    /// API server port (overrides `[api] port`)
    #[cfg(feature = "api")]
    #[arg(long)]
    port: Option<u16>,
}

fn load_config(cli: &Cli) -> ServiceConfig {
    let loaded = if let Some(ref path) = cli.config {
        ServiceConfig::from_toml_file(path)
    } else if let Some(ref name) = cli.preset {
        ServiceConfig::from_preset(name)
    } else {
        Ok(ServiceConfig::demo())
    };
    loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    })
}

fn main() {
    let cli = Cli::parse();
    let cfg = load_config(&cli);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.filter)),
        )
        .init();

    let catalog = Arc::new(ModelCatalog::new());
    let errors = cfg.validate(&catalog);
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    let store = Arc::new(MemoryStore::with_records(cfg.device_records()));
    let runtime = FleetRuntime::start(
        cfg.scheduler.settings(),
        cfg.persistence.interval(),
        store.clone(),
        catalog.clone(),
    )
    .unwrap_or_else(|e| {
        error!(error = %e, "cannot start fleet runtime");
        process::exit(1);
    });
    let report = runtime.recovery();
    info!(
        restored = report.restored,
        failed = report.failed,
        simulating = runtime.registry().count(),
        "fleet runtime started"
    );

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;

        let state = Arc::new(fleet_sim::api::AppState {
            lifecycle: Arc::clone(runtime.lifecycle()),
            catalog,
        });
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port.unwrap_or(cfg.api.port)));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(fleet_sim::api::serve(state, addr)) {
            error!(%addr, error = %e, "API server failed");
        }
        finish(runtime, &store, cli.consumption_out.as_deref());
        return;
    }

    info!(seconds = cli.duration_secs, "running");
    thread::sleep(Duration::from_secs(cli.duration_secs));
    finish(runtime, &store, cli.consumption_out.as_deref());
}

/// Prints final readings, stops the runtime, and exports history if requested.
fn finish(runtime: FleetRuntime, store: &MemoryStore, out: Option<&std::path::Path>) {
    for id in runtime.registry().snapshot_ids() {
        if let Some(m) = runtime.lifecycle().get_measurements(&id) {
            println!(
                "{id:<16} power={:>9.2} W  energy={:>10.6} kWh  on={}",
                m.power_w, m.energy_kwh, m.powered_on
            );
        }
    }
    runtime.shutdown();

    if let Some(path) = out {
        let ids: Vec<DeviceId> = store.all().into_iter().map(|r| r.device_id).collect();
        if let Err(e) = export_consumption_csv(store, &ids, path) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Consumption history written to {}", path.display());
    }
}
