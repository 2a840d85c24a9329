//! GeoNet Simulator CLI
//!
//! Run deterministic sensor network scenarios and check them against the
//! field they sense.

use clap::Parser;
use geonet_sim::{ScenarioId, ScenarioResult, ScenarioRunner, SimConfig, SimExport};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// GeoNet sensor network simulator
#[derive(Parser, Debug)]
#[command(name = "geonet-sim")]
#[command(about = "Run deterministic sensor network scenarios", long_about = None)]
struct Args {
    /// Scenario to run (flood_chain, flood_udg, flood_autotune, flood_gabriel,
    /// static_rain, dynamic_rain, propagating_rain, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Master seed for determinism (0 = random from time)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of consecutive seeds to test
    #[arg(long, default_value = "1")]
    seeds: u64,

    /// Maximum ticks per run
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Sensor population (overrides each scenario's default)
    #[arg(short = 'n', long)]
    sensors: Option<usize>,

    /// Cells per side of the field
    #[arg(long)]
    grid_size: Option<u32>,

    /// Pause between ticks in milliseconds (0 = unpaced)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// JSON config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Export every frame of a single scenario run to a JSON file
    #[arg(long)]
    export: Option<PathBuf>,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Config file (or defaults) with command-line overrides applied.
    fn sim_config(&self) -> Result<SimConfig, geonet_sim::SimError> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_json_file(path)?,
            None => SimConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.seed = if seed == 0 { clock_seed() } else { seed };
        }
        if let Some(ticks) = self.ticks {
            config.max_ticks = ticks;
        }
        if let Some(grid_size) = self.grid_size {
            config.grid_size = grid_size;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.update_interval_ms = interval_ms;
        }
        Ok(config)
    }

    fn scenarios(&self) -> Result<Vec<ScenarioId>, geonet_sim::SimError> {
        if self.scenario == "all" {
            Ok(ScenarioId::all())
        } else {
            Ok(vec![self.scenario.parse()?])
        }
    }
}

fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(1, |elapsed| elapsed.as_nanos() as u64)
}

fn init_logging(verbose: bool) {
    let result = if verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    if let Err(e) = result {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Runs one scenario with frame export and writes the file.
fn run_with_export(runner: &ScenarioRunner, scenario: ScenarioId, path: &Path) -> ScenarioResult {
    let config = runner.config();
    let mut export = SimExport::new(scenario.name(), config.seed, config.grid_size);
    let result = runner.run_recorded(scenario, Some(&mut export));

    match export.write_to_file(path) {
        Ok(()) => info!("Exported {} frames to {}", export.frames.len(), path.display()),
        Err(e) => error!("Failed to write export: {}", e),
    }
    result
}

fn print_summary(results: &[ScenarioResult], json: bool) -> Result<(), serde_json::Error> {
    let total = results.len();
    let failed: Vec<&ScenarioResult> = results.iter().filter(|r| !r.passed).collect();

    if json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed.len(),
            "failed": failed.len(),
            "results": results,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    if failed.is_empty() {
        info!("✅ All {} scenario runs passed!", total);
    } else {
        error!("❌ {}/{} scenario runs failed!", failed.len(), total);
        for result in failed {
            error!(
                "  - {} seed={}: {}",
                result.scenario.name(),
                result.seed,
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let (base_config, scenarios) = match (args.sim_config(), args.scenarios()) {
        (Ok(config), Ok(scenarios)) => (config, scenarios),
        (Err(e), _) | (_, Err(e)) => {
            eprintln!("Error: {}", e);
            let names: Vec<&str> = ScenarioId::all().iter().map(|s| s.name()).collect();
            eprintln!("Available scenarios: {}, all", names.join(", "));
            return ExitCode::FAILURE;
        }
    };

    if !args.json {
        info!("GeoNet Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    if let Some(path) = &args.export {
        if scenarios.len() > 1 || args.seeds > 1 {
            eprintln!("Error: --export only supports a single scenario and seed");
            return ExitCode::FAILURE;
        }

        let runner = ScenarioRunner::new(base_config).with_sensors(args.sensors);
        let result = run_with_export(&runner, scenarios[0], path);
        if let Err(e) = print_summary(std::slice::from_ref(&result), args.json) {
            eprintln!("Error: {}", e);
        }
        return if result.passed {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();
    for seed_offset in 0..args.seeds {
        let config = SimConfig {
            seed: base_config.seed.wrapping_add(seed_offset),
            ..base_config.clone()
        };
        let runner = ScenarioRunner::new(config).with_sensors(args.sensors);

        for scenario in &scenarios {
            let result = runner.run(*scenario);
            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), result.seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        result.seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
            all_results.push(result);
        }
    }

    if let Err(e) = print_summary(&all_results, args.json) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    if all_results.iter().all(|r| r.passed) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
