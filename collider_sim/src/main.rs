//! Collider Simulator CLI
//!
//! Run the strip-partitioned collider on in-process workers.

use clap::Parser;
use collider_sim::scenarios::ScenarioId;
use collider_sim::{ScenarioResult, ScenarioRunner, SimConfig};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Strip-partitioned circle collider
#[derive(Parser, Debug)]
#[command(name = "collider-sim")]
#[command(about = "Run the strip-partitioned circle collider", long_about = None)]
struct Args {
    /// JSON configuration file (flags below override it)
    #[arg(short, long)]
    config: Option<String>,

    /// Master seed for seeded scenes (0 = random from time)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of random seeds to run (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Number of workers (strips)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Scenario to run (head_on, drift, random, thermal, all)
    #[arg(short = 'S', long)]
    scene: Option<String>,

    /// Bodies requested by seeded scenes
    #[arg(short, long)]
    bodies: Option<usize>,

    /// Velocity spread of the thermal scene
    #[arg(long)]
    temperature: Option<f64>,

    /// Simulated time at which the run stops
    #[arg(long)]
    t_max: Option<f64>,

    /// Time step
    #[arg(long)]
    dt: Option<f64>,

    /// Verbose output (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export recorded frames to a JSON file
    #[arg(long)]
    export: Option<String>,
}

impl Args {
    /// Loads the configuration file, if any, and applies the flags.
    fn sim_config(&self) -> Result<SimConfig, collider_sim::SimError> {
        let mut config = match &self.config {
            Some(path) => SimConfig::from_json_file(path)?,
            None => SimConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(bodies) = self.bodies {
            config.body_count = bodies;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if let Some(t_max) = self.t_max {
            config.world.t_max = t_max;
        }
        if let Some(dt) = self.dt {
            config.world.dt = dt;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging; RUST_LOG overrides --verbose
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("Collider Simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let base_config = args.sim_config().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = match args.scene.as_deref() {
        Some("all") => ScenarioId::all(),
        Some(name) => vec![name.parse().unwrap_or_else(|e| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: head_on, drift, random, thermal, all");
            std::process::exit(1);
        })],
        None => vec![base_config.scene],
    };

    // Determine base seed
    let base_seed = if base_config.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(1)
    } else {
        base_config.seed
    };

    if args.export.is_some() && (scenarios.len() > 1 || args.seeds > 1) {
        eprintln!("Error: --export only supports a single scenario and seed");
        std::process::exit(1);
    }

    // Track results
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);

        for scenario in &scenarios {
            // Unseeded scenes are identical for every seed
            if seed_offset > 0 && !scenario.is_seeded() {
                continue;
            }

            let config = SimConfig {
                seed,
                scene: *scenario,
                ..base_config.clone()
            };

            let mut runner = ScenarioRunner::new(config);
            if let Some(path) = &args.export {
                runner = runner.with_export(path);
            }

            let result = match runner.run().await {
                Ok(result) => result,
                Err(e) => {
                    error!("✗ {} (seed={}) could not run: {}", scenario, seed, e);
                    std::process::exit(1);
                }
            };

            if !args.json {
                if result.passed {
                    info!(
                        "✓ {} (seed={}) PASSED: {} steps, {} bodies, {} hand-offs, {} buffer collisions",
                        scenario,
                        seed,
                        result.total_steps,
                        result.final_bodies,
                        result.totals.adopted,
                        result.totals.boundary_collisions
                    );
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario,
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results,
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} runs passed!", total);
        } else {
            error!("❌ {}/{} runs failed!", failed_count, total);

            for result in all_results.iter().filter(|r| !r.passed) {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario,
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
