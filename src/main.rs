//! tri-evolve CLI - Approximate an image with evolved triangles.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tri_evolve::{
    compute::{Frame, create_renderer, evolution::{Annealer, Solver}},
    io::{FileImageSource, ImageError, ImageSource, LogSink, ResultSink, SnapshotSink, save_png},
    schema::{AnnealingConfig, ChromosomeSnapshot, IterationResult, RunLimits, SolverConfig},
};

/// Longer side of the working image; larger inputs are downscaled.
const DEFAULT_MAX_DIMENSION: u32 = 256;

/// Logs progress and optionally writes snapshot frames.
struct CliSink {
    log: LogSink,
    snapshots: Option<SnapshotSink>,
}

impl ResultSink for CliSink {
    fn consume(&mut self, result: &IterationResult, frame: &Frame) -> Result<(), ImageError> {
        self.log.consume(result, frame)?;
        if let Some(snapshots) = self.snapshots.as_mut() {
            snapshots.consume(result, frame)?;
        }
        Ok(())
    }
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let mut args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print_example_config();
        return;
    }

    let anneal = take_flag(&mut args, "--anneal");
    let snapshot_dir = take_option(&mut args, "--snapshots").map(PathBuf::from);

    if args.len() < 2 {
        eprintln!(
            "Usage: {} <image> [config.json] [generations] [--anneal] [--snapshots DIR]",
            args[0]
        );
        eprintln!();
        eprintln!("Approximate an image with a population of translucent triangles.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  image        Target image (png, jpeg, bmp, gif)");
        eprintln!("  config.json  Solver configuration (default: built-in)");
        eprintln!("  generations  Number of generations (default: 1000)");
        eprintln!("  --anneal     Use single-chromosome simulated annealing instead");
        eprintln!("  --snapshots  Write the best image of every 50th generation to DIR");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    let image_path = PathBuf::from(&args[1]);
    let config_path = args.get(2).filter(|a| a.ends_with(".json")).map(PathBuf::from);
    let generations: Option<usize> = args
        .iter()
        .skip(2)
        .find_map(|s| s.parse().ok());

    // Load target image
    let target = FileImageSource::with_max_dimension(DEFAULT_MAX_DIMENSION)
        .load(&image_path)
        .unwrap_or_else(|e| {
            eprintln!("Error loading image: {}", e);
            std::process::exit(1);
        });
    let target = Arc::new(target);

    if anneal {
        let config: AnnealingConfig = read_config(config_path.as_deref());
        run_annealing(config, target, &image_path, generations.unwrap_or(10_000) as u64);
    } else {
        let config: SolverConfig = read_config(config_path.as_deref());
        let limits = RunLimits {
            max_generations: generations.unwrap_or(1000),
            ..Default::default()
        };
        run_solver(config, limits, target, &image_path, snapshot_dir);
    }
}

fn run_solver(
    config: SolverConfig,
    limits: RunLimits,
    target: Arc<Frame>,
    image_path: &Path,
    snapshot_dir: Option<PathBuf>,
) {
    println!("Triangle Evolution");
    println!("==================");
    println!("Target: {}x{}", target.width(), target.height());
    println!(
        "Population: {} x {} triangles",
        config.population_size, config.genome_size
    );
    println!(
        "Strategies: {} / {} (cleansing rate {})",
        config.selection_type, config.crossover_type, config.cleansing_rate
    );
    println!("Generations: {}", limits.max_generations);
    println!();

    let renderer = create_renderer(config.renderer, config.background).unwrap_or_else(|e| {
        eprintln!("Error creating renderer: {}", e);
        std::process::exit(1);
    });

    let mut solver = Solver::new(config, target, renderer).unwrap_or_else(|e| {
        eprintln!("Error creating solver: {}", e);
        std::process::exit(1);
    });

    let snapshots = snapshot_dir.map(|dir| {
        SnapshotSink::new(dir, 50).unwrap_or_else(|e| {
            eprintln!("Error creating snapshot directory: {}", e);
            std::process::exit(1);
        })
    });
    let mut sink = CliSink {
        log: LogSink::new((limits.max_generations / 20).max(1)),
        snapshots,
    };

    let result = solver
        .run_with_callback(&limits, &mut sink)
        .unwrap_or_else(|e| {
            eprintln!("Error during evolution: {}", e);
            std::process::exit(1);
        });

    println!("Stopped: {:?}", result.stats.stop_reason);
    println!(
        "  Generations: {} ({:.1} gen/s)",
        result.stats.generations, result.stats.generations_per_second
    );
    println!("  Renders: {}", result.stats.total_renders);
    println!(
        "  Best fitness: {:.6} (MSE {:.2}, generation {})",
        result.stats.best_fitness, result.stats.best_mse, result.best.generation
    );
    println!("  Final mean fitness: {:.6}", result.stats.final_mean_fitness);
    println!("  Time: {:.2}s", result.stats.elapsed_seconds);

    write_outputs(image_path, solver.elite_frame(), &result.best);
    solver.cleanup();
}

fn run_annealing(config: AnnealingConfig, target: Arc<Frame>, image_path: &Path, steps: u64) {
    println!("Simulated Annealing");
    println!("===================");
    println!("Target: {}x{}", target.width(), target.height());
    println!("Triangles: {}", config.genome_size);
    println!("Schedule: {:?}", config.schedule);
    println!("Steps: {}", steps);
    println!();

    let renderer = create_renderer(config.renderer, config.background).unwrap_or_else(|e| {
        eprintln!("Error creating renderer: {}", e);
        std::process::exit(1);
    });

    let mut annealer = Annealer::new(config, target, renderer).unwrap_or_else(|e| {
        eprintln!("Error creating annealer: {}", e);
        std::process::exit(1);
    });

    let initial_mse = annealer.current_mse();
    let start = Instant::now();

    for i in 0..steps {
        let step = annealer.step().unwrap_or_else(|e| {
            eprintln!("Error during annealing: {}", e);
            std::process::exit(1);
        });

        // Print progress every 10%
        if (i + 1) % (steps / 10).max(1) == 0 {
            let elapsed = start.elapsed().as_secs_f32();
            println!(
                "  Step {}/{}: MSE={:.2}, T={:.4}, accepted={}, {:.1} steps/s",
                i + 1,
                steps,
                step.best_mse,
                step.temperature,
                annealer.accepted(),
                (i + 1) as f32 / elapsed
            );
        }
    }

    println!();
    println!("MSE: {:.2} -> {:.2}", initial_mse, annealer.current_mse());
    println!("Time: {:.2}s", start.elapsed().as_secs_f32());

    write_outputs(image_path, annealer.frame(), &annealer.to_snapshot());
}

/// Write `<image>.best.png` and `<image>.best.json`.
fn write_outputs(image_path: &Path, frame: &Frame, snapshot: &ChromosomeSnapshot) {
    let png_path = image_path.with_extension("best.png");
    let json_path = image_path.with_extension("best.json");

    if let Err(e) = save_png(frame, &png_path) {
        eprintln!("Error writing {}: {}", png_path.display(), e);
        std::process::exit(1);
    }

    let json = serde_json::to_string_pretty(snapshot).unwrap_or_else(|e| {
        eprintln!("Error serializing result: {}", e);
        std::process::exit(1);
    });
    if let Err(e) = fs::write(&json_path, json) {
        eprintln!("Error writing {}: {}", json_path.display(), e);
        std::process::exit(1);
    }

    println!();
    println!("Wrote {} and {}", png_path.display(), json_path.display());
}

/// Parse a JSON config file, or fall back to defaults when no path is given.
fn read_config<T>(path: Option<&Path>) -> T
where
    T: serde::de::DeserializeOwned + Default + Validate,
{
    let Some(path) = path else {
        return T::default();
    };

    let config_str = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let config: T = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = config.check() {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    }
    config
}

/// Config types that can be validated before use.
trait Validate {
    fn check(&self) -> Result<(), tri_evolve::schema::ConfigError>;
}

impl Validate for SolverConfig {
    fn check(&self) -> Result<(), tri_evolve::schema::ConfigError> {
        self.validate()
    }
}

impl Validate for AnnealingConfig {
    fn check(&self) -> Result<(), tri_evolve::schema::ConfigError> {
        self.validate()
    }
}

/// Remove `flag` from `args`, returning whether it was present.
fn take_flag(args: &mut Vec<String>, flag: &str) -> bool {
    let before = args.len();
    args.retain(|a| a != flag);
    args.len() != before
}

/// Remove `flag VALUE` from `args`, returning the value.
fn take_option(args: &mut Vec<String>, flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.remove(pos);
    if pos < args.len() {
        Some(args.remove(pos))
    } else {
        None
    }
}

fn print_example_config() {
    let print = |name: &str, json: serde_json::Result<String>| match json {
        Ok(json) => {
            println!("{}:", name);
            println!("{}", json);
            println!();
        }
        Err(e) => eprintln!("Error serializing {}: {}", name, e),
    };

    print(
        "Example solver configuration (config.json)",
        serde_json::to_string_pretty(&SolverConfig::default()),
    );
    print(
        "Example annealing configuration (anneal.json, use with --anneal)",
        serde_json::to_string_pretty(&AnnealingConfig::default()),
    );
}
