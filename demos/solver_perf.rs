//! Quick solver performance test

use std::sync::Arc;
use std::time::Instant;

use tri_evolve::{
    Frame, RunLimits, Solver, SolverConfig,
    compute::CpuRenderer,
    schema::{CrossoverType, IterationResult, SelectionType},
};

/// Diagonal gradient target.
fn gradient(size: u32) -> Arc<Frame> {
    let mut frame = Frame::new(size, size);
    let scale = 255.0 / (2 * size.max(2) - 2) as f32;
    for y in 0..size {
        for x in 0..size {
            let v = ((x + y) as f32 * scale) as u8;
            let i = ((y * size + x) * 4) as usize;
            frame.pixels_mut()[i..i + 4].copy_from_slice(&[v, 255 - v, 128, 255]);
        }
    }
    Arc::new(frame)
}

fn main() {
    println!("=== Solver Performance Test ===\n");

    // Test different image sizes
    for size in [32, 64, 128] {
        println!("Image size: {}x{}", size, size);

        let config = SolverConfig {
            population_size: 32,
            genome_size: 100,
            random_seed: Some(42),
            ..Default::default()
        };
        let renderer = CpuRenderer::new(config.background);
        let limits = RunLimits {
            max_generations: 50,
            ..Default::default()
        };

        let start = Instant::now();
        let mut solver = Solver::new(config, gradient(size), renderer).unwrap();
        let result = solver
            .run_with_callback(&limits, &mut |_: &IterationResult, _: &Frame| {})
            .unwrap();
        let elapsed = start.elapsed();

        let renders_per_sec = result.stats.total_renders as f64 / elapsed.as_secs_f64();

        println!("  Generations:    {}", result.stats.generations);
        println!("  Renders:        {}", result.stats.total_renders);
        println!("  Elapsed:        {:.2}s", elapsed.as_secs_f64());
        println!("  Renders/sec:    {:.1}", renders_per_sec);
        println!("  Best fitness:   {:.6}", result.stats.best_fitness);
        println!("  Best MSE:       {:.2}", result.stats.best_mse);
        println!();
    }

    println!("=== Strategy Comparison (fixed 64x64 image) ===\n");

    for selection_type in SelectionType::ALL {
        for crossover_type in CrossoverType::ALL {
            let config = SolverConfig {
                population_size: 32,
                genome_size: 50,
                crossover_type,
                selection_type,
                random_seed: Some(42),
                ..Default::default()
            };
            let renderer = CpuRenderer::new(config.background);
            let limits = RunLimits {
                max_generations: 100,
                ..Default::default()
            };

            let start = Instant::now();
            let mut solver = Solver::new(config, gradient(64), renderer).unwrap();
            let result = solver
                .run_with_callback(&limits, &mut |_: &IterationResult, _: &Frame| {})
                .unwrap();
            let elapsed = start.elapsed();

            println!(
                "{:>32} + {:<10}: MSE {:9.2} in {:.2}s",
                selection_type.to_string(),
                crossover_type.to_string(),
                result.stats.best_mse,
                elapsed.as_secs_f64()
            );
        }
    }
}
