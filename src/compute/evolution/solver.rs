//! Generational solver: selection, breeding, rendering and scoring.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use crate::compute::render::{RenderError, RenderTargets, Renderer};
use crate::compute::{Frame, fitness_from_mse, mean_squared_error};
use crate::io::{ImageError, ResultSink};
use crate::schema::{
    ChromosomeSnapshot, ConfigError, EvolutionHistory, IterationResult, RunLimits, RunResult,
    RunStats, SolverConfig, StopReason,
};

use super::chromosome::{Chromosome, distinct_pair};
use super::crossover::{Crossover, CrossoverError};
use super::rng::{EvolutionRng, RandomSource};
use super::selection::{Selection, SelectionError};

/// Best chromosome seen across all generations.
#[derive(Debug, Clone)]
pub struct BestRecord {
    /// Fitness (higher is better).
    pub fitness: f32,
    /// Mean squared error against the target.
    pub mse: f64,
    /// Generation that produced it; 0 is the initial population.
    pub generation: usize,
    /// Copy of the chromosome itself.
    pub chromosome: Chromosome,
}

impl BestRecord {
    /// Export for serialization.
    pub fn to_snapshot(&self, width: u32, height: u32) -> ChromosomeSnapshot {
        let mut snapshot = self
            .chromosome
            .to_snapshot(self.mse, self.generation, width, height);
        snapshot.fitness = self.fitness;
        snapshot
    }
}

/// Evolves a population of triangle chromosomes toward a target image.
///
/// Construction renders and scores a random initial population. Each call to
/// [`Solver::iteration`] then runs one full generation and returns only once
/// every offspring has been rendered and scored.
pub struct Solver<R: Renderer, G: RandomSource = EvolutionRng> {
    config: SolverConfig,
    crossover: Crossover,
    selection: Selection,
    renderer: R,
    rng: G,
    target: Arc<Frame>,
    targets: RenderTargets,
    population: Vec<Chromosome>,
    mse: Vec<f64>,
    best: BestRecord,
    history: EvolutionHistory,
    generation: usize,
    stagnation_count: usize,
    total_renders: u64,
    cancelled: Arc<AtomicBool>,
}

impl<R: Renderer> Solver<R> {
    /// Create a solver seeded from `config.random_seed` (entropy if unset).
    pub fn new(config: SolverConfig, target: Arc<Frame>, renderer: R) -> Result<Self, SolverError> {
        let rng = EvolutionRng::from_seed(config.random_seed);
        Self::with_rng(config, target, renderer, rng)
    }
}

impl<R: Renderer, G: RandomSource> Solver<R, G> {
    /// Create a solver drawing all randomness from `rng`.
    pub fn with_rng(
        config: SolverConfig,
        target: Arc<Frame>,
        renderer: R,
        mut rng: G,
    ) -> Result<Self, SolverError> {
        config.validate()?;
        if target.pixel_count() == 0 {
            return Err(SolverError::EmptyTarget);
        }

        let crossover = Crossover::from(config.crossover_type);
        if crossover == Crossover::TwoPoint && config.genome_size < 3 {
            log::warn!(
                "Two-point crossover needs at least 3 triangles; {} will use a single cut",
                config.genome_size
            );
        }
        let selection = Selection::from_config(&config);
        let (width, height) = target.dimensions();
        let size = config.population_size;

        let population: Vec<Chromosome> = (0..size)
            .map(|_| Chromosome::create_random(config.genome_size, &mut rng))
            .collect();

        let mut solver = Self {
            crossover,
            selection,
            renderer,
            rng,
            targets: RenderTargets::new(size, width, height, config.background),
            mse: vec![f64::INFINITY; size],
            best: BestRecord {
                fitness: f32::NEG_INFINITY,
                mse: f64::INFINITY,
                generation: 0,
                chromosome: population[0].clone(),
            },
            population,
            target,
            history: EvolutionHistory::default(),
            generation: 0,
            stagnation_count: 0,
            total_renders: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
            config,
        };

        solver.render_population()?;
        solver.evaluate_population();

        let (best_slot, _, _, _) = solver.aggregates();
        solver.record_best(best_slot);

        log::info!(
            "Solver ready: {} x {} triangles, {}x{} target, {} crossover, {} selection, {} renderer",
            size,
            solver.config.genome_size,
            width,
            height,
            solver.config.crossover_type,
            solver.config.selection_type,
            solver.renderer.name(),
        );

        Ok(solver)
    }

    /// Get cancellation handle, checked between generations by `run_with_callback`.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Run one generation.
    ///
    /// On error the population, its frames, scores and the generation counter
    /// are left as they were before the call.
    pub fn iteration(&mut self) -> Result<IterationResult, SolverError> {
        if self.targets.is_released() {
            return Err(SolverError::Released);
        }

        let survivors = self.selection.select(&self.population, &mut self.rng)?;
        if self.crossover.needs_distinct_parents() && survivors.len() < 2 {
            return Err(SolverError::TooFewSurvivors {
                count: survivors.len(),
            });
        }

        let size = self.config.population_size;
        let mut offspring = Vec::with_capacity(size);
        for slot in 0..size {
            let (i1, i2) = if survivors.len() >= 2 {
                distinct_pair(survivors.len(), &mut self.rng)
            } else {
                (0, 0)
            };
            let mut child =
                self.crossover
                    .combine(&survivors[i1], &survivors[i2], &mut self.rng)?;
            child.mutate(&mut self.rng);
            self.renderer
                .render_into(child.triangles(), self.targets.staging_mut(slot))?;
            offspring.push(child);
        }
        self.targets.commit();
        self.population = offspring;
        self.total_renders += size as u64;
        self.generation += 1;

        self.evaluate_population();

        let (best_slot, best_fitness, worst_fitness, mean_fitness) = self.aggregates();
        let improved = best_fitness > self.best.fitness;
        if improved {
            self.record_best(best_slot);
            self.stagnation_count = 0;
            log::info!(
                "Generation {}: new best fitness {:.6} (MSE {:.2})",
                self.generation,
                self.best.fitness,
                self.best.mse
            );
        } else {
            self.stagnation_count += 1;
        }

        let result = IterationResult {
            generation: self.generation,
            best_slot,
            best_fitness,
            worst_fitness,
            mean_fitness,
            best_mse: self.mse[best_slot],
            elite_fitness: self.best.fitness,
            improved,
        };
        self.history.record(&result, self.best.mse);

        log::debug!(
            "Generation {}: best {:.6}, worst {:.6}, mean {:.6}",
            result.generation,
            best_fitness,
            worst_fitness,
            mean_fitness
        );

        Ok(result)
    }

    /// Release every render target. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        if self.targets.release() {
            log::info!(
                "Solver released {} render targets after {} generations",
                self.population.len() + 1,
                self.generation
            );
        }
    }

    /// Whether [`Solver::cleanup`] has run.
    pub fn is_released(&self) -> bool {
        self.targets.is_released()
    }

    /// Render every chromosome into its own slot.
    fn render_population(&mut self) -> Result<(), RenderError> {
        for (slot, chromosome) in self.population.iter().enumerate() {
            self.renderer
                .render_into(chromosome.triangles(), self.targets.slot_mut(slot))?;
        }
        self.total_renders += self.population.len() as u64;
        Ok(())
    }

    /// Score every slot against the target.
    ///
    /// Slots are only read here, after all renders have returned.
    fn evaluate_population(&mut self) {
        let target = self.target.pixels();
        self.population
            .par_iter_mut()
            .zip(self.mse.par_iter_mut())
            .zip(self.targets.slots().par_iter())
            .for_each(|((chromosome, mse), frame)| {
                *mse = mean_squared_error(frame.pixels(), target);
                chromosome.set_fitness(fitness_from_mse(*mse));
            });
    }

    /// Best slot (first on ties) plus best, worst and mean fitness.
    fn aggregates(&self) -> (usize, f32, f32, f32) {
        let mut best_slot = 0;
        let mut best = f32::NEG_INFINITY;
        let mut worst = f32::INFINITY;
        let mut sum = 0.0f32;
        for (slot, chromosome) in self.population.iter().enumerate() {
            let fitness = chromosome.fitness().unwrap_or(0.0);
            if fitness > best {
                best = fitness;
                best_slot = slot;
            }
            worst = worst.min(fitness);
            sum += fitness;
        }
        (best_slot, best, worst, sum / self.population.len() as f32)
    }

    /// Copy `slot` into the elite record and elite render target.
    fn record_best(&mut self, slot: usize) {
        let chromosome = &self.population[slot];
        self.best = BestRecord {
            fitness: chromosome.fitness().unwrap_or(0.0),
            mse: self.mse[slot],
            generation: self.generation,
            chromosome: chromosome.clone(),
        };
        self.targets.promote(slot);
    }

    /// Check if the run should stop.
    fn should_stop(&self, limits: &RunLimits, start_generation: usize) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if self.generation - start_generation >= limits.max_generations {
            return Some(StopReason::MaxGenerations);
        }

        if let Some(target) = limits.target_fitness
            && self.best.fitness >= target
        {
            return Some(StopReason::TargetReached);
        }

        if let Some(limit) = limits.stagnation_limit
            && self.stagnation_count >= limit
        {
            return Some(StopReason::Stagnation);
        }

        None
    }

    /// Run generations until a limit fires, reporting each one to `sink`.
    pub fn run_with_callback<S>(
        &mut self,
        limits: &RunLimits,
        sink: &mut S,
    ) -> Result<RunResult, SolverError>
    where
        S: ResultSink + ?Sized,
    {
        let start_time = Instant::now();
        let start_generation = self.generation;
        let mut final_mean = self.aggregates().3;

        let stop_reason = loop {
            if let Some(reason) = self.should_stop(limits, start_generation) {
                break reason;
            }

            let result = self.iteration()?;
            final_mean = result.mean_fitness;
            sink.consume(&result, self.targets.slot(result.best_slot))?;
        };

        let elapsed = start_time.elapsed().as_secs_f64();
        let generations = self.generation - start_generation;
        let (width, height) = self.target.dimensions();

        log::info!(
            "Run stopped after {} generations ({:?}): best fitness {:.6}",
            generations,
            stop_reason,
            self.best.fitness
        );

        Ok(RunResult {
            best: self.best.to_snapshot(width, height),
            stats: RunStats {
                generations,
                total_renders: self.total_renders,
                best_fitness: self.best.fitness,
                best_mse: self.best.mse,
                final_mean_fitness: final_mean,
                elapsed_seconds: elapsed,
                generations_per_second: if elapsed > 0.0 {
                    generations as f64 / elapsed
                } else {
                    0.0
                },
                stop_reason,
            },
            history: self.history.clone(),
        })
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Render target of population slot `slot`.
    pub fn frame(&self, slot: usize) -> Option<&Frame> {
        self.targets.slots().get(slot)
    }

    /// Render target holding the all-time best image.
    pub fn elite_frame(&self) -> &Frame {
        self.targets.elite()
    }

    pub fn best(&self) -> &BestRecord {
        &self.best
    }

    pub fn population(&self) -> &[Chromosome] {
        &self.population
    }

    /// Per-slot mean squared error of the current population.
    pub fn errors(&self) -> &[f64] {
        &self.mse
    }

    /// Number of completed generations.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn history(&self) -> &EvolutionHistory {
        &self.history
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn target(&self) -> &Frame {
        &self.target
    }

    /// Total number of chromosome renders, initial population included.
    pub fn total_renders(&self) -> u64 {
        self.total_renders
    }
}

/// Errors raised while building or running a solver.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Crossover(#[from] CrossoverError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Sink(#[from] ImageError),

    #[error("Selection kept {count} survivor(s) but crossover needs two distinct parents")]
    TooFewSurvivors { count: usize },

    #[error("Target image has no pixels")]
    EmptyTarget,

    #[error("Solver render targets have been released")]
    Released,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::CpuRenderer;
    use crate::schema::{CrossoverType, SelectionType};

    fn grey_target() -> Arc<Frame> {
        Arc::new(Frame::filled(2, 2, [128, 128, 128, 128]))
    }

    fn small_config() -> SolverConfig {
        SolverConfig {
            population_size: 8,
            genome_size: 4,
            random_seed: Some(42),
            ..Default::default()
        }
    }

    fn solver(config: SolverConfig) -> Solver<CpuRenderer> {
        let renderer = CpuRenderer::new(config.background);
        Solver::new(config, grey_target(), renderer).unwrap()
    }

    #[test]
    fn test_construction_scores_everything() {
        let s = solver(small_config());
        assert_eq!(s.generation(), 0);
        assert_eq!(s.population().len(), 8);
        assert!(s.population().iter().all(|c| c.len() == 4));
        assert!(s.population().iter().all(|c| c.fitness().is_some()));
        assert_eq!(s.best().generation, 0);
        assert_eq!(s.total_renders(), 8);

        let best = s
            .population()
            .iter()
            .filter_map(Chromosome::fitness)
            .fold(f32::NEG_INFINITY, f32::max);
        assert_eq!(s.best().fitness, best);
    }

    #[test]
    fn test_elite_frame_matches_best_chromosome() {
        let mut s = solver(small_config());
        for _ in 0..10 {
            s.iteration().unwrap();
        }
        let mut renderer = CpuRenderer::default();
        let rendered = renderer
            .render(s.best().chromosome.triangles(), 2, 2)
            .unwrap();
        assert_eq!(&rendered, s.elite_frame());
        let mse = mean_squared_error(rendered.pixels(), s.target().pixels());
        assert_eq!(mse, s.best().mse);
    }

    #[test]
    fn test_uniform_grey_target_never_regresses() {
        let config = SolverConfig {
            population_size: 4,
            genome_size: 1,
            random_seed: Some(7),
            ..Default::default()
        };
        let mut s = solver(config);

        let first = s.iteration().unwrap();
        let mut elite = first.elite_fitness;
        let mut elite_mse = s.best().mse;
        for _ in 1..50 {
            let result = s.iteration().unwrap();
            assert!(result.elite_fitness >= elite);
            assert!(s.best().mse <= elite_mse);
            elite = result.elite_fitness;
            elite_mse = s.best().mse;
        }
        assert_eq!(s.generation(), 50);
        assert!(s.best().fitness >= first.elite_fitness);
        assert!(s.history().elite_mse.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_iteration_aggregates() {
        let mut s = solver(small_config());
        let result = s.iteration().unwrap();
        assert_eq!(result.generation, 1);
        assert!(result.best_fitness >= result.mean_fitness);
        assert!(result.mean_fitness >= result.worst_fitness);
        assert_eq!(
            s.population()[result.best_slot].fitness(),
            Some(result.best_fitness)
        );
        assert!(result.elite_fitness >= result.best_fitness);
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.total_renders(), 16);
    }

    #[test]
    fn test_elite_only_updates_on_strict_improvement() {
        let mut s = solver(small_config());
        for _ in 0..20 {
            let before = s.best().clone();
            let result = s.iteration().unwrap();
            if result.improved {
                assert!(s.best().fitness > before.fitness);
                assert_eq!(s.best().generation, result.generation);
            } else {
                assert_eq!(s.best().fitness, before.fitness);
                assert_eq!(s.best().generation, before.generation);
            }
        }
    }

    #[test]
    fn test_every_strategy_combination_runs() {
        for crossover_type in CrossoverType::ALL {
            for selection_type in SelectionType::ALL {
                let config = SolverConfig {
                    crossover_type,
                    selection_type,
                    ..small_config()
                };
                let mut s = solver(config);
                for _ in 0..3 {
                    s.iteration().unwrap();
                }
                assert_eq!(s.population().len(), 8);
            }
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let mut a = solver(small_config());
        let mut b = solver(small_config());
        for _ in 0..5 {
            let ra = a.iteration().unwrap();
            let rb = b.iteration().unwrap();
            assert_eq!(ra.best_fitness, rb.best_fitness);
            assert_eq!(ra.mean_fitness, rb.mean_fitness);
        }
        assert_eq!(a.population(), b.population());
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let mut s = solver(small_config());
        s.iteration().unwrap();
        s.cleanup();
        s.cleanup();
        assert!(s.is_released());
        assert!(matches!(s.iteration(), Err(SolverError::Released)));
    }

    #[test]
    fn test_zero_population_fails_fast() {
        let config = SolverConfig {
            population_size: 0,
            ..small_config()
        };
        let result = Solver::new(config, grey_target(), CpuRenderer::default());
        assert!(matches!(
            result,
            Err(SolverError::Config(ConfigError::PopulationTooSmall(0)))
        ));
    }

    #[test]
    fn test_empty_target_fails_fast() {
        let result = Solver::new(
            small_config(),
            Arc::new(Frame::new(0, 4)),
            CpuRenderer::default(),
        );
        assert!(matches!(result, Err(SolverError::EmptyTarget)));
    }

    #[test]
    fn test_too_few_survivors() {
        let config = SolverConfig {
            population_size: 2,
            cleansing_rate: 0.9,
            crossover_type: CrossoverType::OnePoint,
            ..small_config()
        };
        let mut s = solver(config.clone());
        assert!(matches!(
            s.iteration(),
            Err(SolverError::TooFewSurvivors { count: 1 })
        ));

        // Cloning a single parent is fine without recombination.
        let mut s = solver(SolverConfig {
            crossover_type: CrossoverType::None,
            ..config
        });
        assert_eq!(s.iteration().unwrap().generation, 1);
    }

    /// CPU renderer that fails on one chosen call (1-based).
    struct FailingRenderer {
        inner: CpuRenderer,
        calls: usize,
        fail_on: usize,
    }

    impl Renderer for FailingRenderer {
        fn render_into(
            &mut self,
            triangles: &[crate::schema::Triangle],
            frame: &mut Frame,
        ) -> Result<(), RenderError> {
            self.calls += 1;
            if self.calls == self.fail_on {
                return Err(RenderError::Backend("device lost".to_string()));
            }
            self.inner.render_into(triangles, frame)
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn test_failed_generation_leaves_state_untouched() {
        let config = SolverConfig {
            population_size: 4,
            genome_size: 3,
            ..small_config()
        };
        // 4 construction renders, then the 4th offspring of generation 1 fails
        let renderer = FailingRenderer {
            inner: CpuRenderer::new(config.background),
            calls: 0,
            fail_on: 8,
        };
        let mut s = Solver::new(config.clone(), grey_target(), renderer).unwrap();
        let population = s.population().to_vec();
        let errors = s.errors().to_vec();
        let renders = s.total_renders();

        assert!(matches!(
            s.iteration(),
            Err(SolverError::Render(RenderError::Backend(_)))
        ));
        assert_eq!(s.generation(), 0);
        assert_eq!(s.population(), population.as_slice());
        assert_eq!(s.errors(), errors.as_slice());
        assert_eq!(s.total_renders(), renders);
        assert!(s.history().is_empty());

        let mut reference = CpuRenderer::new(config.background);
        for (slot, chromosome) in s.population().iter().enumerate() {
            let expected = reference.render(chromosome.triangles(), 2, 2).unwrap();
            assert_eq!(s.frame(slot), Some(&expected), "slot {}", slot);
        }

        // The next generation goes through normally.
        let result = s.iteration().unwrap();
        assert_eq!(result.generation, 1);
        for (slot, chromosome) in s.population().iter().enumerate() {
            let expected = reference.render(chromosome.triangles(), 2, 2).unwrap();
            assert_eq!(s.frame(slot), Some(&expected), "slot {}", slot);
        }
    }

    #[test]
    fn test_run_stops_at_max_generations() {
        let mut s = solver(small_config());
        let mut seen = Vec::new();
        let mut sink = |r: &IterationResult, frame: &Frame| {
            assert_eq!(frame.dimensions(), (2, 2));
            seen.push(r.generation);
        };
        let limits = RunLimits {
            max_generations: 6,
            ..Default::default()
        };
        let result = s.run_with_callback(&limits, &mut sink).unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::MaxGenerations);
        assert_eq!(result.stats.generations, 6);
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(result.history.len(), 6);
        assert_eq!(result.best.triangles.len(), 4);
        assert_eq!(result.best.fitness, s.best().fitness);
    }

    #[test]
    fn test_run_target_and_cancel() {
        let mut s = solver(small_config());
        let mut sink = |_: &IterationResult, _: &Frame| {};

        let limits = RunLimits {
            max_generations: 100,
            target_fitness: Some(0.0),
            ..Default::default()
        };
        let result = s.run_with_callback(&limits, &mut sink).unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::TargetReached);
        assert_eq!(result.stats.generations, 0);

        s.cancel_handle().store(true, Ordering::Relaxed);
        let result = s
            .run_with_callback(&RunLimits::default(), &mut sink)
            .unwrap();
        assert_eq!(result.stats.stop_reason, StopReason::Cancelled);
    }

    #[test]
    fn test_run_stagnation() {
        let mut s = solver(small_config());
        let limits = RunLimits {
            max_generations: 10_000,
            stagnation_limit: Some(3),
            ..Default::default()
        };
        let result = s
            .run_with_callback(&limits, &mut |_: &IterationResult, _: &Frame| {})
            .unwrap();
        assert!(matches!(
            result.stats.stop_reason,
            StopReason::Stagnation | StopReason::MaxGenerations
        ));
    }
}
