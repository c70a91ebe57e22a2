//! Single-chromosome simulated annealing.
//!
//! An alternative to the generational [`Solver`](super::Solver): one
//! chromosome is mutated per step and the mutant replaces it when it lowers
//! the error, or otherwise with probability `exp((current - candidate) / T)`.

use std::sync::Arc;

use crate::compute::render::Renderer;
use crate::compute::{Frame, fitness_from_mse, mean_squared_error};
use crate::schema::{AnnealStep, AnnealingConfig, ChromosomeSnapshot};

use super::chromosome::Chromosome;
use super::rng::{EvolutionRng, RandomSource};
use super::solver::SolverError;

pub struct Annealer<R: Renderer, G: RandomSource = EvolutionRng> {
    config: AnnealingConfig,
    renderer: R,
    rng: G,
    target: Arc<Frame>,
    current: Chromosome,
    current_mse: f64,
    current_frame: Frame,
    scratch: Frame,
    iteration: u64,
    accepted: u64,
}

impl<R: Renderer> Annealer<R> {
    pub fn new(
        config: AnnealingConfig,
        target: Arc<Frame>,
        renderer: R,
    ) -> Result<Self, SolverError> {
        let rng = EvolutionRng::from_seed(config.random_seed);
        Self::with_rng(config, target, renderer, rng)
    }
}

impl<R: Renderer, G: RandomSource> Annealer<R, G> {
    pub fn with_rng(
        config: AnnealingConfig,
        target: Arc<Frame>,
        mut renderer: R,
        mut rng: G,
    ) -> Result<Self, SolverError> {
        config.validate()?;
        if target.pixel_count() == 0 {
            return Err(SolverError::EmptyTarget);
        }

        let (width, height) = target.dimensions();
        let mut current = Chromosome::create_random(config.genome_size, &mut rng);
        let mut current_frame = Frame::new(width, height);
        renderer.render_into(current.triangles(), &mut current_frame)?;
        let current_mse = mean_squared_error(current_frame.pixels(), target.pixels());
        current.set_fitness(fitness_from_mse(current_mse));

        log::info!(
            "Annealer ready: {} triangles, {}x{} target, {:?} schedule",
            config.genome_size,
            width,
            height,
            config.schedule
        );

        Ok(Self {
            config,
            renderer,
            rng,
            scratch: Frame::new(width, height),
            target,
            current,
            current_mse,
            current_frame,
            iteration: 1,
            accepted: 0,
        })
    }

    /// Mutate, render, score and accept or reject once.
    pub fn step(&mut self) -> Result<AnnealStep, SolverError> {
        let mut candidate = self.current.clone();
        candidate.mutate(&mut self.rng);
        self.renderer
            .render_into(candidate.triangles(), &mut self.scratch)?;
        let mse = mean_squared_error(self.scratch.pixels(), self.target.pixels());

        let temperature = self.config.schedule.temperature(self.iteration);
        let accepted = mse < self.current_mse || {
            let p = ((self.current_mse - mse) / temperature as f64).exp();
            (self.rng.next_unit() as f64) < p
        };

        if accepted {
            candidate.set_fitness(fitness_from_mse(mse));
            self.current = candidate;
            self.current_mse = mse;
            std::mem::swap(&mut self.current_frame, &mut self.scratch);
            self.accepted += 1;
        }

        let step = AnnealStep {
            iteration: self.iteration,
            temperature,
            mse,
            best_mse: self.current_mse,
            accepted,
        };
        self.iteration += 1;
        Ok(step)
    }

    /// Run `steps` steps, returning the last one (`None` for zero steps).
    pub fn run(&mut self, steps: u64) -> Result<Option<AnnealStep>, SolverError> {
        let mut last = None;
        for _ in 0..steps {
            let step = self.step()?;
            if step.iteration % 1000 == 0 {
                log::debug!(
                    "Annealing step {}: T = {:.4}, MSE {:.2}",
                    step.iteration,
                    step.temperature,
                    step.best_mse
                );
            }
            last = Some(step);
        }
        Ok(last)
    }

    pub fn current(&self) -> &Chromosome {
        &self.current
    }

    pub fn current_mse(&self) -> f64 {
        self.current_mse
    }

    /// Render of the current chromosome.
    pub fn frame(&self) -> &Frame {
        &self.current_frame
    }

    /// Next iteration number (starts at 1).
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Number of accepted steps so far.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    pub fn to_snapshot(&self) -> ChromosomeSnapshot {
        let (width, height) = self.target.dimensions();
        self.current.to_snapshot(
            self.current_mse,
            (self.iteration - 1) as usize,
            width,
            height,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::CpuRenderer;
    use crate::schema::{ConfigError, CoolingSchedule};

    fn target() -> Arc<Frame> {
        let mut frame = Frame::filled(6, 6, [200, 40, 40, 255]);
        for y in 3..6 {
            for x in 0..6 {
                let i = ((y * 6 + x) * 4) as usize;
                frame.pixels_mut()[i..i + 4].copy_from_slice(&[20, 20, 220, 255]);
            }
        }
        Arc::new(frame)
    }

    fn config(schedule: CoolingSchedule) -> AnnealingConfig {
        AnnealingConfig {
            genome_size: 6,
            schedule,
            random_seed: Some(3),
            ..Default::default()
        }
    }

    #[test]
    fn test_cold_schedule_never_gets_worse() {
        let schedule = CoolingSchedule::Geometric {
            initial: 1e-30,
            ratio: 0.5,
        };
        let mut annealer = Annealer::new(config(schedule), target(), CpuRenderer::default()).unwrap();
        let start = annealer.current_mse();
        let mut last = start;
        for i in 1..=200 {
            let step = annealer.step().unwrap();
            assert_eq!(step.iteration, i);
            assert!(step.best_mse <= last);
            if step.accepted {
                assert_eq!(step.best_mse, step.mse);
            }
            last = step.best_mse;
        }
        assert_eq!(annealer.iteration(), 201);
        assert!(annealer.current_mse() <= start);
    }

    #[test]
    fn test_frame_tracks_current_chromosome() {
        let mut annealer =
            Annealer::new(config(CoolingSchedule::default()), target(), CpuRenderer::default())
                .unwrap();
        annealer.run(50).unwrap();
        let rendered = CpuRenderer::default()
            .render(annealer.current().triangles(), 6, 6)
            .unwrap();
        assert_eq!(&rendered, annealer.frame());
        assert_eq!(
            mean_squared_error(rendered.pixels(), annealer.target.pixels()),
            annealer.current_mse()
        );
    }

    #[test]
    fn test_hot_schedule_accepts_worse_moves() {
        let schedule = CoolingSchedule::GemanGeman { c: 1e12 };
        let mut annealer = Annealer::new(config(schedule), target(), CpuRenderer::default()).unwrap();
        annealer.run(100).unwrap();
        // At this temperature almost every move is accepted.
        assert!(annealer.accepted() > 90);
    }

    #[test]
    fn test_invalid_config() {
        let bad = AnnealingConfig {
            genome_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            Annealer::new(bad, target(), CpuRenderer::default()),
            Err(SolverError::Config(ConfigError::EmptyGenome))
        ));
    }

    #[test]
    fn test_zero_steps() {
        let mut annealer =
            Annealer::new(config(CoolingSchedule::default()), target(), CpuRenderer::default())
                .unwrap();
        assert!(annealer.run(0).unwrap().is_none());
        assert_eq!(annealer.iteration(), 1);
    }
}
