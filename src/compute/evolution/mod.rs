//! Evolutionary search over triangle chromosomes.
//!
//! # Overview
//!
//! - **Random sources** (`rng`): the [`RandomSource`] trait every operator draws from
//! - **Chromosomes** (`chromosome`): random creation and the three mutation kinds
//! - **Crossover** (`crossover`): OnePoint, TwoPoint, Uniform and None
//! - **Selection** (`selection`): FitnessProportionate, StochasticUniversalSampling,
//!   Tournament and Truncation
//! - **Solver** (`solver`): the generational loop with elitism
//! - **Annealer** (`annealing`): single-chromosome simulated annealing
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tri_evolve::compute::{CpuRenderer, Frame};
//! use tri_evolve::compute::evolution::Solver;
//! use tri_evolve::schema::SolverConfig;
//!
//! let target = Arc::new(Frame::filled(64, 64, [128, 128, 128, 255]));
//! let config = SolverConfig::default();
//! let renderer = CpuRenderer::new(config.background);
//!
//! let mut solver = Solver::new(config, target, renderer).unwrap();
//! for _ in 0..100 {
//!     let result = solver.iteration().unwrap();
//!     println!("Generation {}: best fitness = {:.6}",
//!         result.generation, result.best_fitness);
//! }
//! solver.cleanup();
//! ```
//!
//! Fitness is `1 / (1 + MSE)`: higher is better and always positive, so the
//! proportionate selection strategies can use it directly.

mod annealing;
mod chromosome;
mod crossover;
mod rng;
mod selection;
mod solver;

pub use annealing::Annealer;
pub use chromosome::{Chromosome, MUTATION_STEP, MutationKind};
pub use crossover::{Crossover, CrossoverError};
pub use rng::{EvolutionRng, RandomSource};
pub use selection::{Selection, SelectionError};
pub use solver::{BestRecord, Solver, SolverError};
