//! Per-generation reports and run summaries.

use serde::{Deserialize, Serialize};

use super::ChromosomeSnapshot;

/// Result of one solver generation, handed to the result sink.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IterationResult {
    /// Generation index (1 for the first call to `iteration`).
    pub generation: usize,
    /// Render-target slot holding this generation's best chromosome.
    pub best_slot: usize,
    /// Best fitness this generation.
    pub best_fitness: f32,
    /// Worst fitness this generation.
    pub worst_fitness: f32,
    /// Mean fitness this generation.
    pub mean_fitness: f32,
    /// Mean squared error of this generation's best chromosome.
    pub best_mse: f64,
    /// All-time best fitness after this generation.
    pub elite_fitness: f32,
    /// Whether this generation replaced the elite record.
    pub improved: bool,
}

/// Evolution history for plotting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EvolutionHistory {
    /// Best fitness per generation.
    pub best_fitness: Vec<f32>,
    /// Mean fitness per generation.
    pub mean_fitness: Vec<f32>,
    /// Worst fitness per generation.
    pub worst_fitness: Vec<f32>,
    /// Elite mean squared error per generation.
    pub elite_mse: Vec<f64>,
}

impl EvolutionHistory {
    /// Append one generation.
    pub fn record(&mut self, result: &IterationResult, elite_mse: f64) {
        self.best_fitness.push(result.best_fitness);
        self.mean_fitness.push(result.mean_fitness);
        self.worst_fitness.push(result.worst_fitness);
        self.elite_mse.push(elite_mse);
    }

    /// Number of recorded generations.
    pub fn len(&self) -> usize {
        self.best_fitness.len()
    }

    pub fn is_empty(&self) -> bool {
        self.best_fitness.is_empty()
    }
}

/// Final result of a solver run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Best chromosome found.
    pub best: ChromosomeSnapshot,
    /// Statistics from the run.
    pub stats: RunStats,
    /// Full history for analysis.
    pub history: EvolutionHistory,
}

/// Statistics from a solver run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    /// Total generations run.
    pub generations: usize,
    /// Total chromosome renders performed (including the initial population).
    pub total_renders: u64,
    /// Best fitness achieved.
    pub best_fitness: f32,
    /// Mean squared error of the best chromosome.
    pub best_mse: f64,
    /// Mean fitness of the final population.
    pub final_mean_fitness: f32,
    /// Time taken (in seconds).
    pub elapsed_seconds: f64,
    /// Generations per second.
    pub generations_per_second: f64,
    /// Reason for stopping.
    pub stop_reason: StopReason,
}

/// Reason a run stopped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum StopReason {
    /// Reached maximum generations.
    MaxGenerations,
    /// Reached target fitness.
    TargetReached,
    /// Stagnation limit hit.
    Stagnation,
    /// User cancelled.
    Cancelled,
}

/// Outcome of one annealing step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnnealStep {
    /// Iteration number (starts at 1).
    pub iteration: u64,
    /// Temperature used for the acceptance test.
    pub temperature: f32,
    /// Error of the proposed chromosome.
    pub mse: f64,
    /// Error of the accepted chromosome after this step.
    pub best_mse: f64,
    /// Whether the proposal replaced the current chromosome.
    pub accepted: bool,
}
