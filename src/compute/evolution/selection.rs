//! Survivor selection: reduce a scored population to breeding stock.

use crate::schema::{SelectionType, SolverConfig, survivor_count};

use super::chromosome::Chromosome;
use super::rng::RandomSource;

/// Selection strategy plus the parameters every variant shares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
    kind: SelectionType,
    cleansing_rate: f32,
    tournament_size: usize,
}

impl Selection {
    pub fn new(kind: SelectionType, cleansing_rate: f32, tournament_size: usize) -> Self {
        Self {
            kind,
            cleansing_rate,
            tournament_size: tournament_size.max(1),
        }
    }

    pub fn from_config(config: &SolverConfig) -> Self {
        Self::new(
            config.selection_type,
            config.cleansing_rate,
            config.tournament_size,
        )
    }

    pub fn kind(&self) -> SelectionType {
        self.kind
    }

    /// Number of survivors kept from a population of `population_size`.
    pub fn keep(&self, population_size: usize) -> usize {
        survivor_count(population_size, self.cleansing_rate)
    }

    /// Copies of the surviving chromosomes, `keep(population.len())` of them.
    pub fn select(
        &self,
        population: &[Chromosome],
        rng: &mut impl RandomSource,
    ) -> Result<Vec<Chromosome>, SelectionError> {
        let indices = self.select_indices(population, rng)?;
        Ok(indices.into_iter().map(|i| population[i].clone()).collect())
    }

    /// Population indices of the survivors, in selection order.
    pub fn select_indices(
        &self,
        population: &[Chromosome],
        rng: &mut impl RandomSource,
    ) -> Result<Vec<usize>, SelectionError> {
        if population.is_empty() {
            return Err(SelectionError::EmptyPopulation);
        }
        let scores = scores(population)?;
        let keep = self.keep(population.len());

        match self.kind {
            SelectionType::FitnessProportionate => {
                let table = cumulative_table(&scores)?;
                Ok((0..keep)
                    .map(|_| spin(&table, rng.next_unit()))
                    .collect())
            }
            SelectionType::StochasticUniversalSampling => {
                let table = cumulative_table(&scores)?;
                let spacing = 1.0 / keep as f32;
                let offset = rng.next_unit() * spacing;
                Ok((0..keep)
                    .map(|k| spin(&table, offset + k as f32 * spacing))
                    .collect())
            }
            SelectionType::Tournament => Ok((0..keep)
                .map(|_| tournament(&scores, self.tournament_size, rng))
                .collect()),
            SelectionType::Truncation => {
                let mut order: Vec<usize> = (0..scores.len()).collect();
                // Stable, so equal scores keep population order.
                order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
                order.truncate(keep);
                Ok(order)
            }
        }
    }
}

/// Fitness of every member, failing on the first unscored one.
fn scores(population: &[Chromosome]) -> Result<Vec<f32>, SelectionError> {
    population
        .iter()
        .enumerate()
        .map(|(index, c)| c.fitness().ok_or(SelectionError::Unscored { index }))
        .collect()
}

/// Running fitness sums normalized by the total, so the last entry is ~1.
fn cumulative_table(scores: &[f32]) -> Result<Vec<f32>, SelectionError> {
    let total: f32 = scores.iter().sum();
    if !(total > 0.0) || scores.iter().any(|&s| s < 0.0) {
        return Err(SelectionError::NonPositiveTotalFitness(total));
    }
    let mut acc = 0.0;
    Ok(scores
        .iter()
        .map(|&s| {
            acc += s;
            acc / total
        })
        .collect())
}

/// First bucket whose cumulative share exceeds `r`.
///
/// Zero-fitness members own an empty bucket and are never picked. Rounding
/// can leave the last entry just below 1, so the result is clamped.
fn spin(table: &[f32], r: f32) -> usize {
    table.partition_point(|&c| c <= r).min(table.len() - 1)
}

/// Winner of one `size`-way contest drawn with replacement; ties go to the lower index.
fn tournament(scores: &[f32], size: usize, rng: &mut impl RandomSource) -> usize {
    let mut best = rng.below(scores.len());
    for _ in 1..size {
        let idx = rng.below(scores.len());
        if scores[idx] > scores[best] || (scores[idx] == scores[best] && idx < best) {
            best = idx;
        }
    }
    best
}

/// Selection precondition failures.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SelectionError {
    #[error("Cannot select from an empty population")]
    EmptyPopulation,

    #[error("Chromosome {index} has not been evaluated")]
    Unscored { index: usize },

    #[error("Proportionate selection needs positive total fitness (got {0})")]
    NonPositiveTotalFitness(f32),
}
