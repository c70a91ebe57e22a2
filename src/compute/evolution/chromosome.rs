//! Candidate images as ordered triangle lists, and the mutation operator.

use std::ops::Index;

use crate::schema::{COLOR_BOUNDS, ChromosomeSnapshot, POSITION_BOUNDS, Triangle, Vertex};

use super::rng::RandomSource;

/// Largest absolute change a single mutation applies to one value.
pub const MUTATION_STEP: f32 = 0.1;

/// The three ways a chromosome can be mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Nudge one colour channel of one triangle.
    Color,
    /// Swap the draw order of two triangles.
    Order,
    /// Nudge both coordinates of one vertex.
    Position,
}

impl MutationKind {
    /// Pick a kind uniformly among those applicable to a genome of `len` triangles.
    ///
    /// Swapping needs two triangles, so `Order` is never chosen for `len < 2`.
    pub fn choose(len: usize, rng: &mut impl RandomSource) -> Self {
        if len < 2 {
            if rng.below(2) == 0 {
                MutationKind::Color
            } else {
                MutationKind::Position
            }
        } else {
            match rng.below(3) {
                0 => MutationKind::Color,
                1 => MutationKind::Order,
                _ => MutationKind::Position,
            }
        }
    }
}

/// One candidate image: triangles in draw order plus a cached fitness.
///
/// Fitness is unset on creation and after every structural change; only the
/// evaluation step writes it.
#[derive(Debug, Clone, PartialEq)]
pub struct Chromosome {
    triangles: Vec<Triangle>,
    fitness: Option<f32>,
}

impl Chromosome {
    /// `size` triangles with uniform vertex coordinates and colour channels.
    pub fn create_random(size: usize, rng: &mut impl RandomSource) -> Self {
        let triangles = (0..size).map(|_| random_triangle(rng)).collect();
        Self {
            triangles,
            fitness: None,
        }
    }

    /// Wrap an existing triangle list. Fitness starts unset.
    pub fn from_triangles(triangles: Vec<Triangle>) -> Self {
        Self {
            triangles,
            fitness: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn into_triangles(self) -> Vec<Triangle> {
        self.triangles
    }

    /// Cached fitness, `None` until evaluated.
    #[inline]
    pub fn fitness(&self) -> Option<f32> {
        self.fitness
    }

    pub fn set_fitness(&mut self, fitness: f32) {
        self.fitness = Some(fitness);
    }

    pub fn clear_fitness(&mut self) {
        self.fitness = None;
    }

    /// Apply exactly one randomly chosen mutation in place.
    pub fn mutate(&mut self, rng: &mut impl RandomSource) {
        let kind = MutationKind::choose(self.len(), rng);
        self.apply_mutation(kind, rng);
    }

    /// Apply one mutation of the given kind in place.
    ///
    /// Empty chromosomes are left untouched, as is `Order` on a single triangle.
    /// The cached fitness is not touched; only evaluation writes it.
    pub fn apply_mutation(&mut self, kind: MutationKind, rng: &mut impl RandomSource) {
        let len = self.len();
        if len == 0 {
            return;
        }

        match kind {
            MutationKind::Color => {
                let t = rng.below(len);
                let c = rng.below(4);
                let delta = rng.range(-MUTATION_STEP, MUTATION_STEP);
                let channel = &mut self.triangles[t].color[c];
                *channel = (*channel + delta).clamp(COLOR_BOUNDS.0, COLOR_BOUNDS.1);
            }
            MutationKind::Order => {
                if len < 2 {
                    return;
                }
                let (i, j) = distinct_pair(len, rng);
                self.triangles.swap(i, j);
            }
            MutationKind::Position => {
                let t = rng.below(len);
                let v = rng.below(3);
                let dx = rng.range(-MUTATION_STEP, MUTATION_STEP);
                let dy = rng.range(-MUTATION_STEP, MUTATION_STEP);
                let vertex = &mut self.triangles[t].vertices[v];
                vertex.x = (vertex.x + dx).clamp(POSITION_BOUNDS.0, POSITION_BOUNDS.1);
                vertex.y = (vertex.y + dy).clamp(POSITION_BOUNDS.0, POSITION_BOUNDS.1);
            }
        }
    }

    /// Export for serialization.
    pub fn to_snapshot(
        &self,
        mse: f64,
        generation: usize,
        width: u32,
        height: u32,
    ) -> ChromosomeSnapshot {
        ChromosomeSnapshot {
            triangles: self.triangles.clone(),
            fitness: self.fitness.unwrap_or(0.0),
            mse,
            generation,
            width,
            height,
        }
    }
}

impl Index<usize> for Chromosome {
    type Output = Triangle;

    fn index(&self, index: usize) -> &Triangle {
        &self.triangles[index]
    }
}

/// Two distinct indices in [0, n), uniform over ordered pairs. Needs `n >= 2`.
///
/// The second draw covers one fewer slot and is shifted past the first, so
/// no retry loop is needed.
pub(crate) fn distinct_pair(n: usize, rng: &mut impl RandomSource) -> (usize, usize) {
    debug_assert!(n >= 2);
    let first = rng.below(n);
    let mut second = rng.below(n - 1);
    if second >= first {
        second += 1;
    }
    (first, second)
}

fn random_triangle(rng: &mut impl RandomSource) -> Triangle {
    let mut vertex = || {
        Vertex::new(
            rng.range(POSITION_BOUNDS.0, POSITION_BOUNDS.1),
            rng.range(POSITION_BOUNDS.0, POSITION_BOUNDS.1),
        )
    };
    let vertices = [vertex(), vertex(), vertex()];
    let color = [
        rng.range(COLOR_BOUNDS.0, COLOR_BOUNDS.1),
        rng.range(COLOR_BOUNDS.0, COLOR_BOUNDS.1),
        rng.range(COLOR_BOUNDS.0, COLOR_BOUNDS.1),
        rng.range(COLOR_BOUNDS.0, COLOR_BOUNDS.1),
    ];
    Triangle::new(vertices, color)
}
