//! Recombination of two parent chromosomes into one child.

use crate::schema::CrossoverType;

use super::chromosome::Chromosome;
use super::rng::RandomSource;

/// Crossover strategy, selected once from configuration.
///
/// Stateless: the only input besides the parents is the random source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossover {
    /// `A[..cut] ++ B[cut..]` with `cut` uniform in [1, n-1].
    OnePoint,
    /// `A[..lo] ++ B[lo..hi] ++ A[hi..]` with distinct cuts `lo < hi` in [1, n-1].
    TwoPoint,
    /// Each index copied from a parent chosen by a fair coin.
    Uniform,
    /// Parent A unchanged.
    None,
}

impl From<CrossoverType> for Crossover {
    fn from(kind: CrossoverType) -> Self {
        match kind {
            CrossoverType::OnePoint => Crossover::OnePoint,
            CrossoverType::TwoPoint => Crossover::TwoPoint,
            CrossoverType::Uniform => Crossover::Uniform,
            CrossoverType::None => Crossover::None,
        }
    }
}

impl Crossover {
    /// Whether the two parents should be distinct population members.
    pub fn needs_distinct_parents(self) -> bool {
        !matches!(self, Crossover::None)
    }

    /// Combine two equally sized parents into a child with unset fitness.
    pub fn combine(
        self,
        a: &Chromosome,
        b: &Chromosome,
        rng: &mut impl RandomSource,
    ) -> Result<Chromosome, CrossoverError> {
        if a.len() != b.len() {
            return Err(CrossoverError::LengthMismatch {
                left: a.len(),
                right: b.len(),
            });
        }
        let n = a.len();
        let (a, b) = (a.triangles(), b.triangles());

        let triangles = match self {
            // With a single gene there is no interior cut point.
            Crossover::OnePoint | Crossover::TwoPoint if n < 2 => a.to_vec(),
            Crossover::OnePoint => {
                let cut = one_point_cut(n, rng);
                [&a[..cut], &b[cut..]].concat()
            }
            Crossover::TwoPoint => match two_point_cuts(n, rng) {
                Some((lo, hi)) => [&a[..lo], &b[lo..hi], &a[hi..]].concat(),
                None => {
                    let cut = one_point_cut(n, rng);
                    [&a[..cut], &b[cut..]].concat()
                }
            },
            Crossover::Uniform => (0..n)
                .map(|i| if rng.coin() { a[i] } else { b[i] })
                .collect(),
            Crossover::None => a.to_vec(),
        };

        Ok(Chromosome::from_triangles(triangles))
    }
}

/// Cut index uniform in [1, n-1]. Needs `n >= 2`.
fn one_point_cut(n: usize, rng: &mut impl RandomSource) -> usize {
    rng.below(n - 1) + 1
}

/// Two distinct cut indices in [1, n-1], ordered low < high.
///
/// Returns `None` when fewer than two interior cut points exist (`n < 3`).
/// A second draw that lands on or after the first is shifted up by one, so
/// every unordered pair is equally likely and no retry is needed.
pub(crate) fn two_point_cuts(n: usize, rng: &mut impl RandomSource) -> Option<(usize, usize)> {
    if n < 3 {
        return None;
    }
    let first = rng.below(n - 1) + 1;
    let mut second = rng.below(n - 2) + 1;
    if second >= first {
        second += 1;
    }
    Some((first.min(second), first.max(second)))
}

/// Crossover precondition failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CrossoverError {
    #[error("Parents differ in length ({left} vs {right} triangles)")]
    LengthMismatch { left: usize, right: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::evolution::rng::{EvolutionRng, ScriptedRng};
    use crate::schema::{Triangle, Vertex};
    use proptest::prelude::*;

    /// Chromosome whose triangle `i` carries `tag` in its red channel and `i` in x.
    fn tagged(n: usize, tag: f32) -> Chromosome {
        Chromosome::from_triangles(
            (0..n)
                .map(|i| {
                    Triangle::new(
                        [Vertex::new(i as f32 / n as f32, 0.0); 3],
                        [tag, 0.0, 0.0, 1.0],
                    )
                })
                .collect(),
        )
    }

    fn sources(child: &Chromosome) -> Vec<char> {
        child
            .triangles()
            .iter()
            .map(|t| if t.color[0] == 0.0 { 'A' } else { 'B' })
            .collect()
    }

    #[test]
    fn test_one_point_layout() {
        let a = tagged(5, 0.0);
        let b = tagged(5, 1.0);
        // below(4) with 0.5 -> 2, cut = 3
        let mut rng = ScriptedRng::new(&[0.5]);
        let child = Crossover::OnePoint.combine(&a, &b, &mut rng).unwrap();
        assert_eq!(sources(&child), vec!['A', 'A', 'A', 'B', 'B']);
        assert!(child.fitness().is_none());
    }

    #[test]
    fn test_two_point_layout() {
        let a = tagged(6, 0.0);
        let b = tagged(6, 1.0);
        // first = below(5)+1 = 4; second = below(4)+1 = 1 -> cuts (1, 4)
        let mut rng = ScriptedRng::new(&[0.7, 0.0]);
        let child = Crossover::TwoPoint.combine(&a, &b, &mut rng).unwrap();
        assert_eq!(sources(&child), vec!['A', 'B', 'B', 'B', 'A', 'A']);
    }

    #[test]
    fn test_two_point_collision_is_shifted() {
        // first = below(5)+1 = 3; second = below(4)+1 = 3 collides -> 4
        let mut rng = ScriptedRng::new(&[0.5, 0.6]);
        assert_eq!(two_point_cuts(6, &mut rng), Some((3, 4)));
    }

    #[test]
    fn test_none_returns_parent_a() {
        let a = tagged(4, 0.0);
        let b = tagged(4, 1.0);
        let mut rng = EvolutionRng::new(1);
        let child = Crossover::None.combine(&a, &b, &mut rng).unwrap();
        assert_eq!(child.triangles(), a.triangles());
    }

    #[test]
    fn test_length_mismatch() {
        let mut rng = EvolutionRng::new(1);
        for kind in CrossoverType::ALL {
            let err = Crossover::from(kind)
                .combine(&tagged(3, 0.0), &tagged(4, 1.0), &mut rng)
                .unwrap_err();
            assert_eq!(err, CrossoverError::LengthMismatch { left: 3, right: 4 });
        }
    }

    #[test]
    fn test_tiny_genomes() {
        let mut rng = EvolutionRng::new(2);
        let child = Crossover::TwoPoint
            .combine(&tagged(1, 0.0), &tagged(1, 1.0), &mut rng)
            .unwrap();
        assert_eq!(sources(&child), vec!['A']);

        let child = Crossover::TwoPoint
            .combine(&tagged(2, 0.0), &tagged(2, 1.0), &mut rng)
            .unwrap();
        assert_eq!(sources(&child), vec!['A', 'B']);
    }

    proptest! {
        #[test]
        fn prop_child_genes_come_from_parent_at_same_index(
            seed in any::<u64>(),
            n in 1usize..30,
            kind in prop::sample::select(CrossoverType::ALL.to_vec()),
        ) {
            let mut rng = EvolutionRng::new(seed);
            let a = Chromosome::create_random(n, &mut rng);
            let b = Chromosome::create_random(n, &mut rng);
            let child = Crossover::from(kind).combine(&a, &b, &mut rng).unwrap();
            prop_assert_eq!(child.len(), n);
            for i in 0..n {
                prop_assert!(child[i] == a[i] || child[i] == b[i]);
            }
        }

        #[test]
        fn prop_two_point_ranges_partition_genome(seed in any::<u64>(), n in 3usize..64) {
            let mut rng = EvolutionRng::new(seed);
            let (lo, hi) = two_point_cuts(n, &mut rng).unwrap();
            prop_assert!(1 <= lo && lo < hi && hi <= n - 1);
            // [0, lo) + [lo, hi) + [hi, n) cover n exactly once
            prop_assert_eq!(lo + (hi - lo) + (n - hi), n);

            let child = Crossover::TwoPoint
                .combine(&tagged(n, 0.0), &tagged(n, 1.0), &mut EvolutionRng::new(seed))
                .unwrap();
            let expected: Vec<char> = (0..n)
                .map(|i| if i >= lo && i < hi { 'B' } else { 'A' })
                .collect();
            prop_assert_eq!(sources(&child), expected);
        }
    }
}
