//! Configuration types for the evolutionary solver and the annealer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Top-level solver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Number of chromosomes evolved per generation.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Number of triangles per chromosome, fixed after construction.
    #[serde(default = "default_genome_size")]
    pub genome_size: usize,
    /// Fraction of the population discarded before breeding (0.0-1.0).
    #[serde(default = "default_cleansing_rate")]
    pub cleansing_rate: f32,
    /// Recombination operator.
    #[serde(default)]
    pub crossover_type: CrossoverType,
    /// Survivor selection operator.
    #[serde(default)]
    pub selection_type: SelectionType,
    /// Contestants per tournament (only used by tournament selection).
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
    /// Rasterizer backend.
    #[serde(default)]
    pub renderer: RendererKind,
    /// Clear colour of every render target (RGBA8).
    #[serde(default = "default_background")]
    pub background: [u8; 4],
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            genome_size: default_genome_size(),
            cleansing_rate: default_cleansing_rate(),
            crossover_type: CrossoverType::default(),
            selection_type: SelectionType::default(),
            tournament_size: default_tournament_size(),
            renderer: RendererKind::default(),
            background: default_background(),
            random_seed: None,
        }
    }
}

fn default_population_size() -> usize {
    32
}
fn default_genome_size() -> usize {
    100
}
fn default_cleansing_rate() -> f32 {
    0.5
}
fn default_tournament_size() -> usize {
    3
}
fn default_background() -> [u8; 4] {
    [0, 0, 0, 255]
}

impl SolverConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SolverConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Number of chromosomes kept by selection: `population_size * (1 - cleansing_rate)`,
    /// truncated toward zero, at least 1.
    pub fn survivor_count(&self) -> usize {
        survivor_count(self.population_size, self.cleansing_rate)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::PopulationTooSmall(self.population_size));
        }
        if self.genome_size == 0 {
            return Err(ConfigError::EmptyGenome);
        }
        if !(0.0..=1.0).contains(&self.cleansing_rate) {
            return Err(ConfigError::InvalidCleansingRate(self.cleansing_rate));
        }
        if self.selection_type == SelectionType::Tournament && self.tournament_size == 0 {
            return Err(ConfigError::InvalidTournamentSize);
        }
        self.renderer.ensure_available()
    }
}

/// Survivor count for a population of `population_size` with the given cleansing rate.
///
/// `floor(n * (1 - rate))`, at least 1. The rate is an `f32`, so 0.1 is
/// stored slightly above one tenth; the product is nudged by one `f32`
/// epsilon per member before truncating so that 10 * 0.9 keeps 9.
pub fn survivor_count(population_size: usize, cleansing_rate: f32) -> usize {
    let n = population_size as f64;
    let exact = n * (1.0 - cleansing_rate as f64);
    let keep = (exact + n * f32::EPSILON as f64).floor() as usize;
    keep.min(population_size).max(1)
}

/// Crossover operator selection.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverType {
    /// Single cut point, prefix from the first parent.
    OnePoint,
    /// Two cut points, middle segment from the second parent.
    #[default]
    TwoPoint,
    /// Each gene drawn independently from either parent.
    Uniform,
    /// No recombination: the first parent is copied.
    None,
}

impl CrossoverType {
    /// All variants, in display order.
    pub const ALL: [CrossoverType; 4] = [
        CrossoverType::OnePoint,
        CrossoverType::TwoPoint,
        CrossoverType::Uniform,
        CrossoverType::None,
    ];
}

impl fmt::Display for CrossoverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CrossoverType::OnePoint => "One Point",
            CrossoverType::TwoPoint => "Two Point",
            CrossoverType::Uniform => "Uniform",
            CrossoverType::None => "None",
        };
        f.write_str(name)
    }
}

impl FromStr for CrossoverType {
    type Err = ConfigError;

    /// Accepts snake_case, CamelCase or display names, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "onepoint" => Ok(CrossoverType::OnePoint),
            "twopoint" => Ok(CrossoverType::TwoPoint),
            "uniform" => Ok(CrossoverType::Uniform),
            "none" => Ok(CrossoverType::None),
            _ => Err(ConfigError::UnknownCrossover(s.to_string())),
        }
    }
}

/// Selection operator selection.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionType {
    /// Roulette wheel over normalized cumulative fitness.
    FitnessProportionate,
    /// Evenly spaced pointers over the roulette wheel.
    StochasticUniversalSampling,
    /// Repeated k-way contests.
    Tournament,
    /// Keep the fittest fraction.
    #[default]
    Truncation,
}

impl SelectionType {
    /// All variants, in display order.
    pub const ALL: [SelectionType; 4] = [
        SelectionType::FitnessProportionate,
        SelectionType::StochasticUniversalSampling,
        SelectionType::Tournament,
        SelectionType::Truncation,
    ];
}

impl fmt::Display for SelectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectionType::FitnessProportionate => "Fitness Proportionate Selection",
            SelectionType::StochasticUniversalSampling => "Stochastic Universal Sampling",
            SelectionType::Tournament => "Tournament Selection",
            SelectionType::Truncation => "Truncation Selection",
        };
        f.write_str(name)
    }
}

impl FromStr for SelectionType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = normalize_name(s);
        let name = name.strip_suffix("selection").unwrap_or(&name);
        match name {
            "fitnessproportionate" | "roulette" | "roulettewheel" => {
                Ok(SelectionType::FitnessProportionate)
            }
            "stochasticuniversalsampling" | "sus" => Ok(SelectionType::StochasticUniversalSampling),
            "tournament" => Ok(SelectionType::Tournament),
            "truncation" => Ok(SelectionType::Truncation),
            _ => Err(ConfigError::UnknownSelection(s.to_string())),
        }
    }
}

/// Rasterizer backend.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    /// Scanline rasterizer on the calling thread.
    #[default]
    Cpu,
    /// wgpu compute rasterizer (requires the `gpu` feature).
    Gpu,
}

impl RendererKind {
    /// Fail if this backend was not compiled in.
    pub fn ensure_available(self) -> Result<(), ConfigError> {
        match self {
            RendererKind::Cpu => Ok(()),
            RendererKind::Gpu if cfg!(feature = "gpu") => Ok(()),
            RendererKind::Gpu => Err(ConfigError::UnsupportedRenderer(
                "gpu renderer requires the `gpu` feature".to_string(),
            )),
        }
    }
}

impl FromStr for RendererKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "cpu" => Ok(RendererKind::Cpu),
            "gpu" | "wgpu" => Ok(RendererKind::Gpu),
            _ => Err(ConfigError::UnsupportedRenderer(s.to_string())),
        }
    }
}

/// Lowercase, alphanumerics only: "Two Point", "two_point" and "TwoPoint" compare equal.
fn normalize_name(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

macro_rules! deserialize_from_str {
    ($($ty:ty),*) => {
        $(
            impl<'de> Deserialize<'de> for $ty {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: serde::Deserializer<'de>,
                {
                    let name = String::deserialize(deserializer)?;
                    name.parse().map_err(serde::de::Error::custom)
                }
            }
        )*
    };
}

deserialize_from_str!(CrossoverType, SelectionType, RendererKind);

// ============================================================================
// Annealing
// ============================================================================

/// Configuration for single-chromosome simulated annealing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnealingConfig {
    /// Number of triangles in the chromosome.
    #[serde(default = "default_annealing_genome_size")]
    pub genome_size: usize,
    /// Temperature schedule.
    #[serde(default)]
    pub schedule: CoolingSchedule,
    /// Rasterizer backend.
    #[serde(default)]
    pub renderer: RendererKind,
    /// Clear colour of the render targets (RGBA8).
    #[serde(default = "default_background")]
    pub background: [u8; 4],
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            genome_size: default_annealing_genome_size(),
            schedule: CoolingSchedule::default(),
            renderer: RendererKind::default(),
            background: default_background(),
            random_seed: None,
        }
    }
}

fn default_annealing_genome_size() -> usize {
    1000
}

impl AnnealingConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.genome_size == 0 {
            return Err(ConfigError::EmptyGenome);
        }
        self.schedule.validate()?;
        self.renderer.ensure_available()
    }
}

/// Temperature as a function of the (1-based) iteration number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type")]
pub enum CoolingSchedule {
    /// Geman & Geman logarithmic cooling: `c / ln(i + 1)`.
    GemanGeman { c: f32 },
    /// `1 / i`.
    #[default]
    Reciprocal,
    /// `initial * ratio^i`.
    Geometric { initial: f32, ratio: f32 },
}

impl CoolingSchedule {
    /// Geman & Geman constants for slow, medium and fast-starting cooling.
    pub const PRESETS: [CoolingSchedule; 3] = [
        CoolingSchedule::GemanGeman { c: 1.0 },
        CoolingSchedule::GemanGeman { c: 50.0 },
        CoolingSchedule::GemanGeman { c: 195075.0 },
    ];

    /// Temperature at iteration `i` (i >= 1).
    pub fn temperature(&self, i: u64) -> f32 {
        let i = i.max(1) as f64;
        let t = match *self {
            CoolingSchedule::GemanGeman { c } => c as f64 / (i + 1.0).ln(),
            CoolingSchedule::Reciprocal => 1.0 / i,
            CoolingSchedule::Geometric { initial, ratio } => {
                initial as f64 * (ratio as f64).powf(i)
            }
        };
        t as f32
    }

    fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            CoolingSchedule::GemanGeman { c } if !(c.is_finite() && c > 0.0) => {
                Err(ConfigError::InvalidSchedule(format!(
                    "Geman & Geman constant {} must be positive and finite",
                    c
                )))
            }
            CoolingSchedule::Geometric { initial, ratio }
                if !(initial.is_finite() && initial > 0.0 && ratio > 0.0 && ratio < 1.0) =>
            {
                Err(ConfigError::InvalidSchedule(format!(
                    "geometric schedule needs initial > 0 and 0 < ratio < 1 (got {}, {})",
                    initial, ratio
                )))
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// Run limits
// ============================================================================

/// Stopping criteria for `Solver::run_with_callback`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLimits {
    /// Maximum number of generations.
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Stop once the elite fitness reaches this value.
    #[serde(default)]
    pub target_fitness: Option<f32>,
    /// Stop after this many generations without elite improvement.
    #[serde(default)]
    pub stagnation_limit: Option<usize>,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_generations: default_max_generations(),
            target_fitness: None,
            stagnation_limit: None,
        }
    }
}

fn default_max_generations() -> usize {
    1000
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be at least 2 (got {0})")]
    PopulationTooSmall(usize),
    #[error("Genome size must be non-zero")]
    EmptyGenome,
    #[error("Cleansing rate must lie in [0, 1] (got {0})")]
    InvalidCleansingRate(f32),
    #[error("Tournament size must be non-zero")]
    InvalidTournamentSize,
    #[error("Unknown crossover type '{0}'")]
    UnknownCrossover(String),
    #[error("Unknown selection type '{0}'")]
    UnknownSelection(String),
    #[error("Unsupported renderer: {0}")]
    UnsupportedRenderer(String),
    #[error("Invalid cooling schedule: {0}")]
    InvalidSchedule(String),
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
