/// balancing and dispatch settings for a scale stage.
/// an external tuning component may rewrite the balancing fields between
/// generations; the stage re-reads them at the top of every generation.
use serde::{Deserialize, Serialize};

use crate::error::StageError;

/// population pool, genome and mutation parameters
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EvolutionSettings {
    /// number of members in the population pool (M)
    pub population_count: u32,
    /// maximum brush strokes per member (G); every chromosome has exactly this many genes
    pub genes_per_member: u32,
    /// stroke extent bounds in pixels, applied to both axes independently
    pub brush_size_lower_bound: f32,
    pub brush_size_higher_bound: f32,
    /// per-gene chance of a mutation after crossover (0.0-1.0)
    pub mutation_rate: f32,
    /// monochrome stages never randomize or mutate color channels
    pub monochrome: bool,
    /// generations to run before the stage hands off its image
    pub generation_count: u32,
    /// master seed for the stage's random streams; fixed seed = reproducible run
    pub seed: u64,
}

impl Default for EvolutionSettings {
    fn default() -> Self {
        Self {
            population_count: 64,
            genes_per_member: 128,
            brush_size_lower_bound: 8.0,
            brush_size_higher_bound: 48.0,
            mutation_rate: 0.05,
            monochrome: false,
            generation_count: 400,
            seed: 0xDEAD_BEEF,
        }
    }
}

/// balancing parameters of the fitness function
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FitnessSettings {
    /// per-channel weights of the HSV pixel distance
    pub hue_weight: f32,
    pub sat_weight: f32,
    pub val_weight: f32,
    /// exponent applied to fitness before building the selection
    /// distribution; higher values sharpen selection toward fit members
    pub fitness_pow_factor: f32,
}

impl Default for FitnessSettings {
    fn default() -> Self {
        Self {
            hue_weight: 0.4,
            sat_weight: 0.2,
            val_weight: 0.4,
            fitness_pow_factor: 2.0,
        }
    }
}

/// work-group sizes of the parallel dispatches. a dispatch whose workload
/// does not divide evenly by its group size is a configuration error, so
/// these interact with the image dimensions and the population shape;
/// `validate` checks the whole bundle at stage construction.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DispatchSettings {
    /// fitness evaluation tiles the image into groups of this many rows,
    /// and each row into runs of this many pixels
    pub fitness_tile: u32,
    /// parent selection processes offspring slots in groups of this size
    pub selection_group: u32,
    /// crossover/mutation processes genes in groups of this size
    pub crossover_group: u32,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            fitness_tile: 32,
            selection_group: 16,
            crossover_group: 128,
        }
    }
}

/// the subset of parameters an external tuning component may replace
/// between generations. passed explicitly into `ScaleStage::retune`, never
/// mutated through ambient shared state.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Balancing {
    pub mutation_rate: f32,
    pub brush_size_lower_bound: f32,
    pub brush_size_higher_bound: f32,
    pub fitness: FitnessSettings,
}

/// everything a scale stage needs besides its images and brushes
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct StageSettings {
    pub evolution: EvolutionSettings,
    pub fitness: FitnessSettings,
    pub dispatch: DispatchSettings,
}

impl StageSettings {
    /// check every divisibility and range invariant against the target
    /// image dimensions. called by stage construction; a failure here is
    /// fatal to the stage before any buffer is allocated.
    pub fn validate(&self, width: u32, height: u32) -> Result<(), StageError> {
        let ev = &self.evolution;
        let dp = &self.dispatch;

        if dp.fitness_tile == 0 || dp.selection_group == 0 || dp.crossover_group == 0 {
            return Err(StageError::ZeroGroupSize);
        }
        if width % dp.fitness_tile != 0 || height % dp.fitness_tile != 0 {
            return Err(StageError::ImageNotTileable {
                width,
                height,
                tile: dp.fitness_tile,
            });
        }
        if ev.population_count < 2 {
            return Err(StageError::PopulationTooSmall(ev.population_count));
        }
        if ev.genes_per_member == 0 {
            return Err(StageError::EmptyChromosome);
        }
        if ev.population_count % dp.selection_group != 0 {
            return Err(StageError::PopulationNotDivisible {
                population: ev.population_count,
                group: dp.selection_group,
            });
        }
        let total_genes = ev.population_count * ev.genes_per_member;
        if total_genes % dp.crossover_group != 0 {
            return Err(StageError::GenesNotDivisible {
                genes: total_genes,
                group: dp.crossover_group,
            });
        }
        if ev.brush_size_lower_bound > ev.brush_size_higher_bound {
            return Err(StageError::BrushBoundsInverted {
                low: ev.brush_size_lower_bound,
                high: ev.brush_size_higher_bound,
            });
        }
        if !(0.0..=1.0).contains(&ev.mutation_rate) {
            return Err(StageError::MutationRateOutOfRange(ev.mutation_rate));
        }
        Ok(())
    }

    /// save settings to a JSON file
    pub fn save(&self, path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// load settings from a JSON file
    pub fn load(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
