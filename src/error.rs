use thiserror::Error;

/// configuration and resource errors raised at stage construction.
/// nothing here is recoverable by retrying with the same settings;
/// the stage refuses to run rather than silently truncating a dispatch.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("target image is {width}x{height}, which does not tile into {tile}x{tile} fitness groups")]
    ImageNotTileable { width: u32, height: u32, tile: u32 },

    #[error("population count {population} is not a multiple of the selection group size {group}")]
    PopulationNotDivisible { population: u32, group: u32 },

    #[error("total gene count {genes} is not a multiple of the crossover group size {group}")]
    GenesNotDivisible { genes: u32, group: u32 },

    #[error("population must have at least 2 members, got {0}")]
    PopulationTooSmall(u32),

    #[error("each member must carry at least 1 gene")]
    EmptyChromosome,

    #[error("brush size bounds are inverted: lower {low} > higher {high}")]
    BrushBoundsInverted { low: f32, high: f32 },

    #[error("mutation rate {0} is outside [0, 1]")]
    MutationRateOutOfRange(f32),

    #[error("dispatch group sizes must be nonzero")]
    ZeroGroupSize,

    #[error("brush set is empty")]
    EmptyBrushSet,

    #[error("brush mask {index} has zero dimensions or a data length that does not match them")]
    InvalidBrushMask { index: usize },

    #[error("target buffer holds {len} bytes, expected {expected} for {width}x{height} RGBA")]
    TargetSizeMismatch {
        len: usize,
        expected: usize,
        width: u32,
        height: u32,
    },

    #[error("seed image holds {len} bytes, expected {expected} for {width}x{height} RGBA")]
    SeedSizeMismatch {
        len: usize,
        expected: usize,
        width: u32,
        height: u32,
    },

    #[error("could not allocate a {width}x{height} working surface")]
    SurfaceAllocation { width: u32, height: u32 },
}
