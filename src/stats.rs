/// telemetry records streamed out of a running stage. read-only for
/// consumers; the stage overwrites its fittest record every generation.
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittestMember {
    pub id: u32,
    pub fitness: f32,
}

/// one line of per-generation telemetry
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GenerationStats {
    pub stage_id: u32,
    pub generation: u32,
    pub fittest_id: u32,
    pub fittest_fitness: f32,
}
