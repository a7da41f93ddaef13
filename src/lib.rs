//! brushevo: approximates a target raster image by evolving populations of
//! textured brush strokes, in successive passes at increasing resolution.
//!
//! the crate is the per-generation compute pipeline only. callers supply a
//! target image, an optional seed image, a brush set and a settings bundle;
//! they get back per-generation telemetry and, once a stage finishes, an
//! image to present or to seed the next, finer stage with:
//!
//! ```no_run
//! use brushevo::{BrushSet, ScaleStage, StageSettings};
//!
//! # fn demo(target: Vec<u8>) -> Result<(), brushevo::StageError> {
//! let settings = StageSettings::default();
//! let mut stage = ScaleStage::new(&target, 512, 512, None, BrushSet::default_set(), settings, 0)?;
//! stage.run(|stats| println!("gen {} fittest {}", stats.generation, stats.fittest_fitness));
//! let image = stage.finish();
//! let _seed_for_next_stage = image.resize_to(1024, 1024);
//! # Ok(())
//! # }
//! ```

pub mod brush;
pub mod crossover;
pub mod dna;
pub mod error;
pub mod fitness;
pub mod render;
pub mod selection;
pub mod settings;
pub mod stage;
pub mod stats;

pub use brush::{BrushSet, BrushTexture};
pub use dna::{Gene, GeneSpace, PopulationPair};
pub use error::StageError;
pub use selection::ParentPair;
pub use settings::{Balancing, DispatchSettings, EvolutionSettings, FitnessSettings, StageSettings};
pub use stage::{ScaleStage, StageOutput};
pub use stats::{FittestMember, GenerationStats};
