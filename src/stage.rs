//! the generation orchestrator. one `ScaleStage` owns one population pair,
//! one target, one working surface, and drives the per-generation dispatch
//! sequence: evaluate -> distribute -> select -> crossover/mutate -> swap.
//!
//! construction validates every divisibility invariant up front; a stage
//! that exists is a stage that can run. the terminal state is modeled by
//! ownership: `finish(self)` consumes the stage, so no further operation
//! on a finished stage can be expressed.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tiny_skia as sk;

use crate::brush::BrushSet;
use crate::crossover::{crossover_mutate, MutationRules};
use crate::dna::{GeneSpace, PopulationPair};
use crate::error::StageError;
use crate::fitness::FitnessEvaluator;
use crate::render::{demultiply, premultiply, StrokeRenderer};
use crate::selection::{build_distribution, select_parents, ParentPair};
use crate::settings::{Balancing, StageSettings};
use crate::stats::{FittestMember, GenerationStats};

/// decorrelates per-generation seeds from the master stream
const GENERATION_SEED_MIX: u64 = 0xA076_1D64_78BD_642F;

/// one resolution level of the coarse-to-fine pipeline
pub struct ScaleStage {
    settings: StageSettings,
    stage_id: u32,
    rng: Pcg32,

    width: u32,
    height: u32,
    /// straight RGBA copy of the ground truth
    target_rgba: Vec<u8>,
    /// seed image, premultiplied; every member render starts from this
    base: sk::Pixmap,
    /// shared working surface, cleared before each member's render
    scratch: sk::Pixmap,
    /// the fittest member's render, refreshed once per generation; this is
    /// the image the stage hands off at teardown
    fittest_surface: sk::Pixmap,

    brushes: BrushSet,
    evaluator: FitnessEvaluator,
    population: PopulationPair,
    fitness: Vec<f32>,
    cumulative: Vec<f32>,
    parents: Vec<ParentPair>,
    fittest: FittestMember,
    generation: u32,
}

/// a finished stage's image, straight RGBA, ready to seed the next stage
pub struct StageOutput {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl ScaleStage {
    /// build a stage over a target image (straight RGBA8). `seed_rgba`
    /// initializes the working surface; `None` means a white canvas.
    /// fails fast on any configuration violation, before buffers exist.
    pub fn new(
        target_rgba: &[u8],
        width: u32,
        height: u32,
        seed_rgba: Option<&[u8]>,
        brushes: BrushSet,
        settings: StageSettings,
        stage_id: u32,
    ) -> Result<Self, StageError> {
        profiling::scope!("ScaleStage::new");
        settings.validate(width, height)?;
        if brushes.is_empty() {
            return Err(StageError::EmptyBrushSet);
        }

        let expected = (width as usize) * (height as usize) * 4;
        if target_rgba.len() != expected {
            return Err(StageError::TargetSizeMismatch {
                len: target_rgba.len(),
                expected,
                width,
                height,
            });
        }

        let size = sk::IntSize::from_wh(width, height)
            .ok_or(StageError::SurfaceAllocation { width, height })?;
        let base = match seed_rgba {
            Some(seed) => {
                if seed.len() != expected {
                    return Err(StageError::SeedSizeMismatch {
                        len: seed.len(),
                        expected,
                        width,
                        height,
                    });
                }
                sk::Pixmap::from_vec(premultiply(seed), size)
                    .ok_or(StageError::SurfaceAllocation { width, height })?
            }
            None => {
                let mut pix = sk::Pixmap::new(width, height)
                    .ok_or(StageError::SurfaceAllocation { width, height })?;
                pix.fill(sk::Color::from_rgba(1.0, 1.0, 1.0, 1.0).expect("opaque white"));
                pix
            }
        };
        let scratch = base.clone();
        let fittest_surface = base.clone();

        let ev = settings.evolution;
        let members = ev.population_count as usize;
        let mut rng = Pcg32::seed_from_u64(ev.seed ^ u64::from(stage_id));
        let space = GeneSpace {
            extent: [width as f32, height as f32],
            size_low: ev.brush_size_lower_bound,
            size_high: ev.brush_size_higher_bound,
            brush_count: brushes.len() as u32,
        };
        let population = PopulationPair::initialise(
            &mut rng,
            members,
            ev.genes_per_member as usize,
            &space,
            ev.monochrome,
        );

        Ok(Self {
            evaluator: FitnessEvaluator::new(width, height, settings.dispatch.fitness_tile),
            settings,
            stage_id,
            rng,
            width,
            height,
            target_rgba: target_rgba.to_vec(),
            base,
            scratch,
            fittest_surface,
            brushes,
            population,
            fitness: vec![0.0; members],
            cumulative: vec![0.0; members],
            parents: vec![ParentPair { a: 0, b: 0 }; members],
            fittest: FittestMember {
                id: 0,
                fitness: 0.0,
            },
            generation: 0,
        })
    }

    /// run one full generation and return its telemetry record
    pub fn step(&mut self) -> GenerationStats {
        profiling::scope!("ScaleStage::step");
        let members = self.population.members();
        let dispatch = self.settings.dispatch;

        // fitness: strictly sequential over members (they share the one
        // working surface), parallel within each member's evaluation.
        // the loop order is the barrier selection depends on.
        for i in 0..members {
            StrokeRenderer::render_member(
                &mut self.scratch,
                &self.base,
                self.population.member(i),
                &self.brushes,
            );
            let error = self.evaluator.member_error(
                &self.target_rgba,
                &self.scratch,
                &self.settings.fitness,
            );
            self.fitness[i] = self.evaluator.fitness_from_error(error);
        }

        let (total_mass, fittest) = build_distribution(
            &self.fitness,
            self.settings.fitness.fitness_pow_factor,
            dispatch.selection_group as usize,
            &mut self.cumulative,
        );
        self.fittest = fittest;

        // keep the stage surface showing the generation's best candidate;
        // this is what finish() hands off
        StrokeRenderer::render_member(
            &mut self.fittest_surface,
            &self.base,
            self.population.member(fittest.id as usize),
            &self.brushes,
        );

        // per-generation seed: master stream mixed with the generation
        // counter, so no two generations reuse the same draws
        let generation_seed = self.rng.random::<u64>()
            ^ u64::from(self.generation).wrapping_mul(GENERATION_SEED_MIX);

        select_parents(
            &self.cumulative,
            total_mass,
            dispatch.selection_group as usize,
            generation_seed,
            &mut self.parents,
        );

        let rules = MutationRules {
            rate: self.settings.evolution.mutation_rate,
            space: self.gene_space(),
            monochrome: self.settings.evolution.monochrome,
        };
        let genes_per_member = self.population.genes_per_member();
        let (current, next) = self.population.split();
        crossover_mutate(
            current,
            &self.parents,
            next,
            genes_per_member,
            dispatch.crossover_group as usize,
            &rules,
            generation_seed,
        );
        self.population.swap();

        let stats = GenerationStats {
            stage_id: self.stage_id,
            generation: self.generation,
            fittest_id: fittest.id,
            fittest_fitness: fittest.fitness,
        };
        self.generation += 1;

        log::debug!(
            "generation {}, stage {}, fittest member {} with fitness {}",
            stats.generation,
            stats.stage_id,
            stats.fittest_id,
            stats.fittest_fitness
        );
        stats
    }

    /// run up to the configured generation count, streaming telemetry.
    /// callers may instead drive `step` themselves and stop early; a stage
    /// is only ever torn down between generations.
    pub fn run(&mut self, mut on_generation: impl FnMut(&GenerationStats)) {
        profiling::scope!("ScaleStage::run");
        while self.generation < self.settings.evolution.generation_count {
            let stats = self.step();
            on_generation(&stats);
        }
    }

    /// replace the balancing parameters for subsequent generations
    pub fn retune(&mut self, balancing: Balancing) -> Result<(), StageError> {
        if balancing.brush_size_lower_bound > balancing.brush_size_higher_bound {
            return Err(StageError::BrushBoundsInverted {
                low: balancing.brush_size_lower_bound,
                high: balancing.brush_size_higher_bound,
            });
        }
        if !(0.0..=1.0).contains(&balancing.mutation_rate) {
            return Err(StageError::MutationRateOutOfRange(balancing.mutation_rate));
        }
        self.settings.evolution.mutation_rate = balancing.mutation_rate;
        self.settings.evolution.brush_size_lower_bound = balancing.brush_size_lower_bound;
        self.settings.evolution.brush_size_higher_bound = balancing.brush_size_higher_bound;
        self.settings.fitness = balancing.fitness;
        Ok(())
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn stage_id(&self) -> u32 {
        self.stage_id
    }

    /// latest fittest record, for telemetry readers
    pub fn fittest(&self) -> FittestMember {
        self.fittest
    }

    /// the current generation's genes (read-only)
    pub fn population(&self) -> &PopulationPair {
        &self.population
    }

    /// log the internal buffers at trace level. purely diagnostic; the
    /// pipeline never depends on it.
    pub fn trace_buffers(&self) {
        for (i, f) in self.fitness.iter().enumerate() {
            log::trace!("member {} has fitness {}", i, f);
        }
        for (i, c) in self.cumulative.iter().enumerate() {
            log::trace!("member {} has cumulative weighted probability {}", i, c);
        }
        for (i, p) in self.parents.iter().enumerate() {
            log::trace!("offspring {} has parents {} and {}", i, p.a, p.b);
        }
        log::trace!(
            "fittest member is {} with fitness {}",
            self.fittest.id,
            self.fittest.fitness
        );
    }

    /// tear the stage down, handing its surface to the caller. everything
    /// else the stage owned is released here.
    pub fn finish(self) -> StageOutput {
        profiling::scope!("ScaleStage::finish");
        StageOutput {
            rgba: demultiply(&self.fittest_surface),
            width: self.width,
            height: self.height,
        }
    }

    fn gene_space(&self) -> GeneSpace {
        let ev = &self.settings.evolution;
        GeneSpace {
            extent: [self.width as f32, self.height as f32],
            size_low: ev.brush_size_lower_bound,
            size_high: ev.brush_size_higher_bound,
            brush_count: self.brushes.len() as u32,
        }
    }
}

impl StageOutput {
    /// resample this stage's image to the next stage's resolution, the
    /// explicit coarse-to-fine handoff between scale stages
    pub fn resize_to(&self, width: u32, height: u32) -> StageOutput {
        profiling::scope!("StageOutput::resize_to");
        let buf = image::ImageBuffer::<image::Rgba<u8>, Vec<u8>>::from_raw(
            self.width,
            self.height,
            self.rgba.clone(),
        )
        .expect("stage output buffer matches its dimensions");
        let resized =
            image::imageops::resize(&buf, width, height, image::imageops::FilterType::CatmullRom);
        StageOutput {
            rgba: resized.into_raw(),
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{DispatchSettings, EvolutionSettings, FitnessSettings};

    fn tiny_settings() -> StageSettings {
        StageSettings {
            evolution: EvolutionSettings {
                population_count: 2,
                genes_per_member: 1,
                brush_size_lower_bound: 4.0,
                brush_size_higher_bound: 12.0,
                mutation_rate: 0.2,
                monochrome: false,
                generation_count: 1,
                seed: 1234,
            },
            fitness: FitnessSettings::default(),
            dispatch: DispatchSettings {
                fitness_tile: 16,
                selection_group: 2,
                crossover_group: 2,
            },
        }
    }

    fn gradient_target(w: u32, h: u32) -> Vec<u8> {
        let mut out = Vec::with_capacity((w * h * 4) as usize);
        for y in 0..h {
            for x in 0..w {
                out.push((x * 255 / w.max(1)) as u8);
                out.push((y * 255 / h.max(1)) as u8);
                out.push(128);
                out.push(255);
            }
        }
        out
    }

    fn new_stage(settings: StageSettings) -> Result<ScaleStage, StageError> {
        let target = gradient_target(32, 32);
        ScaleStage::new(&target, 32, 32, None, BrushSet::default_set(), settings, 0)
    }

    #[test]
    fn test_construction_rejects_bad_divisibility() {
        let mut settings = tiny_settings();
        settings.dispatch.fitness_tile = 30; // 32 % 30 != 0
        assert!(matches!(
            new_stage(settings),
            Err(StageError::ImageNotTileable { .. })
        ));
    }

    #[test]
    fn test_construction_rejects_wrong_target_size() {
        let target = gradient_target(32, 16);
        let result = ScaleStage::new(
            &target,
            32,
            32,
            None,
            BrushSet::default_set(),
            tiny_settings(),
            0,
        );
        assert!(matches!(result, Err(StageError::TargetSizeMismatch { .. })));
    }

    #[test]
    fn test_construction_rejects_wrong_seed_size() {
        let target = gradient_target(32, 32);
        let seed = gradient_target(16, 16);
        let result = ScaleStage::new(
            &target,
            32,
            32,
            Some(&seed),
            BrushSet::default_set(),
            tiny_settings(),
            0,
        );
        assert!(matches!(result, Err(StageError::SeedSizeMismatch { .. })));
    }

    #[test]
    fn test_one_generation_is_reproducible() {
        let mut a = new_stage(tiny_settings()).unwrap();
        let mut b = new_stage(tiny_settings()).unwrap();

        let stats_a = a.step();
        let stats_b = b.step();

        assert_eq!(stats_a.fittest_id, stats_b.fittest_id);
        assert_eq!(stats_a.fittest_fitness, stats_b.fittest_fitness);
        // the populations produced for the next generation are identical
        assert_eq!(a.population().current(), b.population().current());
    }

    #[test]
    fn test_generation_counter_advances() {
        let mut settings = tiny_settings();
        settings.evolution.generation_count = 3;
        let mut stage = new_stage(settings).unwrap();

        let mut seen = Vec::new();
        stage.run(|stats| seen.push(stats.generation));
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(stage.generation(), 3);
    }

    #[test]
    fn test_fittest_id_is_in_range() {
        let mut stage = new_stage(tiny_settings()).unwrap();
        let stats = stage.step();
        assert!(stats.fittest_id < 2);
        assert!(stats.fittest_fitness > 0.0 && stats.fittest_fitness <= 1.0);
    }

    #[test]
    fn test_monochrome_stage_stays_monochrome() {
        let mut settings = tiny_settings();
        settings.evolution.monochrome = true;
        settings.evolution.mutation_rate = 1.0;
        settings.evolution.generation_count = 3;
        let mut stage = new_stage(settings).unwrap();

        stage.run(|_| {});
        for gene in stage.population().current() {
            assert_eq!(gene.color, crate::dna::INK);
        }
    }

    #[test]
    fn test_finish_hands_off_an_image_of_stage_dimensions() {
        let mut stage = new_stage(tiny_settings()).unwrap();
        stage.step();
        let out = stage.finish();
        assert_eq!(out.width, 32);
        assert_eq!(out.height, 32);
        assert_eq!(out.rgba.len(), 32 * 32 * 4);
    }

    #[test]
    fn test_stage_chaining_through_resized_seed() {
        let mut coarse = new_stage(tiny_settings()).unwrap();
        coarse.step();
        let seed = coarse.finish().resize_to(64, 64);
        assert_eq!(seed.rgba.len(), 64 * 64 * 4);

        let target = gradient_target(64, 64);
        let mut fine = ScaleStage::new(
            &target,
            64,
            64,
            Some(&seed.rgba),
            BrushSet::default_set(),
            tiny_settings(),
            1,
        )
        .unwrap();
        let stats = fine.step();
        assert_eq!(stats.stage_id, 1);
    }

    #[test]
    fn test_retune_validates_balancing() {
        let mut stage = new_stage(tiny_settings()).unwrap();
        let bad = Balancing {
            mutation_rate: 2.0,
            brush_size_lower_bound: 4.0,
            brush_size_higher_bound: 12.0,
            fitness: FitnessSettings::default(),
        };
        assert!(matches!(
            stage.retune(bad),
            Err(StageError::MutationRateOutOfRange(_))
        ));

        let good = Balancing {
            mutation_rate: 0.5,
            brush_size_lower_bound: 2.0,
            brush_size_higher_bound: 20.0,
            fitness: FitnessSettings::default(),
        };
        assert!(stage.retune(good).is_ok());
        stage.step();
    }
}
