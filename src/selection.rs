//! fitness -> selection distribution -> parent pairs.
//!
//! the cumulative distribution is rebuilt from scratch every generation
//! with a blocked parallel prefix sum (block scans in parallel, a serial
//! exclusive scan over the small block-sum array, then a parallel offset
//! broadcast). a single serial fold over the whole population would
//! serialize the dispatch, which is exactly the inefficiency this
//! pipeline is meant to avoid.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use rayon::prelude::*;

use crate::stats::FittestMember;

/// parent indices for one offspring slot. a and b may coincide;
/// self-crossover is permitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParentPair {
    pub a: u32,
    pub b: u32,
}

/// large odd constant for decorrelating per-slot seed streams
const SLOT_SEED_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// raise each fitness to `pow_factor`, build the cumulative distribution
/// in `cumulative`, and return (total mass, fittest member).
///
/// the fittest member is tracked on the raw fitness values (the power
/// transform is monotonic, so the winner is the same and telemetry gets
/// the unadjusted number); ties break toward the lowest index.
pub fn build_distribution(
    fitness: &[f32],
    pow_factor: f32,
    group: usize,
    cumulative: &mut [f32],
) -> (f32, FittestMember) {
    profiling::scope!("build_distribution");
    debug_assert_eq!(fitness.len(), cumulative.len());
    debug_assert_eq!(fitness.len() % group, 0);

    // phase 1: power-adjust and scan within each block
    let blocks = fitness.len() / group;
    let mut block_sums = vec![0.0f32; blocks];
    cumulative
        .par_chunks_exact_mut(group)
        .zip(fitness.par_chunks_exact(group))
        .zip(block_sums.par_iter_mut())
        .for_each(|((out, fit), block_sum)| {
            let mut acc = 0.0f32;
            for (slot, &f) in out.iter_mut().zip(fit) {
                // unit power is the common case and must not pay for powf
                acc += if pow_factor == 1.0 { f } else { f.powf(pow_factor) };
                *slot = acc;
            }
            *block_sum = acc;
        });

    // phase 2: exclusive scan of the block sums. the array is M/group
    // entries, small enough that a serial pass is the right tool.
    let mut offsets = block_sums;
    let mut running = 0.0f32;
    for off in offsets.iter_mut() {
        let block_total = *off;
        *off = running;
        running += block_total;
    }
    let total_mass = running;

    // phase 3: broadcast each block's offset
    cumulative
        .par_chunks_exact_mut(group)
        .zip(offsets.par_iter())
        .for_each(|(out, &off)| {
            for slot in out.iter_mut() {
                *slot += off;
            }
        });

    let fittest = fitness
        .par_iter()
        .enumerate()
        .map(|(id, &fitness)| FittestMember {
            id: id as u32,
            fitness,
        })
        .reduce(
            || FittestMember {
                id: u32::MAX,
                fitness: f32::NEG_INFINITY,
            },
            |best, cand| {
                if cand.fitness > best.fitness
                    || (cand.fitness == best.fitness && cand.id < best.id)
                {
                    cand
                } else {
                    best
                }
            },
        );

    (total_mass, fittest)
}

/// fill one ParentPair per offspring slot by weighted sampling over the
/// cumulative distribution. every slot derives its own deterministic RNG
/// from the per-generation seed, so workers draw independent streams and
/// a rerun with the same seed reproduces the same pairs.
pub fn select_parents(
    cumulative: &[f32],
    total_mass: f32,
    group: usize,
    seed: u64,
    out: &mut [ParentPair],
) {
    profiling::scope!("select_parents");
    debug_assert_eq!(out.len() % group, 0);

    out.par_chunks_exact_mut(group)
        .enumerate()
        .for_each(|(block, slots)| {
            for (offset, slot) in slots.iter_mut().enumerate() {
                let slot_id = (block * group + offset) as u64;
                let mut rng =
                    Pcg32::seed_from_u64(seed ^ slot_id.wrapping_mul(SLOT_SEED_MIX));
                *slot = ParentPair {
                    a: sample_index(cumulative, total_mass, &mut rng),
                    b: sample_index(cumulative, total_mass, &mut rng),
                };
            }
        });
}

/// smallest index whose cumulative value is >= the draw
fn sample_index(cumulative: &[f32], total_mass: f32, rng: &mut Pcg32) -> u32 {
    let draw = rng.random::<f32>() * total_mass;
    let idx = cumulative.partition_point(|&c| c < draw);
    // float rounding at the top of the distribution must not escape the pool
    idx.min(cumulative.len() - 1) as u32
}
