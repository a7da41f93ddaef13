//! crossover + mutation: the only writer of the "next" population buffer.
//!
//! each offspring gene position is an independent unit of work: coin-flip
//! one of the slot's two parents, copy that parent's gene at the same
//! locus, then maybe re-randomize it. the dispatch reads only "current"
//! (shared borrow) and writes only "next" (exclusive borrow), so a
//! read/write overlap cannot compile, let alone race.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use rayon::prelude::*;

use crate::dna::{Gene, GeneSpace};
use crate::selection::ParentPair;

/// decorrelates per-gene seed streams from the parent-selection streams
const GENE_SEED_MIX: u64 = 0xD1B5_4A32_D192_ED03;

/// mutation inputs re-read from the settings every generation
#[derive(Clone, Copy, Debug)]
pub struct MutationRules {
    /// per-gene perturbation chance in [0, 1]
    pub rate: f32,
    /// randomization domain for perturbed genes
    pub space: GeneSpace,
    /// monochrome offspring never have their color channels touched
    pub monochrome: bool,
}

/// produce the next generation. `current` and `next` both hold
/// members * genes_per_member genes; `parents` holds one pair per member.
pub fn crossover_mutate(
    current: &[Gene],
    parents: &[ParentPair],
    next: &mut [Gene],
    genes_per_member: usize,
    group: usize,
    rules: &MutationRules,
    seed: u64,
) {
    profiling::scope!("crossover_mutate");
    debug_assert_eq!(current.len(), next.len());
    debug_assert_eq!(current.len(), parents.len() * genes_per_member);
    debug_assert_eq!(next.len() % group, 0);

    next.par_chunks_exact_mut(group)
        .enumerate()
        .for_each(|(block, out)| {
            for (offset, gene) in out.iter_mut().enumerate() {
                let k = block * group + offset;
                let member = k / genes_per_member;
                let locus = k % genes_per_member;
                let mut rng =
                    Pcg32::seed_from_u64(seed ^ (k as u64).wrapping_mul(GENE_SEED_MIX));

                let pair = parents[member];
                let parent = if rng.random::<bool>() { pair.a } else { pair.b } as usize;
                *gene = current[parent * genes_per_member + locus];

                if rng.random::<f32>() < rules.rate {
                    gene.reroll_pose(&mut rng, &rules.space);
                    if !rules.monochrome {
                        gene.reroll_color(&mut rng);
                    }
                }
            }
        });
}
