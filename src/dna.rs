use rand::Rng;
use serde::{Deserialize, Serialize};

/// fixed ink color used by every gene in monochrome mode. initialization
/// assigns it and mutation never touches it, so monochrome stays monochrome
/// for the whole lifetime of a stage.
pub const INK: [f32; 3] = [0.0, 0.0, 0.0];

/// one parametric brush stroke. flat and `Copy` so a population is a single
/// contiguous buffer with no internal pointers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    /// stroke center in pixel coordinates of the working surface
    pub position: [f32; 2],
    /// rotation in radians
    pub rotation: f32,
    /// stroke extent in pixels (width, height), within the configured bounds
    pub scale: [f32; 2],
    /// straight RGB in [0, 1]
    pub color: [f32; 3],
    /// index into the stage's brush set
    pub texture_id: u32,
}

/// the randomization domain shared by initial population construction and
/// mutation. both draw from the same distributions, so a mutated gene is
/// always a gene that could have been created at init time.
#[derive(Clone, Copy, Debug)]
pub struct GeneSpace {
    /// working surface extent in pixels (width, height)
    pub extent: [f32; 2],
    pub size_low: f32,
    pub size_high: f32,
    pub brush_count: u32,
}

impl Gene {
    /// draw a fully random gene. in monochrome mode the color channels keep
    /// the fixed ink value instead of being randomized.
    pub fn random<R: Rng>(rng: &mut R, space: &GeneSpace, monochrome: bool) -> Self {
        let mut gene = Gene {
            position: [0.0, 0.0],
            rotation: 0.0,
            scale: [0.0, 0.0],
            color: INK,
            texture_id: 0,
        };
        gene.reroll_pose(rng, space);
        if !monochrome {
            gene.reroll_color(rng);
        }
        gene
    }

    /// re-randomize position, rotation, scale and texture within the space.
    /// color is left untouched; callers decide whether color may change.
    pub fn reroll_pose<R: Rng>(&mut self, rng: &mut R, space: &GeneSpace) {
        self.position = [
            rng.random::<f32>() * space.extent[0],
            rng.random::<f32>() * space.extent[1],
        ];
        self.rotation = rng.random::<f32>() * std::f32::consts::TAU;
        self.scale = [
            rng.random_range(space.size_low..=space.size_high),
            rng.random_range(space.size_low..=space.size_high),
        ];
        self.texture_id = rng.random_range(0..space.brush_count);
    }

    pub fn reroll_color<R: Rng>(&mut self, rng: &mut R) {
        self.color = [rng.random(), rng.random(), rng.random()];
    }
}

/// the stage's two population buffers in strict alternation. "current" is
/// what fitness evaluation and crossover read; "next" is what crossover
/// writes. they are separate allocations for their whole lifetime, and
/// `split` hands out `(&current, &mut next)` so the borrow checker rules
/// out any same-buffer read/write overlap.
pub struct PopulationPair {
    current: Vec<Gene>,
    next: Vec<Gene>,
    members: usize,
    genes_per_member: usize,
}

impl PopulationPair {
    /// allocate both buffers and fill "current" with M*G random genes.
    /// "next" starts as a copy; its contents are fully overwritten by the
    /// first crossover dispatch before anything reads them.
    pub fn initialise<R: Rng>(
        rng: &mut R,
        members: usize,
        genes_per_member: usize,
        space: &GeneSpace,
        monochrome: bool,
    ) -> Self {
        profiling::scope!("PopulationPair::initialise");
        let total = members * genes_per_member;
        let current: Vec<Gene> = (0..total)
            .map(|_| Gene::random(rng, space, monochrome))
            .collect();
        let next = current.clone();
        Self {
            current,
            next,
            members,
            genes_per_member,
        }
    }

    pub fn members(&self) -> usize {
        self.members
    }

    pub fn genes_per_member(&self) -> usize {
        self.genes_per_member
    }

    /// the generation currently being evaluated
    pub fn current(&self) -> &[Gene] {
        &self.current
    }

    /// one member's chromosome as a slice of the flat buffer
    pub fn member(&self, index: usize) -> &[Gene] {
        let start = index * self.genes_per_member;
        &self.current[start..start + self.genes_per_member]
    }

    /// simultaneous read access to "current" and write access to "next",
    /// for the crossover/mutation dispatch
    pub fn split(&mut self) -> (&[Gene], &mut [Gene]) {
        (&self.current, &mut self.next)
    }

    /// promote "next" to "current". called exactly once per generation,
    /// after the crossover dispatch has completed.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn space() -> GeneSpace {
        GeneSpace {
            extent: [64.0, 32.0],
            size_low: 4.0,
            size_high: 10.0,
            brush_count: 3,
        }
    }

    #[test]
    fn test_random_gene_respects_bounds() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..200 {
            let g = Gene::random(&mut rng, &space(), false);
            assert!(g.position[0] >= 0.0 && g.position[0] < 64.0);
            assert!(g.position[1] >= 0.0 && g.position[1] < 32.0);
            assert!(g.scale[0] >= 4.0 && g.scale[0] <= 10.0);
            assert!(g.scale[1] >= 4.0 && g.scale[1] <= 10.0);
            assert!(g.texture_id < 3);
            assert!(g.rotation >= 0.0 && g.rotation < std::f32::consts::TAU + 1e-5);
        }
    }

    #[test]
    fn test_monochrome_gene_keeps_ink_color() {
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..100 {
            let g = Gene::random(&mut rng, &space(), true);
            assert_eq!(g.color, INK);
        }
    }

    #[test]
    fn test_swap_promotes_next_to_current() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut pop = PopulationPair::initialise(&mut rng, 2, 2, &space(), false);

        let written: Vec<Gene> = (0..4)
            .map(|_| Gene::random(&mut rng, &space(), false))
            .collect();
        {
            let (_, next) = pop.split();
            next.copy_from_slice(&written);
        }
        pop.swap();

        // reading "current" after the swap yields exactly what was written
        // as "next", not the pre-swap contents
        assert_eq!(pop.current(), written.as_slice());
    }

    #[test]
    fn test_member_slices_tile_the_buffer() {
        let mut rng = Pcg32::seed_from_u64(11);
        let pop = PopulationPair::initialise(&mut rng, 4, 3, &space(), false);
        assert_eq!(pop.current().len(), 12);
        for i in 0..4 {
            assert_eq!(pop.member(i), &pop.current()[i * 3..i * 3 + 3]);
        }
    }
}
