// Fitness evaluation: render a member, compare it against the target in
// weighted HSV space, reduce the per-pixel errors to one scalar per member.

pub mod hsv;
pub mod reduce;

pub use hsv::{pixel_error, rgb_to_hsv};
pub use reduce::{reduce_rows, reduce_total};

use tiny_skia as sk;

use crate::settings::FitnessSettings;

/// per-member error accumulator. owns the row-sum buffer so the two-phase
/// reduction never reallocates between members or generations.
pub struct FitnessEvaluator {
    row_sums: Vec<f32>,
    width: usize,
    tile: usize,
}

impl FitnessEvaluator {
    /// dimensions must already have passed `StageSettings::validate`, so
    /// both divide evenly by `tile`.
    pub fn new(width: u32, height: u32, tile: u32) -> Self {
        Self {
            row_sums: vec![0.0; height as usize],
            width: width as usize,
            tile: tile as usize,
        }
    }

    /// total weighted HSV error between the rendered surface and the
    /// target (straight RGBA8, same dimensions). alpha is ignored: the
    /// working surface is always fully covered by the base image.
    pub fn member_error(
        &mut self,
        target_rgba: &[u8],
        surface: &sk::Pixmap,
        fs: &FitnessSettings,
    ) -> f32 {
        profiling::scope!("member_error");
        let pixels = surface.pixels();
        let width = self.width;
        let tile = self.tile;
        debug_assert_eq!(pixels.len(), width * self.row_sums.len());
        debug_assert_eq!(target_rgba.len(), pixels.len() * 4);

        reduce_rows(&mut self.row_sums, tile, |row| {
            let prow = &pixels[row * width..(row + 1) * width];
            let trow = &target_rgba[row * width * 4..(row + 1) * width * 4];

            let mut acc = 0.0f32;
            for (prun, trun) in prow.chunks_exact(tile).zip(trow.chunks_exact(tile * 4)) {
                let mut run = 0.0f32;
                for (p, t) in prun.iter().zip(trun.chunks_exact(4)) {
                    let c = p.demultiply();
                    let rendered = [
                        c.red() as f32 / 255.0,
                        c.green() as f32 / 255.0,
                        c.blue() as f32 / 255.0,
                    ];
                    let target = [
                        t[0] as f32 / 255.0,
                        t[1] as f32 / 255.0,
                        t[2] as f32 / 255.0,
                    ];
                    run += pixel_error(rendered, target, fs);
                }
                acc += run;
            }
            acc
        });

        reduce_total(&self.row_sums, tile)
    }

    /// fitness convention for the whole pipeline: strictly positive,
    /// larger is fitter, safe under the selection power transform.
    pub fn fitness_from_error(&self, error: f32) -> f32 {
        let pixel_count = (self.width * self.row_sums.len()) as f32;
        1.0 / (1.0 + error / pixel_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::premultiply;

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> Vec<u8> {
        rgba.iter()
            .copied()
            .cycle()
            .take((w * h * 4) as usize)
            .collect()
    }

    fn pixmap_of(straight: &[u8], w: u32, h: u32) -> sk::Pixmap {
        sk::Pixmap::from_vec(premultiply(straight), sk::IntSize::from_wh(w, h).unwrap()).unwrap()
    }

    #[test]
    fn test_identical_images_have_zero_error() {
        let target = solid(8, 8, [120, 40, 220, 255]);
        let surface = pixmap_of(&target, 8, 8);
        let mut eval = FitnessEvaluator::new(8, 8, 4);
        let err = eval.member_error(&target, &surface, &FitnessSettings::default());
        assert_eq!(err, 0.0);
        assert_eq!(eval.fitness_from_error(err), 1.0);
    }

    #[test]
    fn test_error_matches_serial_sum() {
        let w = 8u32;
        let h = 8u32;
        // black target, gray rendered surface: every pixel differs by the
        // same value-channel distance
        let target = solid(w, h, [0, 0, 0, 255]);
        let rendered = solid(w, h, [128, 128, 128, 255]);
        let surface = pixmap_of(&rendered, w, h);

        let fs = FitnessSettings::default();
        let mut eval = FitnessEvaluator::new(w, h, 4);
        let err = eval.member_error(&target, &surface, &fs);

        let per_pixel = pixel_error([128.0 / 255.0; 3], [0.0; 3], &fs);
        let expected = per_pixel * (w * h) as f32;
        assert!(
            (err - expected).abs() < 1e-3,
            "two-phase reduction {err} vs serial {expected}"
        );
    }

    #[test]
    fn test_closer_surface_scores_higher_fitness() {
        let w = 8u32;
        let h = 8u32;
        let target = solid(w, h, [0, 0, 0, 255]);
        let near = pixmap_of(&solid(w, h, [30, 30, 30, 255]), w, h);
        let far = pixmap_of(&solid(w, h, [240, 240, 240, 255]), w, h);

        let fs = FitnessSettings::default();
        let mut eval = FitnessEvaluator::new(w, h, 4);
        let err_near = eval.member_error(&target, &near, &fs);
        let err_far = eval.member_error(&target, &far, &fs);
        assert!(eval.fitness_from_error(err_near) > eval.fitness_from_error(err_far));
    }
}
