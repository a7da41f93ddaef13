use tiny_skia as sk;

use crate::error::StageError;

/// side length of the procedurally generated default brushes
const DEFAULT_BRUSH_SIZE: u32 = 64;

/// a grayscale coverage mask for one brush tip. the gene's color is applied
/// at draw time, so one mask serves every stroke color.
#[derive(Clone, Debug)]
pub struct BrushTexture {
    pub width: u32,
    pub height: u32,
    /// row-major coverage values, one byte per pixel
    pub alpha: Vec<u8>,
}

impl BrushTexture {
    /// build a mask by sampling `f` at normalized coordinates in [-1, 1],
    /// with (0, 0) at the brush center. `f` returns coverage in [0, 1].
    pub fn from_fn(width: u32, height: u32, f: impl Fn(f32, f32) -> f32) -> Self {
        let mut alpha = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let nx = (x as f32 + 0.5) / width as f32 * 2.0 - 1.0;
                let ny = (y as f32 + 0.5) / height as f32 * 2.0 - 1.0;
                let a = f(nx, ny).clamp(0.0, 1.0);
                alpha.push((a * 255.0 + 0.5) as u8);
            }
        }
        Self {
            width,
            height,
            alpha,
        }
    }
}

/// the brush textures available to a stage. genes reference these by index;
/// the population initializer draws texture ids from `0..len()`.
pub struct BrushSet {
    brushes: Vec<BrushTexture>,
}

impl BrushSet {
    /// wrap caller-supplied masks (e.g. decoded from brush assets by an
    /// outer layer). an empty set cannot draw anything and is rejected.
    pub fn from_masks(brushes: Vec<BrushTexture>) -> Result<Self, StageError> {
        if brushes.is_empty() {
            return Err(StageError::EmptyBrushSet);
        }
        for (index, b) in brushes.iter().enumerate() {
            if b.width == 0
                || b.height == 0
                || b.alpha.len() != (b.width * b.height) as usize
            {
                return Err(StageError::InvalidBrushMask { index });
            }
        }
        Ok(Self { brushes })
    }

    /// procedural fallback set: soft disc, hard disc, elongated streak and
    /// a grainy stipple. keeps the pipeline exercisable without any assets.
    pub fn default_set() -> Self {
        let n = DEFAULT_BRUSH_SIZE;

        let soft = BrushTexture::from_fn(n, n, |x, y| {
            let r = (x * x + y * y).sqrt();
            (1.0 - r).max(0.0).powi(2)
        });

        let hard = BrushTexture::from_fn(n, n, |x, y| {
            let r = (x * x + y * y).sqrt();
            // flat core, short smooth edge
            ((0.9 - r) / 0.15).clamp(0.0, 1.0)
        });

        let streak = BrushTexture::from_fn(n, n, |x, y| {
            let lateral = (1.0 - (y * 4.0).abs()).max(0.0);
            let along = (1.0 - x.abs()).max(0.0).sqrt();
            lateral * along
        });

        let stipple = BrushTexture::from_fn(n, n, |x, y| {
            let r = (x * x + y * y).sqrt();
            let base = (1.0 - r).max(0.0);
            // deterministic per-texel grain
            let gx = (x * 31.7).sin();
            let gy = (y * 27.3).cos();
            let grain = 0.6 + 0.4 * (gx * gy * 43758.547).sin().abs();
            base * grain
        });

        Self {
            brushes: vec![soft, hard, streak, stipple],
        }
    }

    pub fn len(&self) -> usize {
        self.brushes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.brushes.is_empty()
    }

    pub fn get(&self, texture_id: u32) -> &BrushTexture {
        &self.brushes[texture_id as usize]
    }

    /// produce a premultiplied RGBA pixmap of one brush tinted with a gene
    /// color, ready for a transformed draw onto the working surface.
    pub fn tinted(&self, texture_id: u32, color: [f32; 3]) -> sk::Pixmap {
        profiling::scope!("BrushSet::tinted");
        let brush = self.get(texture_id);
        let mut data = Vec::with_capacity(brush.alpha.len() * 4);
        for &a in &brush.alpha {
            let af = a as f32;
            // premultiplied: rgb never exceeds alpha because color is in [0, 1]
            data.push((color[0] * af) as u8);
            data.push((color[1] * af) as u8);
            data.push((color[2] * af) as u8);
            data.push(a);
        }
        let size = sk::IntSize::from_wh(brush.width, brush.height).expect("brush size");
        sk::Pixmap::from_vec(data, size).expect("brush pixmap")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_has_brushes() {
        let set = BrushSet::default_set();
        assert!(set.len() >= 2);
    }

    #[test]
    fn test_empty_set_rejected() {
        assert!(matches!(
            BrushSet::from_masks(Vec::new()),
            Err(StageError::EmptyBrushSet)
        ));
    }

    #[test]
    fn test_malformed_mask_rejected() {
        let bad = BrushTexture {
            width: 4,
            height: 4,
            alpha: vec![0; 3],
        };
        assert!(matches!(
            BrushSet::from_masks(vec![bad]),
            Err(StageError::InvalidBrushMask { index: 0 })
        ));
    }

    #[test]
    fn test_brushes_are_center_weighted() {
        let set = BrushSet::default_set();
        for id in 0..set.len() as u32 {
            let b = set.get(id);
            let center =
                b.alpha[(b.height / 2 * b.width + b.width / 2) as usize];
            let corner = b.alpha[0];
            assert!(
                center > corner,
                "brush {} should be denser at its center",
                id
            );
        }
    }

    #[test]
    fn test_tint_is_premultiplied() {
        let set = BrushSet::default_set();
        let pix = set.tinted(0, [0.5, 1.0, 0.25]);
        for px in pix.pixels() {
            assert!(px.red() <= px.alpha());
            assert!(px.green() <= px.alpha());
            assert!(px.blue() <= px.alpha());
        }
    }
}
