use tiny_skia as sk;

use crate::brush::BrushSet;
use crate::dna::Gene;

/// rasterizes chromosomes onto the shared working surface. the surface is
/// premultiplied RGBA8 (tiny-skia's native format); straight RGBA crosses
/// this boundary only through `premultiply`/`demultiply`.
pub struct StrokeRenderer;

impl StrokeRenderer {
    /// reset the working surface to the stage's base image. every member
    /// render starts from this, which is what makes member evaluation
    /// strictly sequential in surface usage.
    pub fn clear_to_base(surface: &mut sk::Pixmap, base: &sk::Pixmap) {
        profiling::scope!("clear_to_base");
        debug_assert_eq!(surface.data().len(), base.data().len());
        surface.data_mut().copy_from_slice(base.data());
    }

    /// draw one member's genes onto the surface, in gene order
    pub fn render_member(
        surface: &mut sk::Pixmap,
        base: &sk::Pixmap,
        genes: &[Gene],
        brushes: &BrushSet,
    ) {
        profiling::scope!("render_member");
        Self::clear_to_base(surface, base);
        for gene in genes {
            draw_stroke(surface, gene, brushes);
        }
    }
}

fn draw_stroke(pix: &mut sk::Pixmap, gene: &Gene, brushes: &BrushSet) {
    profiling::scope!("draw_stroke");
    let [sx, sy] = gene.scale;
    if sx <= 0.0 || sy <= 0.0 {
        return;
    }

    // quick reject: stroke circumscribed radius fully outside the surface
    let radius = 0.5 * (sx * sx + sy * sy).sqrt();
    let [x, y] = gene.position;
    if x + radius < 0.0
        || y + radius < 0.0
        || x - radius >= pix.width() as f32
        || y - radius >= pix.height() as f32
    {
        return;
    }

    let tinted = brushes.tinted(gene.texture_id, gene.color);
    let bw = tinted.width() as f32;
    let bh = tinted.height() as f32;

    // center the mask at the origin, size it in pixels, rotate, then place
    let transform = sk::Transform::from_translate(-bw / 2.0, -bh / 2.0)
        .post_scale(sx / bw, sy / bh)
        .post_concat(sk::Transform::from_rotate(gene.rotation.to_degrees()))
        .post_translate(x, y);

    let paint = sk::PixmapPaint {
        quality: sk::FilterQuality::Bilinear,
        ..Default::default()
    };
    pix.draw_pixmap(0, 0, tinted.as_ref(), &paint, transform, None);
}

/// straight RGBA -> premultiplied RGBA. (x * a + 127) / 255 is a fast
/// rounded divide-by-255.
pub fn premultiply(p: &[u8]) -> Vec<u8> {
    profiling::scope!("premultiply");
    let mut out = vec![0u8; p.len()];
    let mut i = 0usize;
    while i < p.len() {
        let a = p[i + 3] as u16;
        out[i] = ((p[i] as u16 * a + 127) / 255) as u8;
        out[i + 1] = ((p[i + 1] as u16 * a + 127) / 255) as u8;
        out[i + 2] = ((p[i + 2] as u16 * a + 127) / 255) as u8;
        out[i + 3] = a as u8;
        i += 4;
    }
    out
}

/// premultiplied surface -> straight RGBA bytes, for the stage handoff
pub fn demultiply(pix: &sk::Pixmap) -> Vec<u8> {
    profiling::scope!("demultiply");
    let mut out = Vec::with_capacity(pix.data().len());
    for px in pix.pixels() {
        let c = px.demultiply();
        out.push(c.red());
        out.push(c.green());
        out.push(c.blue());
        out.push(c.alpha());
    }
    out
}
