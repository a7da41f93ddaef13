/// weighted HSV pixel distance. hue is treated as a circular channel;
/// saturation and value as plain absolute differences.
use crate::settings::FitnessSettings;

/// RGB in [0, 1] -> [h, s, v], each in [0, 1] (hue wraps)
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> [f32; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        ((g - b) / delta).rem_euclid(6.0) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };

    let s = if max <= f32::EPSILON { 0.0 } else { delta / max };

    [h, s, max]
}

/// per-pixel error between a rendered and a target color, both straight
/// RGB in [0, 1]. each channel difference lands in [0, 1] before its
/// weight is applied.
#[inline]
pub fn pixel_error(rendered: [f32; 3], target: [f32; 3], fs: &FitnessSettings) -> f32 {
    let a = rgb_to_hsv(rendered[0], rendered[1], rendered[2]);
    let b = rgb_to_hsv(target[0], target[1], target[2]);

    // shortest way around the hue circle, scaled back to [0, 1]
    let dh = (a[0] - b[0]).abs();
    let dh = dh.min(1.0 - dh) * 2.0;

    fs.hue_weight * dh + fs.sat_weight * (a[1] - b[1]).abs() + fs.val_weight * (a[2] - b[2]).abs()
}
