//! Randomized augmentations for the classification train split.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::RngExt;

use super::{ImageTensor, Transform};

/// Flip top-to-bottom with probability `p`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RandomVerticalFlip {
    pub p: f32,
}

impl Default for RandomVerticalFlip {
    fn default() -> Self {
        Self { p: 0.5 }
    }
}

impl Transform for RandomVerticalFlip {
    fn apply(&self, mut image: ImageTensor, rng: &mut StdRng) -> ImageTensor {
        if self.p <= 0.0 || rng.random::<f32>() >= self.p {
            return image;
        }
        let (channels, height, width) = image.dims();
        for c in 0..channels {
            let plane = image.plane_mut(c);
            for y in 0..height / 2 {
                let mirror = height - 1 - y;
                for x in 0..width {
                    plane.swap(y * width + x, mirror * width + x);
                }
            }
        }
        image
    }
}

/// Random brightness, contrast, saturation and hue, applied in random order.
///
/// Brightness, contrast and saturation factors are drawn from
/// `[1 - v, 1 + v]`; the hue shift from `[-hue, hue]` turns of the colour wheel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorJitter {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub hue: f32,
}

impl Default for ColorJitter {
    fn default() -> Self {
        Self {
            brightness: 0.2,
            contrast: 0.2,
            saturation: 0.2,
            hue: 0.2,
        }
    }
}

impl ColorJitter {
    fn factor(spread: f32, rng: &mut StdRng) -> Option<f32> {
        (spread > 0.0).then(|| rng.random_range((1.0 - spread).max(0.0)..1.0 + spread))
    }
}

impl Transform for ColorJitter {
    fn apply(&self, mut image: ImageTensor, rng: &mut StdRng) -> ImageTensor {
        if image.channels() != 3 {
            return image;
        }
        let mut order = [0usize, 1, 2, 3];
        order.shuffle(rng);

        for step in order {
            match step {
                0 => {
                    if let Some(f) = Self::factor(self.brightness, rng) {
                        adjust_brightness(&mut image, f);
                    }
                }
                1 => {
                    if let Some(f) = Self::factor(self.contrast, rng) {
                        adjust_contrast(&mut image, f);
                    }
                }
                2 => {
                    if let Some(f) = Self::factor(self.saturation, rng) {
                        adjust_saturation(&mut image, f);
                    }
                }
                _ => {
                    if self.hue > 0.0 {
                        let shift = rng.random_range(-self.hue..self.hue);
                        adjust_hue(&mut image, shift);
                    }
                }
            }
        }
        image
    }
}

fn grayscale(r: f32, g: f32, b: f32) -> f32 {
    0.299 * r + 0.587 * g + 0.114 * b
}

fn adjust_brightness(image: &mut ImageTensor, factor: f32) {
    for v in image.data.iter_mut() {
        *v = (*v * factor).clamp(0.0, 1.0);
    }
}

fn adjust_contrast(image: &mut ImageTensor, factor: f32) {
    let pixels = image.height() * image.width();
    if pixels == 0 {
        return;
    }
    let mean = (0..pixels)
        .map(|i| grayscale(image.plane(0)[i], image.plane(1)[i], image.plane(2)[i]))
        .sum::<f32>()
        / pixels as f32;
    for v in image.data.iter_mut() {
        *v = (factor * *v + (1.0 - factor) * mean).clamp(0.0, 1.0);
    }
}

fn adjust_saturation(image: &mut ImageTensor, factor: f32) {
    let pixels = image.height() * image.width();
    for i in 0..pixels {
        let (r, g, b) = (image.plane(0)[i], image.plane(1)[i], image.plane(2)[i]);
        let gray = grayscale(r, g, b);
        for (c, v) in [r, g, b].into_iter().enumerate() {
            image.plane_mut(c)[i] = (factor * v + (1.0 - factor) * gray).clamp(0.0, 1.0);
        }
    }
}

fn adjust_hue(image: &mut ImageTensor, shift: f32) {
    let pixels = image.height() * image.width();
    for i in 0..pixels {
        let (h, s, v) = rgb_to_hsv(image.plane(0)[i], image.plane(1)[i], image.plane(2)[i]);
        let (r, g, b) = hsv_to_rgb((h + shift).rem_euclid(1.0), s, v);
        image.plane_mut(0)[i] = r;
        image.plane_mut(1)[i] = g;
        image.plane_mut(2)[i] = b;
    }
}

/// Hue in `[0, 1)`.
fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let s = if max > 0.0 { delta / max } else { 0.0 };
    if delta <= f32::EPSILON {
        return (0.0, s, max);
    }
    let h = if max == r {
        ((g - b) / delta).rem_euclid(6.0)
    } else if max == g {
        (b - r) / delta + 2.0
    } else {
        (r - g) / delta + 4.0
    };
    (h / 6.0, s, max)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let sector = h * 6.0;
    let i = sector.floor();
    let f = sector - i;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match (i as i32).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}

/// Random perspective warp with probability `p`.
///
/// Each corner moves inward by up to `distortion * half` of the image
/// extent; uncovered pixels are filled with 0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RandomPerspective {
    pub distortion: f32,
    pub p: f32,
}

impl Default for RandomPerspective {
    fn default() -> Self {
        Self {
            distortion: 0.5,
            p: 0.5,
        }
    }
}

impl Transform for RandomPerspective {
    fn apply(&self, image: ImageTensor, rng: &mut StdRng) -> ImageTensor {
        if self.p <= 0.0 || rng.random::<f32>() >= self.p {
            return image;
        }
        let (channels, height, width) = image.dims();
        if height < 2 || width < 2 {
            return image;
        }

        let (w, h) = (width as f32, height as f32);
        let dx = (self.distortion * (w / 2.0)).floor() as usize;
        let dy = (self.distortion * (h / 2.0)).floor() as usize;

        let start = [(0.0, 0.0), (w - 1.0, 0.0), (w - 1.0, h - 1.0), (0.0, h - 1.0)];
        let end = [
            (near_edge(dx, rng), near_edge(dy, rng)),
            (far_edge(width, dx, rng), near_edge(dy, rng)),
            (far_edge(width, dx, rng), far_edge(height, dy, rng)),
            (near_edge(dx, rng), far_edge(height, dy, rng)),
        ];

        // Output pixels are pulled from the source, so map end -> start.
        let Some(coeffs) = homography(&end, &start) else {
            return image;
        };

        let mut out = ImageTensor::zeros(channels, height, width);
        for y in 0..height {
            for x in 0..width {
                let (xf, yf) = (x as f32, y as f32);
                let denom = coeffs[6] * xf + coeffs[7] * yf + 1.0;
                if denom.abs() < 1e-8 {
                    continue;
                }
                let sx = (coeffs[0] * xf + coeffs[1] * yf + coeffs[2]) / denom;
                let sy = (coeffs[3] * xf + coeffs[4] * yf + coeffs[5]) / denom;
                for c in 0..channels {
                    if let Some(v) = image.sample_bilinear(c, sy, sx) {
                        out.set(c, y, x, v);
                    }
                }
            }
        }
        out
    }
}

fn near_edge(limit: usize, rng: &mut StdRng) -> f32 {
    rng.random_range(0..=limit) as f32
}

fn far_edge(size: usize, limit: usize, rng: &mut StdRng) -> f32 {
    rng.random_range(size.saturating_sub(limit + 1)..size) as f32
}

/// Solve for the 8 coefficients mapping `from[i]` onto `to[i]`.
fn homography(from: &[(f32, f32); 4], to: &[(f32, f32); 4]) -> Option<[f32; 8]> {
    let mut a = [[0f64; 9]; 8];
    for (i, (&(x, y), &(u, v))) in from.iter().zip(to.iter()).enumerate() {
        let (x, y, u, v) = (x as f64, y as f64, u as f64, v as f64);
        a[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, u];
        a[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, v];
    }

    for col in 0..8 {
        let pivot = (col..8).max_by(|&l, &r| a[l][col].abs().total_cmp(&a[r][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        for row in 0..8 {
            if row != col {
                let factor = a[row][col] / a[col][col];
                for k in col..9 {
                    a[row][k] -= factor * a[col][k];
                }
            }
        }
    }

    let mut coeffs = [0f32; 8];
    for (i, c) in coeffs.iter_mut().enumerate() {
        *c = (a[i][8] / a[i][i]) as f32;
    }
    Some(coeffs)
}

/// Crop a random area/aspect window and resize it to `size`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RandomResizedCrop {
    /// Output `(height, width)`.
    pub size: (usize, usize),
    /// Fraction of the source area kept.
    pub scale: (f32, f32),
    /// Width / height aspect range.
    pub ratio: (f32, f32),
}

impl Default for RandomResizedCrop {
    fn default() -> Self {
        Self {
            size: (224, 224),
            scale: (0.7, 1.0),
            ratio: (3.0 / 4.0, 4.0 / 3.0),
        }
    }
}

impl RandomResizedCrop {
    fn window(&self, height: usize, width: usize, rng: &mut StdRng) -> (usize, usize, usize, usize) {
        let area = (height * width) as f32;
        let (log_lo, log_hi) = (self.ratio.0.ln(), self.ratio.1.ln());

        for _ in 0..10 {
            let target_area = area * uniform(self.scale, rng);
            let aspect = uniform((log_lo, log_hi), rng).exp();
            let crop_w = (target_area * aspect).sqrt().round() as usize;
            let crop_h = (target_area / aspect).sqrt().round() as usize;
            if crop_w > 0 && crop_w <= width && crop_h > 0 && crop_h <= height {
                let top = rng.random_range(0..=height - crop_h);
                let left = rng.random_range(0..=width - crop_w);
                return (top, left, crop_h, crop_w);
            }
        }

        // Centre crop clamped to the ratio range.
        let in_ratio = width as f32 / height as f32;
        let (crop_h, crop_w) = if in_ratio < self.ratio.0 {
            (((width as f32 / self.ratio.0).round() as usize).clamp(1, height), width)
        } else if in_ratio > self.ratio.1 {
            (height, ((height as f32 * self.ratio.1).round() as usize).clamp(1, width))
        } else {
            (height, width)
        };
        ((height - crop_h) / 2, (width - crop_w) / 2, crop_h, crop_w)
    }
}

impl Transform for RandomResizedCrop {
    fn apply(&self, image: ImageTensor, rng: &mut StdRng) -> ImageTensor {
        let (_, height, width) = image.dims();
        if height == 0 || width == 0 {
            return image;
        }
        let window = self.window(height, width, rng);
        image.resized_window(window, self.size.0, self.size.1)
    }
}

/// Zero a random rectangle with probability `p`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RandomErasing {
    pub p: f32,
    pub scale: (f32, f32),
    pub ratio: (f32, f32),
    pub value: f32,
}

impl Default for RandomErasing {
    fn default() -> Self {
        Self {
            p: 0.5,
            scale: (0.02, 0.33),
            ratio: (0.3, 3.3),
            value: 0.0,
        }
    }
}

impl Transform for RandomErasing {
    fn apply(&self, mut image: ImageTensor, rng: &mut StdRng) -> ImageTensor {
        if self.p <= 0.0 || rng.random::<f32>() >= self.p {
            return image;
        }
        let (channels, height, width) = image.dims();
        let area = (height * width) as f32;
        let log_ratio = (self.ratio.0.ln(), self.ratio.1.ln());

        for _ in 0..10 {
            let erase_area = area * uniform(self.scale, rng);
            let aspect = uniform(log_ratio, rng).exp();
            let erase_h = (erase_area * aspect).sqrt().round() as usize;
            let erase_w = (erase_area / aspect).sqrt().round() as usize;
            if erase_h == 0 || erase_w == 0 || erase_h >= height || erase_w >= width {
                continue;
            }
            let top = rng.random_range(0..=height - erase_h);
            let left = rng.random_range(0..=width - erase_w);
            for c in 0..channels {
                for y in top..top + erase_h {
                    for x in left..left + erase_w {
                        image.set(c, y, x, self.value);
                    }
                }
            }
            break;
        }
        image
    }
}

fn uniform((lo, hi): (f32, f32), rng: &mut StdRng) -> f32 {
    if hi > lo {
        rng.random_range(lo..hi)
    } else {
        lo
    }
}
