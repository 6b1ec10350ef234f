//! Per-sample transforms applied at retrieval time.
//!
//! Transforms operate on a CHW [`ImageTensor`] holding values in `[0, 1]`
//! (or normalized values once [`Normalize`] has run). Each call receives the
//! sample's RNG so augmentation is reproducible when the dataset is seeded.

mod augment;

pub use augment::{
    ColorJitter, RandomErasing, RandomPerspective, RandomResizedCrop, RandomVerticalFlip,
};

use rand::rngs::StdRng;

use crate::container::RowShape;

/// Per-channel mean of the classification (single person) dataset.
#[allow(clippy::excessive_precision)]
pub const CLASSIFICATION_MEAN: [f32; 3] = [0.47329697012901306, 0.412136435508728, 0.38234803080558777];
/// Per-channel std of the classification (single person) dataset.
#[allow(clippy::excessive_precision)]
pub const CLASSIFICATION_STD: [f32; 3] = [0.24916036427021027, 0.23281708359718323, 0.23224322497844696];
/// Per-channel mean of the detection dataset.
#[allow(clippy::excessive_precision)]
pub const DETECTION_MEAN: [f32; 3] = [0.44546014070510864, 0.4201653301715851, 0.4142392575740814];
/// Per-channel std of the detection dataset.
#[allow(clippy::excessive_precision)]
pub const DETECTION_STD: [f32; 3] = [0.255580872297287, 0.2452726811170578, 0.24397742748260498];

/// A channel-first image.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageTensor {
    channels: usize,
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl ImageTensor {
    pub fn zeros(channels: usize, height: usize, width: usize) -> Self {
        Self {
            channels,
            height,
            width,
            data: vec![0.0; channels * height * width],
        }
    }

    /// Build from a row-major HWC buffer such as a container row.
    pub fn from_hwc(hwc: &[f32], shape: RowShape) -> Self {
        let (channels, height, width) = (
            shape.channels as usize,
            shape.height as usize,
            shape.width as usize,
        );
        let mut tensor = Self::zeros(channels, height, width);
        for y in 0..height {
            for x in 0..width {
                let base = (y * width + x) * channels;
                for c in 0..channels {
                    tensor.set(c, y, x, hwc[base + c]);
                }
            }
        }
        tensor
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// `(channels, height, width)`.
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.channels, self.height, self.width)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f32> {
        self.data
    }

    #[inline]
    pub fn get(&self, c: usize, y: usize, x: usize) -> f32 {
        self.data[(c * self.height + y) * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, c: usize, y: usize, x: usize, value: f32) {
        self.data[(c * self.height + y) * self.width + x] = value;
    }

    pub fn plane(&self, c: usize) -> &[f32] {
        let len = self.height * self.width;
        &self.data[c * len..(c + 1) * len]
    }

    pub fn plane_mut(&mut self, c: usize) -> &mut [f32] {
        let len = self.height * self.width;
        &mut self.data[c * len..(c + 1) * len]
    }

    /// Back to row-major HWC.
    pub fn to_hwc(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.data.len());
        for y in 0..self.height {
            for x in 0..self.width {
                for c in 0..self.channels {
                    out.push(self.get(c, y, x));
                }
            }
        }
        out
    }

    /// Bilinear sample at fractional pixel coordinates; `None` outside the image.
    pub(crate) fn sample_bilinear(&self, c: usize, y: f32, x: f32) -> Option<f32> {
        if !(y > -1.0 && x > -1.0 && y < self.height as f32 && x < self.width as f32) {
            return None;
        }
        let y0 = y.floor();
        let x0 = x.floor();
        let (dy, dx) = (y - y0, x - x0);
        let at = |yy: f32, xx: f32| -> f32 {
            if yy < 0.0 || xx < 0.0 || yy >= self.height as f32 || xx >= self.width as f32 {
                0.0
            } else {
                self.get(c, yy as usize, xx as usize)
            }
        };
        let top = at(y0, x0) * (1.0 - dx) + at(y0, x0 + 1.0) * dx;
        let bottom = at(y0 + 1.0, x0) * (1.0 - dx) + at(y0 + 1.0, x0 + 1.0) * dx;
        Some(top * (1.0 - dy) + bottom * dy)
    }

    /// Bilinear resize of the `crop` window `(top, left, height, width)`.
    pub(crate) fn resized_window(
        &self,
        (top, left, crop_h, crop_w): (usize, usize, usize, usize),
        out_h: usize,
        out_w: usize,
    ) -> ImageTensor {
        let mut out = ImageTensor::zeros(self.channels, out_h, out_w);
        let scale_y = crop_h as f32 / out_h as f32;
        let scale_x = crop_w as f32 / out_w as f32;
        let max_y = (top + crop_h - 1) as f32;
        let max_x = (left + crop_w - 1) as f32;

        for oy in 0..out_h {
            let sy = ((oy as f32 + 0.5) * scale_y - 0.5 + top as f32).clamp(top as f32, max_y);
            for ox in 0..out_w {
                let sx =
                    ((ox as f32 + 0.5) * scale_x - 0.5 + left as f32).clamp(left as f32, max_x);
                for c in 0..self.channels {
                    let value = self.sample_bilinear(c, sy, sx).unwrap_or(0.0);
                    out.set(c, oy, ox, value);
                }
            }
        }
        out
    }
}

/// A per-sample transformation.
pub trait Transform: Send + Sync {
    fn apply(&self, image: ImageTensor, rng: &mut StdRng) -> ImageTensor;
}

/// Transforms applied in sequence.
#[derive(Default)]
pub struct Compose {
    transforms: Vec<Box<dyn Transform>>,
}

impl Compose {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<T: Transform + 'static>(mut self, transform: T) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl Transform for Compose {
    fn apply(&self, mut image: ImageTensor, rng: &mut StdRng) -> ImageTensor {
        for transform in &self.transforms {
            image = transform.apply(image, rng);
        }
        image
    }
}

/// `(x - mean[c]) / std[c]` per channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Normalize {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Normalize {
    pub fn new(mean: [f32; 3], std: [f32; 3]) -> Self {
        Self { mean, std }
    }

    pub fn classification() -> Self {
        Self::new(CLASSIFICATION_MEAN, CLASSIFICATION_STD)
    }

    pub fn detection() -> Self {
        Self::new(DETECTION_MEAN, DETECTION_STD)
    }
}

impl Transform for Normalize {
    fn apply(&self, mut image: ImageTensor, _rng: &mut StdRng) -> ImageTensor {
        for c in 0..image.channels().min(3) {
            let (mean, std) = (self.mean[c], self.std[c]);
            for v in image.plane_mut(c) {
                *v = (*v - mean) / std;
            }
        }
        image
    }
}

/// The augmentation chain for the classification train split.
pub fn classification_train_transform() -> Compose {
    Compose::new()
        .add(RandomVerticalFlip::default())
        .add(ColorJitter::default())
        .add(RandomPerspective::default())
        .add(RandomResizedCrop::default())
        .add(RandomErasing::default())
        .add(Normalize::classification())
}

/// Normalization only, for the classification test split.
pub fn classification_test_transform() -> Compose {
    Compose::new().add(Normalize::classification())
}

/// Normalization for the detection split.
pub fn detection_transform() -> Compose {
    Compose::new().add(Normalize::detection())
}
