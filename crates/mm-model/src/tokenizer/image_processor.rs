use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use mm_tensor::Tensor;
use tracing::debug;

use crate::error::Result;

/// CLIP RGB normalisation mean.
pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP RGB normalisation standard deviation.
pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_6, 0.275_777_1];

/// Read and decode an image file.
///
/// A missing or unreadable file is an `Io` error; undecodable contents are an
/// `Image` error.
pub fn load_image(path: impl AsRef<Path>) -> Result<DynamicImage> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;
    let image = image::load_from_memory(&bytes)?;
    debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "loaded image"
    );
    Ok(image)
}

/// CLIP-style preprocessing: square resize with bilinear filtering, RGB,
/// per-channel mean/std normalisation, channel-first layout.
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    target_size: u32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl ImageProcessor {
    pub fn new(target_size: u32) -> Self {
        Self {
            target_size,
            mean: CLIP_MEAN,
            std: CLIP_STD,
        }
    }

    pub fn target_size(&self) -> u32 {
        self.target_size
    }

    /// Returns an `f32` tensor of shape `(1, 3, size, size)`.
    pub fn preprocess(&self, image: &DynamicImage) -> Result<Tensor> {
        let size = self.target_size;
        let rgb = image.resize_exact(size, size, FilterType::Triangle).to_rgb8();

        let plane = plane_len(size);
        let mut data = vec![0.0f32; 3 * plane];
        for (i, pixel) in rgb.pixels().enumerate() {
            for c in 0..3 {
                data[c * plane + i] = (f32::from(pixel[c]) / 255.0 - self.mean[c]) / self.std[c];
            }
        }

        Ok(Tensor::from_f32(data, [1, 3, size as usize, size as usize])?)
    }
}

/// Pixels per channel plane, widened before multiplying.
fn plane_len(size: u32) -> usize {
    size as usize * size as usize
}
