//! Pixel-level image comparison.

use image::{Rgba, RgbaImage};

use super::types::SnapshotResult;

/// Output of an image comparison
#[derive(Debug, Clone)]
pub struct DiffOutcome {
    /// Visual diff: differing pixels in red over a faded copy of the first image
    pub image: RgbaImage,

    /// Percentage of pixels that differ, in [0, 100]
    pub dissimilarity: f64,
}

/// Trait for image diff algorithms
pub trait ImageDiffer {
    /// Compare two encoded images
    fn compare(&self, alpha: &[u8], beta: &[u8]) -> SnapshotResult<DiffOutcome>;
}

const DIFF_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Exact per-pixel comparison with an optional per-channel tolerance
///
/// Images of different sizes are compared over the union of both canvases;
/// any pixel present in only one of them counts as different.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelDiff {
    /// Maximum per-channel difference still considered equal
    pub tolerance: u8,
}

impl PixelDiff {
    pub fn new(tolerance: u8) -> Self {
        Self { tolerance }
    }

    fn same(&self, a: &Rgba<u8>, b: &Rgba<u8>) -> bool {
        a.0.iter()
            .zip(b.0.iter())
            .all(|(x, y)| x.abs_diff(*y) <= self.tolerance)
    }
}

impl ImageDiffer for PixelDiff {
    fn compare(&self, alpha: &[u8], beta: &[u8]) -> SnapshotResult<DiffOutcome> {
        let alpha = image::load_from_memory(alpha)?.to_rgba8();
        let beta = image::load_from_memory(beta)?.to_rgba8();

        let width = alpha.width().max(beta.width());
        let height = alpha.height().max(beta.height());
        let mut diff = RgbaImage::new(width, height);
        let mut differing: u64 = 0;

        for y in 0..height {
            for x in 0..width {
                let a = pixel_at(&alpha, x, y);
                let b = pixel_at(&beta, x, y);
                let pixel = match (a, b) {
                    (Some(a), Some(b)) if self.same(a, b) => faded(a),
                    _ => {
                        differing += 1;
                        DIFF_COLOR
                    }
                };
                diff.put_pixel(x, y, pixel);
            }
        }

        let total = u64::from(width) * u64::from(height);
        let dissimilarity = if total == 0 {
            0.0
        } else {
            differing as f64 / total as f64 * 100.0
        };

        Ok(DiffOutcome {
            image: diff,
            dissimilarity,
        })
    }
}

fn pixel_at(img: &RgbaImage, x: u32, y: u32) -> Option<&Rgba<u8>> {
    (x < img.width() && y < img.height()).then(|| img.get_pixel(x, y))
}

/// Light grayscale rendition of a matching pixel
fn faded(pixel: &Rgba<u8>) -> Rgba<u8> {
    let [r, g, b, _] = pixel.0;
    let luma = (u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000;
    let light = (255 - (255 - luma) / 4) as u8;
    Rgba([light, light, light, 255])
}
