use image::imageops::{self, FilterType};
use image::GrayImage;

use crate::shared::frame::Frame;
use crate::shared::tile::Tile;

/// ITU-R BT.601 luma weights.
const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

/// Turns a crop into a fixed-size grayscale tile.
///
/// Stateless apart from the target size, so one instance can be shared
/// freely between threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameNormalizer {
    tile_width: u32,
    tile_height: u32,
}

impl FrameNormalizer {
    pub fn new(tile_width: u32, tile_height: u32) -> Self {
        assert!(tile_width > 0 && tile_height > 0, "tile size must be positive");
        Self {
            tile_width,
            tile_height,
        }
    }

    pub fn tile_size(&self) -> (u32, u32) {
        (self.tile_width, self.tile_height)
    }

    pub fn normalize(&self, crop: &Frame) -> Tile {
        let gray = to_grayscale(crop);
        let resized = if gray.dimensions() == (self.tile_width, self.tile_height) {
            gray
        } else {
            imageops::resize(&gray, self.tile_width, self.tile_height, FilterType::Triangle)
        };

        let data = resized
            .into_raw()
            .into_iter()
            .map(|v| v as f32 / 255.0)
            .collect();
        Tile::new(data, self.tile_width, self.tile_height)
    }
}

/// Per-pixel luma at native resolution, truncated rather than rounded.
fn to_grayscale(frame: &Frame) -> GrayImage {
    let luma: Vec<u8> = frame
        .data()
        .chunks_exact(3)
        .map(|px| luma(px[0], px[1], px[2]))
        .collect();
    GrayImage::from_raw(frame.width(), frame.height(), luma)
        .expect("Frame data length must match dimensions")
}

#[inline]
fn luma(r: u8, g: u8, b: u8) -> u8 {
    (LUMA_R * r as f64 + LUMA_G * g as f64 + LUMA_B * b as f64) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let data = rgb.repeat((width * height) as usize);
        Frame::new(data, width, height, 0)
    }

    fn gradient(width: u32, height: u32) -> Frame {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 7 + y * 13) % 256) as u8;
                data.extend_from_slice(&[v, v.wrapping_mul(3), 255 - v]);
            }
        }
        Frame::new(data, width, height, 0)
    }

    #[rstest]
    #[case::black(0, 0, 0, 0)]
    #[case::red(255, 0, 0, 76)]
    #[case::green(0, 255, 0, 149)]
    #[case::blue(0, 0, 255, 29)]
    #[case::mixed(10, 20, 30, 18)]
    #[case::skin(200, 100, 50, 124)]
    fn test_luma_truncates(#[case] r: u8, #[case] g: u8, #[case] b: u8, #[case] expected: u8) {
        assert_eq!(luma(r, g, b), expected);
    }

    #[test]
    fn test_red_tile_value() {
        let tile = FrameNormalizer::new(4, 4).normalize(&solid(10, 6, [255, 0, 0]));
        for v in tile.data() {
            assert_relative_eq!(*v, 76.0 / 255.0, epsilon = 1e-6);
        }
    }

    #[rstest]
    #[case::downscale(200, 120)]
    #[case::upscale(12, 7)]
    #[case::same_size(64, 64)]
    #[case::single_pixel(1, 1)]
    fn test_output_is_always_tile_size(#[case] w: u32, #[case] h: u32) {
        let tile = FrameNormalizer::new(64, 64).normalize(&gradient(w, h));
        assert_eq!((tile.width(), tile.height()), (64, 64));
        assert_eq!(tile.data().len(), 64 * 64);
        assert!(tile.data().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let normalizer = FrameNormalizer::new(64, 64);
        let crop = gradient(97, 41);
        assert_eq!(normalizer.normalize(&crop), normalizer.normalize(&crop));
    }

    #[test]
    fn test_non_square_tile() {
        let tile = FrameNormalizer::new(32, 16).normalize(&gradient(50, 50));
        assert_eq!(tile.as_ndarray().shape(), &[16, 32]);
    }

    #[test]
    #[should_panic(expected = "tile size must be positive")]
    fn test_zero_tile_size_panics() {
        FrameNormalizer::new(0, 64);
    }
}
