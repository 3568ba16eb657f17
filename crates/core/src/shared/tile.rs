use ndarray::ArrayView2;

/// One normalized time-step: single-channel intensities in `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    data: Vec<f32>,
    width: u32,
    height: u32,
}

impl Tile {
    pub fn new(data: Vec<f32>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize),
            "data length must equal width * height"
        );
        debug_assert!(
            data.iter().all(|v| (0.0..=1.0).contains(v)),
            "tile intensities must lie in [0, 1]"
        );
        Self {
            data,
            width,
            height,
        }
    }

    /// A tile where every pixel has the same intensity.
    pub fn filled(value: f32, width: u32, height: u32) -> Self {
        Self::new(vec![value; (width * height) as usize], width, height)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// `[height, width]` view.
    pub fn as_ndarray(&self) -> ArrayView2<'_, f32> {
        ArrayView2::from_shape((self.height as usize, self.width as usize), &self.data)
            .expect("Tile data length must match dimensions")
    }

    /// Intensities re-quantized to 8 bits, for debug output.
    pub fn to_luma8(&self) -> Vec<u8> {
        self.data
            .iter()
            .map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8)
            .collect()
    }
}
