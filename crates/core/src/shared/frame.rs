use ndarray::ArrayView3;

use super::bounding_box::BoundingBox;

/// A decoded frame or crop: contiguous RGB bytes in row-major order.
///
/// Lives for a single pipeline tick; nothing downstream of the normalizer
/// holds on to one.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
}

pub const CHANNELS: usize = 3;

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels inside `bbox` into a new frame carrying the same index.
    ///
    /// The box must already be clamped to this frame.
    pub fn crop(&self, bbox: &BoundingBox) -> Frame {
        debug_assert!(bbox.right <= self.width && bbox.bottom <= self.height);
        let w = bbox.width() as usize;
        let h = bbox.height() as usize;
        let stride = self.width as usize * CHANNELS;
        let mut data = Vec::with_capacity(w * h * CHANNELS);

        for row in bbox.top as usize..bbox.bottom as usize {
            let start = row * stride + bbox.left as usize * CHANNELS;
            data.extend_from_slice(&self.data[start..start + w * CHANNELS]);
        }

        Frame::new(data, w as u32, h as u32, self.index)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, CHANNELS)
    }
}
