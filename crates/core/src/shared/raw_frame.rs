use super::error::{DecodeError, PlaneKind};

/// One sample plane of a camera frame.
///
/// `row_stride` is the byte distance between rows and `pixel_stride` the
/// distance between neighbouring samples in a row (2 for chroma planes that
/// are views into a semi-planar buffer).
#[derive(Clone, Debug)]
pub struct PlaneBuf {
    pub data: Vec<u8>,
    pub row_stride: usize,
    pub pixel_stride: usize,
}

impl PlaneBuf {
    pub fn new(data: Vec<u8>, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data,
            row_stride,
            pixel_stride,
        }
    }

    /// Tightly packed plane: rows of `width` samples, one byte apart.
    pub fn packed(data: Vec<u8>, width: usize) -> Self {
        Self::new(data, width, 1)
    }

    /// Minimum byte length needed to address `cols` x `rows` samples.
    ///
    /// `None` if the strides make that length overflow `usize`.
    pub fn required_len(&self, cols: usize, rows: usize) -> Option<usize> {
        if cols == 0 || rows == 0 {
            return Some(0);
        }
        (rows - 1)
            .checked_mul(self.row_stride)?
            .checked_add(row_span(cols, self.pixel_stride)?)
    }

    #[inline]
    pub fn sample(&self, col: usize, row: usize) -> u8 {
        self.data[row * self.row_stride + col * self.pixel_stride]
    }

    fn validate(&self, kind: PlaneKind, cols: usize, rows: usize) -> Result<(), DecodeError> {
        let invalid_stride = || DecodeError::InvalidStride {
            plane: kind,
            row_stride: self.row_stride,
            pixel_stride: self.pixel_stride,
        };
        if self.pixel_stride == 0 {
            return Err(invalid_stride());
        }
        let span = row_span(cols, self.pixel_stride).ok_or_else(invalid_stride)?;
        if self.row_stride < span {
            return Err(invalid_stride());
        }
        let required = self.required_len(cols, rows).ok_or_else(invalid_stride)?;
        if self.data.len() < required {
            return Err(DecodeError::PlaneTooShort {
                plane: kind,
                len: self.data.len(),
                required,
            });
        }
        Ok(())
    }
}

/// Bytes covered by one row of `cols` samples, from the first to the last.
fn row_span(cols: usize, pixel_stride: usize) -> Option<usize> {
    cols.saturating_sub(1).checked_mul(pixel_stride)?.checked_add(1)
}

/// A camera frame in planar YUV 4:2:0 layout.
///
/// Owned by the producer; the pipeline only ever borrows it for the duration
/// of one tick.
#[derive(Clone, Debug)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub luma: PlaneBuf,
    pub chroma_u: PlaneBuf,
    pub chroma_v: PlaneBuf,
    pub index: usize,
}

impl RawFrame {
    pub fn new(
        width: u32,
        height: u32,
        luma: PlaneBuf,
        chroma_u: PlaneBuf,
        chroma_v: PlaneBuf,
        index: usize,
    ) -> Self {
        Self {
            width,
            height,
            luma,
            chroma_u,
            chroma_v,
            index,
        }
    }

    /// Chroma plane dimensions for 4:2:0 subsampling (rounded up).
    pub fn chroma_size(&self) -> (usize, usize) {
        (
            (self.width as usize).div_ceil(2),
            (self.height as usize).div_ceil(2),
        )
    }

    /// Checks that every plane can be addressed for the frame's dimensions.
    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.width == 0 || self.height == 0 {
            return Err(DecodeError::EmptyFrame {
                width: self.width,
                height: self.height,
            });
        }
        let (cw, ch) = self.chroma_size();
        self.luma
            .validate(PlaneKind::Luma, self.width as usize, self.height as usize)?;
        self.chroma_u.validate(PlaneKind::ChromaU, cw, ch)?;
        self.chroma_v.validate(PlaneKind::ChromaV, cw, ch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn i420(width: u32, height: u32) -> RawFrame {
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
        RawFrame::new(
            width,
            height,
            PlaneBuf::packed(vec![16; w * h], w),
            PlaneBuf::packed(vec![128; cw * ch], cw),
            PlaneBuf::packed(vec![128; cw * ch], cw),
            0,
        )
    }

    #[test]
    fn test_required_len_packed() {
        let plane = PlaneBuf::packed(vec![], 8);
        assert_eq!(plane.required_len(8, 4), Some(32));
    }

    #[test]
    fn test_required_len_semi_planar_view() {
        // Chroma view into an interleaved buffer: last sample has no partner byte.
        let plane = PlaneBuf::new(vec![], 8, 2);
        assert_eq!(plane.required_len(4, 2), Some(8 + 6 + 1));
    }

    #[test]
    fn test_sample_uses_strides() {
        let plane = PlaneBuf::new((0..16).collect(), 8, 2);
        assert_eq!(plane.sample(0, 0), 0);
        assert_eq!(plane.sample(2, 0), 4);
        assert_eq!(plane.sample(1, 1), 10);
    }

    #[rstest]
    #[case::even(4, 4)]
    #[case::odd(5, 3)]
    #[case::single_pixel(1, 1)]
    fn test_validate_accepts_exact_planes(#[case] w: u32, #[case] h: u32) {
        assert!(i420(w, h).validate().is_ok());
    }

    #[test]
    fn test_chroma_size_rounds_up() {
        assert_eq!(i420(5, 3).chroma_size(), (3, 2));
    }

    #[test]
    fn test_validate_rejects_zero_dimensions() {
        let mut frame = i420(4, 4);
        frame.width = 0;
        assert!(matches!(
            frame.validate(),
            Err(DecodeError::EmptyFrame { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_short_luma() {
        let mut frame = i420(4, 4);
        frame.luma.data.truncate(15);
        assert!(matches!(
            frame.validate(),
            Err(DecodeError::PlaneTooShort {
                plane: PlaneKind::Luma,
                len: 15,
                required: 16
            })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_chroma() {
        let mut frame = i420(4, 4);
        frame.chroma_v.data.clear();
        assert!(matches!(
            frame.validate(),
            Err(DecodeError::PlaneTooShort {
                plane: PlaneKind::ChromaV,
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_pixel_stride() {
        let mut frame = i420(4, 4);
        frame.chroma_u.pixel_stride = 0;
        assert!(matches!(
            frame.validate(),
            Err(DecodeError::InvalidStride { .. })
        ));
    }

    #[test]
    fn test_required_len_overflow_is_none() {
        let plane = PlaneBuf::new(vec![], usize::MAX / 2, 1);
        assert_eq!(plane.required_len(4, 4), None);
    }

    #[rstest]
    #[case::huge_row_stride(PlaneBuf::new(vec![0; 16], usize::MAX / 2, 1))]
    #[case::huge_pixel_stride(PlaneBuf::new(vec![0; 16], usize::MAX, usize::MAX / 2))]
    fn test_validate_rejects_overflowing_strides(#[case] luma: PlaneBuf) {
        let mut frame = i420(4, 4);
        frame.luma = luma;
        assert!(matches!(
            frame.validate(),
            Err(DecodeError::InvalidStride {
                plane: PlaneKind::Luma,
                ..
            })
        ));
    }
}
