use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageFormat};

use crate::shared::error::DecodeError;
use crate::shared::frame::Frame;
use crate::shared::raw_frame::RawFrame;
use crate::video::domain::frame_codec::{CodecMode, FrameCodec};

const JPEG_QUALITY: u8 = 100;

/// A frame repacked as NV21: a tight luma plane followed by one chroma plane
/// of interleaved `V, U` byte pairs.
///
/// The chroma order is fixed at V-then-U no matter how the source planes
/// were laid out, so every consumer of this buffer can rely on it.
#[derive(Clone, Debug, PartialEq)]
pub struct Nv21Buffer {
    pub width: u32,
    pub height: u32,
    pub luma: Vec<u8>,
    pub vu: Vec<u8>,
}

impl Nv21Buffer {
    /// Repacks a validated raw frame, dropping any stride padding.
    pub fn from_raw(raw: &RawFrame) -> Result<Self, DecodeError> {
        raw.validate()?;

        let w = raw.width as usize;
        let h = raw.height as usize;
        let (cw, ch) = raw.chroma_size();

        let mut luma = Vec::with_capacity(w * h);
        for row in 0..h {
            for col in 0..w {
                luma.push(raw.luma.sample(col, row));
            }
        }

        let mut vu = Vec::with_capacity(cw * ch * 2);
        for row in 0..ch {
            for col in 0..cw {
                vu.push(raw.chroma_v.sample(col, row));
                vu.push(raw.chroma_u.sample(col, row));
            }
        }

        Ok(Self {
            width: raw.width,
            height: raw.height,
            luma,
            vu,
        })
    }

    /// BT.601 full-range conversion to interleaved RGB.
    pub fn to_rgb(&self) -> Vec<u8> {
        let w = self.width as usize;
        let h = self.height as usize;
        let cw = w.div_ceil(2);
        let mut rgb = Vec::with_capacity(w * h * 3);

        for row in 0..h {
            for col in 0..w {
                let y = self.luma[row * w + col] as f32;
                let uv_idx = ((row / 2) * cw + col / 2) * 2;
                let v = self.vu[uv_idx] as f32 - 128.0;
                let u = self.vu[uv_idx + 1] as f32 - 128.0;

                let r = y + 1.402 * v;
                let g = y - 0.344_136 * u - 0.714_136 * v;
                let b = y + 1.772 * u;

                rgb.push(to_channel(r));
                rgb.push(to_channel(g));
                rgb.push(to_channel(b));
            }
        }
        rgb
    }
}

#[inline]
fn to_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Decodes planar YUV 4:2:0 camera frames through an NV21 intermediate.
pub struct Nv21FrameCodec {
    mode: CodecMode,
}

impl Nv21FrameCodec {
    pub fn new(mode: CodecMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> CodecMode {
        self.mode
    }
}

impl Default for Nv21FrameCodec {
    fn default() -> Self {
        Self::new(CodecMode::Direct)
    }
}

impl FrameCodec for Nv21FrameCodec {
    fn decode(&self, raw: &RawFrame) -> Result<Frame, DecodeError> {
        let nv21 = Nv21Buffer::from_raw(raw)?;
        let rgb = nv21.to_rgb();
        let rgb = match self.mode {
            CodecMode::Direct => rgb,
            CodecMode::JpegRoundTrip => jpeg_round_trip(&rgb, raw.width, raw.height)?,
        };
        Ok(Frame::new(rgb, raw.width, raw.height, raw.index))
    }
}

fn jpeg_round_trip(rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>, DecodeError> {
    let mut encoded = Vec::new();
    JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY).encode(
        rgb,
        width,
        height,
        ExtendedColorType::Rgb8,
    )?;
    let decoded = image::load(Cursor::new(encoded), ImageFormat::Jpeg)?.to_rgb8();
    Ok(decoded.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::PlaneKind;
    use crate::shared::raw_frame::PlaneBuf;
    use rstest::rstest;

    fn uniform_i420(width: u32, height: u32, y: u8, u: u8, v: u8) -> RawFrame {
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
        RawFrame::new(
            width,
            height,
            PlaneBuf::packed(vec![y; w * h], w),
            PlaneBuf::packed(vec![u; cw * ch], cw),
            PlaneBuf::packed(vec![v; cw * ch], cw),
            3,
        )
    }

    fn pixel(frame: &Frame, x: usize, y: usize) -> [u8; 3] {
        let arr = frame.as_ndarray();
        [arr[[y, x, 0]], arr[[y, x, 1]], arr[[y, x, 2]]]
    }

    #[test]
    fn test_nv21_orders_chroma_v_then_u() {
        let mut raw = uniform_i420(2, 2, 0, 0, 0);
        raw.chroma_u = PlaneBuf::packed(vec![11], 1);
        raw.chroma_v = PlaneBuf::packed(vec![22], 1);

        let nv21 = Nv21Buffer::from_raw(&raw).unwrap();
        assert_eq!(nv21.vu, vec![22, 11]);
    }

    #[test]
    fn test_nv21_strips_stride_padding() {
        // 2x2 luma stored with 4-byte rows; chroma as a semi-planar view (pixel stride 2).
        let raw = RawFrame::new(
            2,
            2,
            PlaneBuf::new(vec![1, 2, 0, 0, 3, 4, 0, 0], 4, 1),
            PlaneBuf::new(vec![50, 60], 2, 2),
            PlaneBuf::new(vec![70, 80], 2, 2),
            0,
        );
        let nv21 = Nv21Buffer::from_raw(&raw).unwrap();
        assert_eq!(nv21.luma, vec![1, 2, 3, 4]);
        assert_eq!(nv21.vu, vec![70, 50]);
    }

    #[rstest]
    #[case::black(0, [0, 0, 0])]
    #[case::mid_gray(128, [128, 128, 128])]
    #[case::white(255, [255, 255, 255])]
    fn test_neutral_chroma_is_gray(#[case] y: u8, #[case] expected: [u8; 3]) {
        let frame = Nv21FrameCodec::default()
            .decode(&uniform_i420(4, 2, y, 128, 128))
            .unwrap();
        assert_eq!(pixel(&frame, 3, 1), expected);
    }

    #[test]
    fn test_strong_v_is_red() {
        let frame = Nv21FrameCodec::default()
            .decode(&uniform_i420(2, 2, 76, 85, 255))
            .unwrap();
        let [r, g, b] = pixel(&frame, 0, 0);
        assert!(r > 240, "r={r}");
        assert!(g < 20, "g={g}");
        assert!(b < 20, "b={b}");
    }

    #[test]
    fn test_swapped_planes_change_colour() {
        let codec = Nv21FrameCodec::default();
        let a = codec.decode(&uniform_i420(2, 2, 128, 60, 200)).unwrap();
        let b = codec.decode(&uniform_i420(2, 2, 128, 200, 60)).unwrap();
        assert_ne!(a.data(), b.data());
    }

    #[rstest]
    #[case::even(8, 6)]
    #[case::odd(7, 5)]
    fn test_decode_preserves_dimensions_and_index(#[case] w: u32, #[case] h: u32) {
        for mode in [CodecMode::Direct, CodecMode::JpegRoundTrip] {
            let frame = Nv21FrameCodec::new(mode)
                .decode(&uniform_i420(w, h, 90, 128, 128))
                .unwrap();
            assert_eq!(frame.width(), w);
            assert_eq!(frame.height(), h);
            assert_eq!(frame.index(), 3);
            assert_eq!(frame.data().len(), (w * h * 3) as usize);
        }
    }

    #[test]
    fn test_jpeg_round_trip_is_close_to_direct() {
        let raw = uniform_i420(16, 16, 100, 140, 110);
        let direct = Nv21FrameCodec::new(CodecMode::Direct).decode(&raw).unwrap();
        let jpeg = Nv21FrameCodec::new(CodecMode::JpegRoundTrip)
            .decode(&raw)
            .unwrap();
        let max_diff = direct
            .data()
            .iter()
            .zip(jpeg.data())
            .map(|(a, b)| (*a as i16 - *b as i16).abs())
            .max()
            .unwrap();
        assert!(max_diff <= 4, "max_diff={max_diff}");
    }

    #[test]
    fn test_empty_chroma_is_decode_error() {
        let mut raw = uniform_i420(4, 4, 0, 128, 128);
        raw.chroma_u.data.clear();
        raw.chroma_v.data.clear();
        let err = Nv21FrameCodec::default().decode(&raw).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::PlaneTooShort {
                plane: PlaneKind::ChromaU,
                ..
            }
        ));
    }

    #[test]
    fn test_short_luma_is_decode_error() {
        let mut raw = uniform_i420(4, 4, 0, 128, 128);
        raw.luma.data.pop();
        assert!(Nv21FrameCodec::default().decode(&raw).is_err());
    }
}
