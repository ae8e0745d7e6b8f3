//! Native decoders shared by both backends.
//!
//! Every decoder turns a complete in-memory file into a single top-down
//! [`DecodeOutput`]. Formats are detected from magic bytes:
//!
//! - **BMP**: 1/4/8-bit palette, 16-bit, 24-bit, 32-bit (`BI_RGB` and
//!   `BI_BITFIELDS`), bottom-up and top-down. RLE is not supported.
//! - **PNM**: binary P5 (PGM), P6 (PPM) and P7 (PAM), 8 and 16 bit.
//! - **farbfeld**: 16-bit RGBA.

pub(crate) mod bmp;
mod farbfeld;
mod pnm;

use enough::Stop;

use crate::decode::DecodeOutput;
use crate::error::ImageError;
use crate::limits::Limits;
use crate::pixel::PixelLayout;

/// Container format detected from magic bytes.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    /// Windows bitmap.
    Bmp,
    /// PNM family: PGM (P5), PPM (P6), PAM (P7).
    Pnm,
    /// Farbfeld (RGBA 16-bit).
    Farbfeld,
}

impl ImageFormat {
    /// Detect the format from the first bytes of a file.
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"farbfeld") {
            Some(Self::Farbfeld)
        } else if data.starts_with(b"BM") {
            Some(Self::Bmp)
        } else if matches!(data, [b'P', b'5' | b'6' | b'7', ..]) {
            Some(Self::Pnm)
        } else {
            None
        }
    }
}

/// Dimensions and layout of an image, read from its header only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// Layout [`decode`] produces for this image.
    pub native_layout: PixelLayout,
}

/// Probe the header without decoding pixels.
pub fn probe(data: &[u8]) -> Result<ImageInfo, ImageError> {
    match ImageFormat::detect(data) {
        Some(ImageFormat::Bmp) => bmp::probe(data),
        Some(ImageFormat::Pnm) => pnm::probe(data),
        Some(ImageFormat::Farbfeld) => farbfeld::probe(data),
        None => Err(ImageError::UnrecognizedFormat),
    }
}

/// Decode the first (and only) frame of `data`.
pub fn decode(data: &[u8], stop: impl Stop) -> Result<DecodeOutput<'_>, ImageError> {
    decode_with_limits(data, None, &stop)
}

/// Decode with resource limits checked before any pixel allocation.
pub fn decode_with_limits<'a>(
    data: &'a [u8],
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<DecodeOutput<'a>, ImageError> {
    let format = ImageFormat::detect(data).ok_or(ImageError::UnrecognizedFormat)?;
    log::trace!("decoding {format:?} ({} bytes)", data.len());
    match format {
        ImageFormat::Bmp => bmp::decode(data, limits, stop),
        ImageFormat::Pnm => pnm::decode(data, limits, stop),
        ImageFormat::Farbfeld => farbfeld::decode(data, limits, stop),
    }
}

pub(crate) fn check_limits(
    limits: Option<&Limits>,
    width: u32,
    height: u32,
    layout: PixelLayout,
) -> Result<(), ImageError> {
    if let Some(limits) = limits {
        limits.check_allocation(width, height, layout.bytes_per_pixel())?;
    }
    Ok(())
}

pub(crate) fn read_u16_le(data: &[u8], offset: usize) -> Result<u16, ImageError> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(ImageError::UnexpectedEof)
}

pub(crate) fn read_u32_le(data: &[u8], offset: usize) -> Result<u32, ImageError> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(ImageError::UnexpectedEof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use enough::Unstoppable;

    #[test]
    fn detect_by_magic() {
        assert_eq!(ImageFormat::detect(b"BM...."), Some(ImageFormat::Bmp));
        assert_eq!(ImageFormat::detect(b"P6 1 1"), Some(ImageFormat::Pnm));
        assert_eq!(
            ImageFormat::detect(b"farbfeld\0\0"),
            Some(ImageFormat::Farbfeld)
        );
        assert_eq!(ImageFormat::detect(b"P3 1 1"), None);
        assert_eq!(ImageFormat::detect(b""), None);
    }

    #[test]
    fn unknown_data_is_unrecognized() {
        assert!(matches!(
            decode(b"GIF89a", Unstoppable),
            Err(ImageError::UnrecognizedFormat)
        ));
        assert!(matches!(probe(&[]), Err(ImageError::UnrecognizedFormat)));
    }

    #[test]
    fn limits_reject_before_decoding() {
        let ppm = b"P6\n4 4\n255\n";
        let limits = Limits {
            max_width: Some(2),
            ..Default::default()
        };
        assert!(matches!(
            decode_with_limits(ppm, Some(&limits), &Unstoppable),
            Err(ImageError::LimitExceeded(_))
        ));
    }
}
