//! Farbfeld: 8-byte magic, width/height as u32 big-endian, then RGBA u16
//! big-endian samples.
//!
//! Implementation draws from [zune-farbfeld](https://github.com/etemesi254/zune-image)
//! by Caleb Etemesi (MIT/Apache-2.0/Zlib licensed).

use enough::Stop;

use super::{ImageFormat, ImageInfo, check_limits};
use crate::decode::DecodeOutput;
use crate::error::ImageError;
use crate::limits::Limits;
use crate::pixel::PixelLayout;

const HEADER_SIZE: usize = 16;

/// Parse farbfeld header, returning (width, height).
fn parse_header(data: &[u8]) -> Result<(u32, u32), ImageError> {
    if data.len() < HEADER_SIZE {
        return Err(ImageError::UnexpectedEof);
    }
    if &data[0..8] != b"farbfeld" {
        return Err(ImageError::UnrecognizedFormat);
    }
    let width = u32::from_be_bytes([data[8], data[9], data[10], data[11]]);
    let height = u32::from_be_bytes([data[12], data[13], data[14], data[15]]);

    if width == 0 {
        return Err(ImageError::InvalidHeader("farbfeld width is zero".into()));
    }
    if height == 0 {
        return Err(ImageError::InvalidHeader("farbfeld height is zero".into()));
    }
    Ok((width, height))
}

pub(crate) fn probe(data: &[u8]) -> Result<ImageInfo, ImageError> {
    let (width, height) = parse_header(data)?;
    Ok(ImageInfo {
        width,
        height,
        format: ImageFormat::Farbfeld,
        native_layout: PixelLayout::Rgba16,
    })
}

/// Decode to `Rgba16` pixels in native endian.
pub(crate) fn decode<'a>(
    data: &'a [u8],
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<DecodeOutput<'a>, ImageError> {
    let (width, height) = parse_header(data)?;
    check_limits(limits, width, height, PixelLayout::Rgba16)?;
    stop.check()?;

    let too_large = || ImageError::DimensionsTooLarge { width, height };
    let row_bytes = (width as usize).checked_mul(8).ok_or_else(too_large)?;
    let input_bytes = row_bytes
        .checked_mul(height as usize)
        .ok_or_else(too_large)?;

    let pixel_data = data
        .get(HEADER_SIZE..)
        .and_then(|d| d.get(..input_bytes))
        .ok_or(ImageError::UnexpectedEof)?;

    let mut out = Vec::with_capacity(input_bytes);
    for (row_idx, row) in pixel_data.chunks_exact(row_bytes).enumerate() {
        if row_idx % 16 == 0 {
            stop.check()?;
        }
        for pair in row.chunks_exact(2) {
            let val = u16::from_be_bytes([pair[0], pair[1]]);
            out.extend_from_slice(&val.to_ne_bytes());
        }
    }

    Ok(DecodeOutput::owned(
        out,
        width,
        height,
        PixelLayout::Rgba16,
        ImageFormat::Farbfeld,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use enough::Unstoppable;

    fn farbfeld(width: u32, height: u32, samples: &[u16]) -> Vec<u8> {
        let mut out = b"farbfeld".to_vec();
        out.extend_from_slice(&width.to_be_bytes());
        out.extend_from_slice(&height.to_be_bytes());
        for s in samples {
            out.extend_from_slice(&s.to_be_bytes());
        }
        out
    }

    #[test]
    fn samples_become_native_endian() {
        let data = farbfeld(1, 1, &[0x1234, 0, 0xffff, 0x8000]);
        let out = decode(&data, None, &Unstoppable).unwrap();
        assert_eq!(out.layout, PixelLayout::Rgba16);
        assert_eq!(&out.pixels()[..2], &0x1234u16.to_ne_bytes());
        assert_eq!(out.pixels().len(), 8);
    }

    #[test]
    fn zero_width_is_invalid() {
        let data = farbfeld(0, 1, &[]);
        assert!(matches!(
            decode(&data, None, &Unstoppable),
            Err(ImageError::InvalidHeader(_))
        ));
    }

    #[test]
    fn truncated_pixels_fail() {
        let data = farbfeld(2, 1, &[1, 2, 3, 4]);
        assert!(matches!(
            decode(&data, None, &Unstoppable),
            Err(ImageError::UnexpectedEof)
        ));
    }
}
