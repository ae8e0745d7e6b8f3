//! BMP / DIB decoder.
//!
//! Handles the core (12-byte), `BITMAPINFOHEADER` (40) and V2–V5 info
//! headers. Output is top-down `Bgr8`, `Bgrx8` or `Bgra8`; palette images
//! are expanded to `Bgr8`.

use enough::Stop;

use super::{ImageFormat, ImageInfo, check_limits, read_u16_le, read_u32_le};
use crate::decode::DecodeOutput;
use crate::error::ImageError;
use crate::limits::Limits;
use crate::pixel::PixelLayout;

const FILE_HEADER_SIZE: usize = 14;

const BI_RGB: u32 = 0;
const BI_RLE8: u32 = 1;
const BI_RLE4: u32 = 2;
const BI_BITFIELDS: u32 = 3;
const BI_ALPHABITFIELDS: u32 = 6;

/// Parsed DIB info header (everything after the 14-byte file header).
#[derive(Debug)]
pub(crate) struct DibInfo {
    pub width: u32,
    pub height: u32,
    pub top_down: bool,
    pub bpp: u16,
    compression: u32,
    /// Red, green, blue, alpha masks.
    masks: [u32; 4],
    /// Blue, green, red entries.
    palette: Vec<[u8; 3]>,
    /// Offset of the pixel bits when they directly follow the header,
    /// masks and palette (packed DIB).
    pub packed_bits_offset: usize,
}

impl DibInfo {
    pub fn layout(&self) -> PixelLayout {
        match self.bpp {
            1 | 4 | 8 | 24 => PixelLayout::Bgr8,
            16 | 32 if self.masks[3] != 0 => PixelLayout::Bgra8,
            _ => PixelLayout::Bgrx8,
        }
    }

    /// Uncompressed, no channel masks.
    pub fn is_plain_rgb(&self) -> bool {
        self.compression == BI_RGB
    }

    /// Bytes per source row (padded to 4 bytes).
    pub fn row_stride(&self) -> usize {
        (self.width as usize * usize::from(self.bpp)).div_ceil(32) * 4
    }
}

/// Parse a DIB info header starting at `dib[0]`.
pub(crate) fn parse_dib_info(dib: &[u8]) -> Result<DibInfo, ImageError> {
    let header_size = read_u32_le(dib, 0)? as usize;

    let (width, raw_height, planes, bpp, compression, colors_used) = match header_size {
        12 => (
            i32::from(read_u16_le(dib, 4)?),
            i32::from(read_u16_le(dib, 6)?),
            read_u16_le(dib, 8)?,
            read_u16_le(dib, 10)?,
            BI_RGB,
            0,
        ),
        40 | 52 | 56 | 108 | 124 => (
            read_u32_le(dib, 4)? as i32,
            read_u32_le(dib, 8)? as i32,
            read_u16_le(dib, 12)?,
            read_u16_le(dib, 14)?,
            read_u32_le(dib, 16)?,
            read_u32_le(dib, 32)?,
        ),
        other => {
            return Err(ImageError::InvalidHeader(format!(
                "unknown BMP info header size: {other}"
            )));
        }
    };

    if planes != 1 {
        return Err(ImageError::InvalidHeader(format!(
            "BMP planes field is {planes}, expected 1"
        )));
    }
    if width <= 0 {
        return Err(ImageError::InvalidHeader(format!(
            "BMP width is {width}"
        )));
    }
    if raw_height == 0 {
        return Err(ImageError::InvalidHeader("BMP height is zero".into()));
    }

    match compression {
        BI_RGB | BI_BITFIELDS | BI_ALPHABITFIELDS => {}
        BI_RLE8 | BI_RLE4 => {
            return Err(ImageError::UnsupportedVariant(
                "RLE-compressed BMP".into(),
            ));
        }
        other => {
            return Err(ImageError::UnsupportedVariant(format!(
                "BMP compression {other}"
            )));
        }
    }

    let is_bitfields = compression != BI_RGB;
    match (bpp, is_bitfields) {
        (1 | 4 | 8 | 24, false) | (16 | 32, _) => {}
        (1 | 4 | 8 | 24, true) => {
            return Err(ImageError::InvalidHeader(format!(
                "bitfields with {bpp}-bit BMP"
            )));
        }
        _ => {
            return Err(ImageError::UnsupportedVariant(format!(
                "BMP bit depth {bpp}"
            )));
        }
    }

    // Masks live inside V2+ headers, or right after a 40-byte header.
    let mut masks = [0u32; 4];
    let mut masks_size = 0;
    if is_bitfields {
        let base = if header_size >= 52 { 40 } else { header_size };
        masks[0] = read_u32_le(dib, base)?;
        masks[1] = read_u32_le(dib, base + 4)?;
        masks[2] = read_u32_le(dib, base + 8)?;
        if header_size >= 56 || compression == BI_ALPHABITFIELDS {
            masks[3] = read_u32_le(dib, base + 12)?;
        }
        if header_size == 40 {
            masks_size = if compression == BI_ALPHABITFIELDS { 16 } else { 12 };
        }
    } else if bpp == 16 {
        masks = [0x7c00, 0x03e0, 0x001f, 0];
    }

    let mut palette = Vec::new();
    let palette_offset = header_size + masks_size;
    let entry_size = if header_size == 12 { 3 } else { 4 };
    if bpp <= 8 {
        let max_colors = 1u32 << bpp;
        let colors = match colors_used {
            0 => max_colors,
            n if n <= max_colors => n,
            n => {
                return Err(ImageError::InvalidHeader(format!(
                    "BMP palette count ({n}) exceeds max for {bpp}-bit depth ({max_colors})"
                )));
            }
        } as usize;
        let bytes = dib
            .get(palette_offset..palette_offset + colors * entry_size)
            .ok_or(ImageError::UnexpectedEof)?;
        palette.extend(bytes.chunks_exact(entry_size).map(|e| [e[0], e[1], e[2]]));
    }

    Ok(DibInfo {
        width: width as u32,
        height: raw_height.unsigned_abs(),
        top_down: raw_height < 0,
        bpp,
        compression,
        masks,
        packed_bits_offset: palette_offset + palette.len() * entry_size,
        palette,
    })
}

/// Parse the file header and the info header.
fn parse_file(data: &[u8]) -> Result<(DibInfo, usize), ImageError> {
    if !data.starts_with(b"BM") {
        return Err(ImageError::UnrecognizedFormat);
    }
    let bits_offset = read_u32_le(data, 10)? as usize;
    let dib = data.get(FILE_HEADER_SIZE..).ok_or(ImageError::UnexpectedEof)?;
    let info = parse_dib_info(dib)?;
    if bits_offset < FILE_HEADER_SIZE + info.packed_bits_offset {
        return Err(ImageError::InvalidHeader(format!(
            "BMP pixel data offset {bits_offset} overlaps the headers"
        )));
    }
    Ok((info, bits_offset))
}

pub(crate) fn probe(data: &[u8]) -> Result<ImageInfo, ImageError> {
    let (info, _) = parse_file(data)?;
    Ok(ImageInfo {
        width: info.width,
        height: info.height,
        format: ImageFormat::Bmp,
        native_layout: info.layout(),
    })
}

pub(crate) fn decode<'a>(
    data: &'a [u8],
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<DecodeOutput<'a>, ImageError> {
    let (info, bits_offset) = parse_file(data)?;
    let layout = info.layout();
    check_limits(limits, info.width, info.height, layout)?;
    stop.check()?;
    let bits = data.get(bits_offset..).ok_or(ImageError::UnexpectedEof)?;
    let pixels = decode_bits(&info, bits, stop)?;
    Ok(DecodeOutput::owned(
        pixels,
        info.width,
        info.height,
        layout,
        ImageFormat::Bmp,
    ))
}

/// Decode the pixel bits described by `info` into top-down rows of
/// `info.layout()`.
pub(crate) fn decode_bits(
    info: &DibInfo,
    bits: &[u8],
    stop: &dyn Stop,
) -> Result<Vec<u8>, ImageError> {
    let w = info.width as usize;
    let h = info.height as usize;
    let layout = info.layout();
    let out_stride = w * layout.bytes_per_pixel();
    let in_stride = info.row_stride();

    let needed = in_stride
        .checked_mul(h)
        .ok_or(ImageError::DimensionsTooLarge {
            width: info.width,
            height: info.height,
        })?;
    if bits.len() < needed {
        return Err(ImageError::UnexpectedEof);
    }
    let out_size = out_stride
        .checked_mul(h)
        .ok_or(ImageError::DimensionsTooLarge {
            width: info.width,
            height: info.height,
        })?;
    let mut out = vec![0u8; out_size];

    let channels = [
        MaskChannel::new(info.masks[0]),
        MaskChannel::new(info.masks[1]),
        MaskChannel::new(info.masks[2]),
        MaskChannel::new(info.masks[3]),
    ];
    let standard_masks = info.masks[..3] == [0x00ff_0000, 0x0000_ff00, 0x0000_00ff]
        && matches!(info.masks[3], 0 | 0xff00_0000);

    for (y, out_row) in out.chunks_exact_mut(out_stride).enumerate() {
        if y % 16 == 0 {
            stop.check()?;
        }
        let src_y = if info.top_down { y } else { h - 1 - y };
        let row = &bits[src_y * in_stride..][..in_stride];

        match info.bpp {
            1 | 4 | 8 => {
                let per_byte = 8 / usize::from(info.bpp);
                let mask = ((1u16 << info.bpp) - 1) as u8;
                for (x, px) in out_row.chunks_exact_mut(3).enumerate() {
                    let byte = row[x / per_byte];
                    let shift = (per_byte - 1 - x % per_byte) * usize::from(info.bpp);
                    let index = usize::from((byte >> shift) & mask);
                    let entry = info.palette.get(index).ok_or_else(|| {
                        ImageError::InvalidData(format!(
                            "palette index {index} out of range (palette has {} entries)",
                            info.palette.len()
                        ))
                    })?;
                    px.copy_from_slice(entry);
                }
            }
            24 => out_row.copy_from_slice(&row[..w * 3]),
            32 if info.compression == BI_RGB || standard_masks => {
                out_row.copy_from_slice(&row[..w * 4]);
            }
            16 | 32 => {
                let src_bpp = usize::from(info.bpp / 8);
                for (px, src) in out_row.chunks_exact_mut(4).zip(row.chunks_exact(src_bpp)) {
                    let v = if src_bpp == 2 {
                        u32::from(u16::from_le_bytes([src[0], src[1]]))
                    } else {
                        u32::from_le_bytes([src[0], src[1], src[2], src[3]])
                    };
                    px[0] = MaskChannel::extract(channels[2], v, 0);
                    px[1] = MaskChannel::extract(channels[1], v, 0);
                    px[2] = MaskChannel::extract(channels[0], v, 0);
                    px[3] = MaskChannel::extract(channels[3], v, 255);
                }
            }
            _ => unreachable!("bit depth validated while parsing"),
        }
    }

    Ok(out)
}

/// A contiguous channel bit mask and its scale to 8 bits.
#[derive(Clone, Copy, Debug)]
struct MaskChannel {
    mask: u32,
    shift: u32,
    max: u32,
}

impl MaskChannel {
    fn new(mask: u32) -> Option<Self> {
        if mask == 0 {
            return None;
        }
        let shift = mask.trailing_zeros();
        Some(Self {
            mask,
            shift,
            max: mask >> shift,
        })
    }

    /// Scaled channel value, or `missing` when the mask is absent.
    fn extract(channel: Option<Self>, v: u32, missing: u8) -> u8 {
        let Some(c) = channel else {
            return missing;
        };
        let raw = u64::from((v & c.mask) >> c.shift);
        let max = u64::from(c.max);
        ((raw * 255 + max / 2) / max) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enough::Unstoppable;

    fn file_header(total: usize, bits_offset: usize) -> Vec<u8> {
        let mut out = b"BM".to_vec();
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&(bits_offset as u32).to_le_bytes());
        out
    }

    fn info_header(width: i32, height: i32, bpp: u16, compression: u32, colors: u32) -> Vec<u8> {
        let mut out = 40u32.to_le_bytes().to_vec();
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&height.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&bpp.to_le_bytes());
        out.extend_from_slice(&compression.to_le_bytes());
        out.extend_from_slice(&[0; 12]);
        out.extend_from_slice(&colors.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out
    }

    fn bmp(width: i32, height: i32, bpp: u16, extra: &[u8], bits: &[u8]) -> Vec<u8> {
        let compression = if bpp == 16 && !extra.is_empty() { BI_BITFIELDS } else { BI_RGB };
        let colors = if bpp <= 8 { (extra.len() / 4) as u32 } else { 0 };
        let offset = 14 + 40 + extra.len();
        let mut out = file_header(offset + bits.len(), offset);
        out.extend(info_header(width, height, bpp, compression, colors));
        out.extend_from_slice(extra);
        out.extend_from_slice(bits);
        out
    }

    #[test]
    fn bottom_up_24bit_is_flipped() {
        // 1x2, rows padded to 4 bytes; file stores the bottom row first.
        let bits = [1, 2, 3, 0, 4, 5, 6, 0];
        let data = bmp(1, 2, 24, &[], &bits);
        let out = decode(&data, None, &Unstoppable).unwrap();
        assert_eq!(out.layout, PixelLayout::Bgr8);
        assert_eq!(out.pixels(), &[4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn top_down_32bit_keeps_order() {
        let bits = [1, 2, 3, 4, 5, 6, 7, 8];
        let data = bmp(1, -2, 32, &[], &bits);
        let out = decode(&data, None, &Unstoppable).unwrap();
        assert_eq!(out.layout, PixelLayout::Bgrx8);
        assert_eq!(out.pixels(), &bits);
    }

    #[test]
    fn four_bit_palette_expands() {
        let palette = [10, 20, 30, 0, 40, 50, 60, 0];
        // Indices 1,0,1 packed high nibble first, row padded to 4 bytes.
        let bits = [0x10, 0x10, 0, 0];
        let data = bmp(3, 1, 4, &palette, &bits);
        let out = decode(&data, None, &Unstoppable).unwrap();
        assert_eq!(out.pixels(), &[40, 50, 60, 10, 20, 30, 40, 50, 60]);
    }

    #[test]
    fn out_of_range_file_palette_index_is_rejected() {
        let palette = [1, 2, 3, 0];
        let bits = [5, 0, 0, 0];
        let data = bmp(1, 1, 8, &palette, &bits);
        assert!(matches!(
            decode(&data, None, &Unstoppable),
            Err(ImageError::InvalidData(_))
        ));
    }

    #[test]
    fn rgb565_bitfields_scale_to_8bit() {
        let mut masks = Vec::new();
        for m in [0xf800u32, 0x07e0, 0x001f] {
            masks.extend_from_slice(&m.to_le_bytes());
        }
        let bits = [0x00, 0xf8, 0, 0]; // pure red
        let data = bmp(1, 1, 16, &masks, &bits);
        let out = decode(&data, None, &Unstoppable).unwrap();
        assert_eq!(out.layout, PixelLayout::Bgrx8);
        assert_eq!(out.pixels(), &[0, 0, 255, 255]);
    }

    #[test]
    fn truncated_bits_fail() {
        let data = bmp(2, 2, 24, &[], &[0; 8]);
        assert!(matches!(
            decode(&data, None, &Unstoppable),
            Err(ImageError::UnexpectedEof)
        ));
    }

    #[test]
    fn rle_is_unsupported() {
        let mut data = file_header(0, 54);
        data.extend(info_header(1, 1, 8, BI_RLE8, 0));
        assert!(matches!(
            decode(&data, None, &Unstoppable),
            Err(ImageError::UnsupportedVariant(_))
        ));
    }

    #[test]
    fn probe_reads_header_only() {
        let data = bmp(7, -3, 32, &[], &[]);
        let info = probe(&data).unwrap();
        assert_eq!((info.width, info.height), (7, 3));
        assert_eq!(info.native_layout, PixelLayout::Bgrx8);
    }
}
