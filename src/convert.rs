//! Pixel-format conversion into the canonical premultiplied BGRA layout.
//!
//! These routines write every destination pixel of a `width` x `height`
//! rectangle. The destination is usually a locked bitmap surface; the source
//! is any 8-bit interleaved buffer described by a [`RawLayout`], or a
//! palette-indexed buffer.
//!
//! Bytes 0, 1 and 2 of a destination pixel receive blue, green and red.
//! Byte 3 (when the destination has four bytes per pixel) receives alpha.
//!
//! Strides are in bytes. A source stride of `0` means the rows are tightly
//! packed. Slices must cover every row the stride implies; indexing outside
//! them panics.

use bitflags::bitflags;

use crate::pixel::{Color, PixelLayout};

bitflags! {
    /// Source interpretation flags.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ConvertFlags: u32 {
        /// Source rows are stored last row first.
        const BOTTOM_UP = 0x0001;
        /// Source pixels carry an alpha byte.
        const HAS_ALPHA = 0x0002;
        /// Scale color channels by alpha while storing.
        const PREMULTIPLY = 0x0004;
    }
}

/// Byte layout of one source pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawLayout {
    pub bytes_per_pixel: usize,
    pub red: usize,
    pub green: usize,
    pub blue: usize,
    /// Ignored unless `flags` contains [`ConvertFlags::HAS_ALPHA`].
    pub alpha: usize,
    pub flags: ConvertFlags,
}

impl RawLayout {
    /// `offsets` is `[red, green, blue, alpha]`.
    pub const fn new(bytes_per_pixel: usize, offsets: [usize; 4], flags: ConvertFlags) -> Self {
        Self {
            bytes_per_pixel,
            red: offsets[0],
            green: offsets[1],
            blue: offsets[2],
            alpha: offsets[3],
            flags,
        }
    }
}

/// Scale a color channel by alpha, truncating: `(channel * alpha) / 255`.
#[inline]
pub fn premultiply(channel: u8, alpha: u8) -> u8 {
    ((u16::from(channel) * u16::from(alpha)) / 255) as u8
}

/// Convert an interleaved 8-bit source buffer into canonical pixels.
///
/// With [`ConvertFlags::BOTTOM_UP`], destination row `y` is read from source
/// row `height - 1 - y`.
///
/// # Panics
///
/// If `dst` or `src` is shorter than the rows their strides describe, or if
/// `dst_bytes_per_pixel < 3`.
#[allow(clippy::too_many_arguments)]
pub fn raw_to_canonical(
    width: u32,
    height: u32,
    dst: &mut [u8],
    dst_stride: usize,
    dst_bytes_per_pixel: usize,
    src: &[u8],
    src_stride: usize,
    layout: &RawLayout,
) {
    if width == 0 || height == 0 {
        return;
    }
    let w = width as usize;
    let h = height as usize;
    let src_bpp = layout.bytes_per_pixel;

    // Resolved before row order is applied.
    let src_stride = if src_stride == 0 {
        w * src_bpp
    } else {
        src_stride
    };

    let bottom_up = layout.flags.contains(ConvertFlags::BOTTOM_UP);
    let has_alpha = layout.flags.contains(ConvertFlags::HAS_ALPHA);
    let premul = layout.flags.contains(ConvertFlags::PREMULTIPLY);

    for y in 0..h {
        let src_y = if bottom_up { h - 1 - y } else { y };
        let src_row = &src[src_y * src_stride..][..w * src_bpp];
        let dst_row = &mut dst[y * dst_stride..][..w * dst_bytes_per_pixel];

        for (d, s) in dst_row
            .chunks_exact_mut(dst_bytes_per_pixel)
            .zip(src_row.chunks_exact(src_bpp))
        {
            d[0] = s[layout.blue];
            d[1] = s[layout.green];
            d[2] = s[layout.red];

            if dst_bytes_per_pixel >= 4 {
                let a = if has_alpha { s[layout.alpha] } else { 255 };
                d[3] = a;
                if premul {
                    d[0] = premultiply(d[0], a);
                    d[1] = premultiply(d[1], a);
                    d[2] = premultiply(d[2], a);
                }
            }
        }
    }
}

/// Convert a palette-indexed source buffer into canonical pixels.
///
/// Every source byte indexes `palette`; alpha is always 255. Palette
/// sources are top-down and never premultiplied.
///
/// # Panics
///
/// If a source byte is not a valid index into `palette`, or if either
/// buffer is shorter than its stride describes.
#[allow(clippy::too_many_arguments)]
pub fn palette_to_canonical(
    width: u32,
    height: u32,
    dst: &mut [u8],
    dst_stride: usize,
    dst_bytes_per_pixel: usize,
    src: &[u8],
    src_stride: usize,
    palette: &[Color],
) {
    if width == 0 || height == 0 {
        return;
    }
    let w = width as usize;
    let h = height as usize;
    let src_stride = if src_stride == 0 { w } else { src_stride };

    for y in 0..h {
        let src_row = &src[y * src_stride..][..w];
        let dst_row = &mut dst[y * dst_stride..][..w * dst_bytes_per_pixel];

        for (d, &index) in dst_row.chunks_exact_mut(dst_bytes_per_pixel).zip(src_row) {
            let color = palette[usize::from(index)];
            d[0] = color.b;
            d[1] = color.g;
            d[2] = color.r;
            if dst_bytes_per_pixel >= 4 {
                d[3] = 0xff;
            }
        }
    }
}

/// Convert any decoded [`PixelLayout`] into canonical pixels.
///
/// 8-bit layouts go straight through [`raw_to_canonical`]. `Rgba16` is
/// narrowed to `Rgba8` row by row first. Straight-alpha layouts are
/// premultiplied; `Bgrx8` and alpha-less layouts become opaque.
#[allow(clippy::too_many_arguments)]
pub fn layout_to_canonical(
    width: u32,
    height: u32,
    dst: &mut [u8],
    dst_stride: usize,
    dst_bytes_per_pixel: usize,
    src: &[u8],
    src_stride: usize,
    layout: PixelLayout,
) {
    if let Some(raw) = layout.raw_layout() {
        raw_to_canonical(
            width,
            height,
            dst,
            dst_stride,
            dst_bytes_per_pixel,
            src,
            src_stride,
            &raw,
        );
        return;
    }
    if width == 0 || height == 0 {
        return;
    }

    let w = width as usize;
    let src_stride = if src_stride == 0 {
        w * layout.bytes_per_pixel()
    } else {
        src_stride
    };
    let mut narrowed = vec![0u8; w * 4];

    for y in 0..height as usize {
        let src_row = &src[y * src_stride..][..w * layout.bytes_per_pixel()];
        for (out, pair) in narrowed.iter_mut().zip(src_row.chunks_exact(2)) {
            *out = narrow_u16(u16::from_ne_bytes([pair[0], pair[1]]));
        }
        raw_to_canonical(
            width,
            1,
            &mut dst[y * dst_stride..],
            dst_stride,
            dst_bytes_per_pixel,
            &narrowed,
            0,
            &NARROWED_RGBA8,
        );
    }
}

const NARROWED_RGBA8: RawLayout = RawLayout::new(
    4,
    [0, 1, 2, 3],
    ConvertFlags::HAS_ALPHA.union(ConvertFlags::PREMULTIPLY),
);

/// Scale a 16-bit sample to 8 bits, rounding to nearest.
#[inline]
pub(crate) fn narrow_u16(v: u16) -> u8 {
    ((u32::from(v) * 255 + 32767) / 65535) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::PixelFormat;

    fn convert(
        width: u32,
        height: u32,
        src: &[u8],
        src_stride: usize,
        format: PixelFormat,
    ) -> Vec<u8> {
        let mut dst = vec![0u8; width as usize * height as usize * 4];
        let layout = format.raw_layout().unwrap();
        raw_to_canonical(
            width,
            height,
            &mut dst,
            width as usize * 4,
            4,
            src,
            src_stride,
            &layout,
        );
        dst
    }

    #[test]
    fn premultiply_truncates() {
        assert_eq!(premultiply(200, 128), 100);
        assert_eq!(premultiply(100, 128), 50);
        assert_eq!(premultiply(50, 128), 25);
        // 255 * 1 / 255 = 1, 254 * 1 / 255 = 0 (rounding would give 1)
        assert_eq!(premultiply(255, 1), 1);
        assert_eq!(premultiply(254, 1), 0);
        assert_eq!(premultiply(255, 255), 255);
        assert_eq!(premultiply(77, 0), 0);
    }

    #[test]
    fn straight_bgra_premultiplies_on_ingest() {
        let dst = convert(1, 1, &[200, 100, 50, 128], 0, PixelFormat::B8G8R8A8);
        assert_eq!(dst, [100, 50, 25, 128]);
    }

    #[test]
    fn premultiplied_bgra_copies_through() {
        let dst = convert(
            1,
            1,
            &[200, 100, 50, 128],
            0,
            PixelFormat::B8G8R8A8Premultiplied,
        );
        assert_eq!(dst, [200, 100, 50, 128]);
    }

    #[test]
    fn rgb_is_reordered_and_opaque() {
        let dst = convert(1, 1, &[10, 20, 30], 0, PixelFormat::R8G8B8);
        assert_eq!(dst, [30, 20, 10, 255]);
    }

    #[test]
    fn rgba_is_reordered_and_premultiplied() {
        let dst = convert(1, 1, &[50, 100, 200, 128], 0, PixelFormat::R8G8B8A8);
        assert_eq!(dst, [100, 50, 25, 128]);

        let opaque = convert(1, 1, &[1, 2, 3, 255], 0, PixelFormat::R8G8B8A8);
        assert_eq!(opaque, [3, 2, 1, 255]);
    }

    #[test]
    fn bottom_up_reverses_rows() {
        for n in 1..=5u32 {
            // Row r is filled with (r, r, r, 255).
            let mut src = Vec::new();
            for r in 0..n {
                src.extend_from_slice(&[r as u8, r as u8, r as u8, 255]);
            }
            let dst = convert(1, n, &src, 0, PixelFormat::B8G8R8A8Premultiplied);
            assert_eq!(dst[0], (n - 1) as u8, "dst row 0 is src row n-1");
            let last = ((n - 1) * 4) as usize;
            assert_eq!(dst[last], 0, "dst row n-1 is src row 0");
        }
    }

    #[test]
    fn zero_stride_means_tightly_packed() {
        let src: Vec<u8> = (0..16).map(|v| v * 10).collect();
        for format in [
            PixelFormat::R8G8B8A8,
            PixelFormat::B8G8R8A8,
            PixelFormat::B8G8R8A8Premultiplied,
        ] {
            let packed = convert(2, 2, &src, 0, format);
            let explicit = convert(2, 2, &src, 2 * 4, format);
            assert_eq!(packed, explicit, "{format:?}");
        }
        let rgb = &src[..12];
        assert_eq!(
            convert(2, 2, rgb, 0, PixelFormat::R8G8B8),
            convert(2, 2, rgb, 6, PixelFormat::R8G8B8)
        );
    }

    #[test]
    fn source_padding_is_skipped() {
        // 1 pixel wide, 3-byte pixels, stride 4 (one padding byte per row).
        let src = [1, 2, 3, 0xEE, 4, 5, 6, 0xEE];
        let dst = convert(1, 2, &src, 4, PixelFormat::R8G8B8);
        assert_eq!(dst, [3, 2, 1, 255, 6, 5, 4, 255]);
    }

    #[test]
    fn destination_stride_is_honored() {
        let layout = PixelFormat::R8G8B8.raw_layout().unwrap();
        let mut dst = vec![0xAAu8; 2 * 12];
        raw_to_canonical(2, 2, &mut dst, 12, 4, &[9; 12], 0, &layout);
        assert_eq!(&dst[..8], &[9, 9, 9, 255, 9, 9, 9, 255]);
        assert_eq!(&dst[8..12], &[0xAA; 4], "row padding untouched");
        assert_eq!(&dst[12..20], &[9, 9, 9, 255, 9, 9, 9, 255]);
    }

    #[test]
    fn zero_extent_touches_nothing() {
        let layout = PixelFormat::B8G8R8A8.raw_layout().unwrap();
        // Empty buffers would panic on any access.
        raw_to_canonical(0, 5, &mut [], 0, 4, &[], 0, &layout);
        raw_to_canonical(5, 0, &mut [], 0, 4, &[], 0, &layout);
        palette_to_canonical(0, 3, &mut [], 0, 4, &[], 0, &[]);
        palette_to_canonical(3, 0, &mut [], 0, 4, &[], 0, &[]);
        layout_to_canonical(0, 0, &mut [], 0, 4, &[], 0, PixelLayout::Rgba16);
    }

    #[test]
    fn palette_lookup_is_opaque() {
        let palette = [Color::new(255, 0, 0)];
        for (w, h) in [(1u32, 1u32), (3, 2), (7, 5)] {
            let src = vec![0u8; (w * h) as usize];
            let mut dst = vec![0u8; (w * h * 4) as usize];
            palette_to_canonical(w, h, &mut dst, w as usize * 4, 4, &src, 0, &palette);
            for px in dst.chunks_exact(4) {
                assert_eq!(px, [0, 0, 255, 255]);
            }
        }
    }

    #[test]
    fn palette_with_stride() {
        let palette = [Color::new(1, 2, 3), Color::new(4, 5, 6)];
        let src = [0, 1, 0xFF, 1, 0, 0xFF];
        let mut dst = vec![0u8; 16];
        palette_to_canonical(2, 2, &mut dst, 8, 4, &src, 3, &palette);
        assert_eq!(
            dst,
            [3, 2, 1, 255, 6, 5, 4, 255, 6, 5, 4, 255, 3, 2, 1, 255]
        );
    }

    #[test]
    fn three_byte_destination_skips_alpha() {
        let layout = PixelFormat::R8G8B8A8.raw_layout().unwrap();
        let mut dst = [0u8; 3];
        raw_to_canonical(1, 1, &mut dst, 3, 3, &[10, 20, 30, 0], 0, &layout);
        // No alpha byte, so no premultiplication either.
        assert_eq!(dst, [30, 20, 10]);
    }

    #[test]
    fn wide_layout_is_narrowed_then_premultiplied() {
        let mut src = Vec::new();
        for v in [65535u16, 32896, 0, 32896] {
            src.extend_from_slice(&v.to_ne_bytes());
        }
        let mut dst = [0u8; 4];
        layout_to_canonical(1, 1, &mut dst, 4, 4, &src, 0, PixelLayout::Rgba16);
        // r=255 g=128 b=0 a=128 -> premultiplied b=0 g=64 r=128
        assert_eq!(dst, [0, 64, 128, 128]);
    }

    #[test]
    fn gray_and_bgrx_layouts() {
        let mut dst = [0u8; 8];
        layout_to_canonical(2, 1, &mut dst, 8, 4, &[7, 200], 0, PixelLayout::Gray8);
        assert_eq!(dst, [7, 7, 7, 255, 200, 200, 200, 255]);

        let mut dst = [0u8; 4];
        layout_to_canonical(1, 1, &mut dst, 4, 4, &[1, 2, 3, 0], 0, PixelLayout::Bgrx8);
        assert_eq!(dst, [1, 2, 3, 255]);
    }
}
