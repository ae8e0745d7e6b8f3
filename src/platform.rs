//! Platform bitmaps: device-independent bitmaps handed over by the host
//! windowing system.

use crate::codec::bmp;
use crate::convert::{ConvertFlags, RawLayout};
use crate::error::ImageError;
use crate::pixel::{AlphaMode, PixelLayout};

/// A 24- or 32-bit device-independent bitmap.
///
/// Rows are padded to 4 bytes and stored bottom-up unless the bitmap was
/// created top-down. In 32-bit bitmaps the 4th byte of each pixel is either
/// padding or alpha; which one is decided by the [`AlphaMode`] used when
/// importing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlatformBitmap {
    width: u32,
    height: u32,
    bits_per_pixel: u16,
    top_down: bool,
    bits: Vec<u8>,
}

impl PlatformBitmap {
    /// Wrap existing bits. `bits` must hold `stride * height` bytes where
    /// `stride` is [`PlatformBitmap::stride_for`].
    pub fn new(
        width: u32,
        height: u32,
        bits_per_pixel: u16,
        top_down: bool,
        bits: Vec<u8>,
    ) -> Result<Self, ImageError> {
        if !matches!(bits_per_pixel, 24 | 32) {
            return Err(ImageError::UnsupportedVariant(format!(
                "{bits_per_pixel}-bit platform bitmap"
            )));
        }
        let needed = Self::stride_for(width, bits_per_pixel)
            .checked_mul(height as usize)
            .ok_or(ImageError::DimensionsTooLarge { width, height })?;
        if bits.len() < needed {
            return Err(ImageError::BufferTooSmall {
                needed,
                actual: bits.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bits_per_pixel,
            top_down,
            bits,
        })
    }

    /// Parse a packed DIB: a `BITMAPINFOHEADER` (or later) followed by
    /// optional masks and the pixel bits, as found in `CF_DIB` clipboard
    /// data. Only 24- and 32-bit `BI_RGB` DIBs are accepted.
    pub fn from_dib(dib: &[u8]) -> Result<Self, ImageError> {
        let info = bmp::parse_dib_info(dib)?;
        if !matches!(info.bpp, 24 | 32) || !info.is_plain_rgb() {
            return Err(ImageError::UnsupportedVariant(format!(
                "{}-bit DIB with compression other than BI_RGB",
                info.bpp
            )));
        }
        let needed = info
            .row_stride()
            .checked_mul(info.height as usize)
            .ok_or(ImageError::DimensionsTooLarge {
                width: info.width,
                height: info.height,
            })?;
        let bits = dib
            .get(info.packed_bits_offset..)
            .and_then(|b| b.get(..needed))
            .ok_or(ImageError::UnexpectedEof)?
            .to_vec();
        Self::new(info.width, info.height, info.bpp, info.top_down, bits)
    }

    /// Row stride of a DIB with the given width and depth.
    pub fn stride_for(width: u32, bits_per_pixel: u16) -> usize {
        (width as usize * usize::from(bits_per_pixel)).div_ceil(32) * 4
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bits_per_pixel(&self) -> u16 {
        self.bits_per_pixel
    }

    pub fn is_top_down(&self) -> bool {
        self.top_down
    }

    pub fn stride(&self) -> usize {
        Self::stride_for(self.width, self.bits_per_pixel)
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Converter description for these bits under `alpha`.
    ///
    /// 24-bit bitmaps are always opaque. `Use` premultiplies, `UsePremultiplied`
    /// copies alpha through.
    pub(crate) fn raw_layout(&self, alpha: AlphaMode) -> RawLayout {
        let mut flags = ConvertFlags::empty();
        if !self.top_down {
            flags |= ConvertFlags::BOTTOM_UP;
        }
        if self.bits_per_pixel == 32 {
            match alpha {
                AlphaMode::Ignore => {}
                AlphaMode::Use => flags |= ConvertFlags::HAS_ALPHA | ConvertFlags::PREMULTIPLY,
                AlphaMode::UsePremultiplied => flags |= ConvertFlags::HAS_ALPHA,
            }
        }
        RawLayout::new(
            usize::from(self.bits_per_pixel / 8),
            [2, 1, 0, 3],
            flags,
        )
    }

    /// Source layout of one top-down row under `alpha`.
    pub(crate) fn pixel_layout(&self, alpha: AlphaMode) -> PixelLayout {
        match (self.bits_per_pixel, alpha) {
            (24, _) => PixelLayout::Bgr8,
            (_, AlphaMode::Ignore) => PixelLayout::Bgrx8,
            (_, AlphaMode::Use) => PixelLayout::Bgra8,
            (_, AlphaMode::UsePremultiplied) => PixelLayout::Pbgra8,
        }
    }

    /// Copy rows into `dst` top-down, `dst_stride` bytes apart.
    pub(crate) fn copy_rows_top_down(&self, dst: &mut [u8], dst_stride: usize) {
        let stride = self.stride();
        let row_bytes = self.width as usize * usize::from(self.bits_per_pixel / 8);
        let h = self.height as usize;
        for y in 0..h {
            let src_y = if self.top_down { y } else { h - 1 - y };
            dst[y * dst_stride..][..row_bytes]
                .copy_from_slice(&self.bits[src_y * stride..][..row_bytes]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stride_is_dword_aligned() {
        assert_eq!(PlatformBitmap::stride_for(1, 24), 4);
        assert_eq!(PlatformBitmap::stride_for(3, 24), 12);
        assert_eq!(PlatformBitmap::stride_for(5, 24), 16);
        assert_eq!(PlatformBitmap::stride_for(5, 32), 20);
    }

    #[test]
    fn short_bits_rejected() {
        assert!(matches!(
            PlatformBitmap::new(2, 2, 24, false, vec![0; 15]),
            Err(ImageError::BufferTooSmall { needed: 16, .. })
        ));
        assert!(matches!(
            PlatformBitmap::new(1, 1, 8, false, vec![0; 4]),
            Err(ImageError::UnsupportedVariant(_))
        ));
    }

    #[test]
    fn rows_copied_top_down() {
        // 1x2 bottom-up 24-bit: stored row 0 is the bottom row.
        let bmp = PlatformBitmap::new(1, 2, 24, false, vec![1, 2, 3, 0, 4, 5, 6, 0]).unwrap();
        let mut out = [0u8; 6];
        bmp.copy_rows_top_down(&mut out, 3);
        assert_eq!(out, [4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn alpha_mode_picks_flags() {
        let bmp = PlatformBitmap::new(1, 1, 32, true, vec![0; 4]).unwrap();
        assert!(bmp.raw_layout(AlphaMode::Ignore).flags.is_empty());
        assert_eq!(
            bmp.raw_layout(AlphaMode::Use).flags,
            ConvertFlags::HAS_ALPHA | ConvertFlags::PREMULTIPLY
        );
        assert_eq!(
            bmp.raw_layout(AlphaMode::UsePremultiplied).flags,
            ConvertFlags::HAS_ALPHA
        );
    }

    #[test]
    fn packed_dib_parses() {
        let mut dib = 40u32.to_le_bytes().to_vec();
        dib.extend_from_slice(&1i32.to_le_bytes());
        dib.extend_from_slice(&(-1i32).to_le_bytes());
        dib.extend_from_slice(&1u16.to_le_bytes());
        dib.extend_from_slice(&32u16.to_le_bytes());
        dib.extend_from_slice(&[0; 24]);
        dib.extend_from_slice(&[10, 20, 30, 40]);
        let bmp = PlatformBitmap::from_dib(&dib).unwrap();
        assert_eq!((bmp.width(), bmp.height()), (1, 1));
        assert!(bmp.is_top_down());
        assert_eq!(bmp.bits(), &[10, 20, 30, 40]);
    }
}
