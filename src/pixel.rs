use crate::convert::{ConvertFlags, RawLayout};

/// Bytes per pixel of the canonical layout every image is normalized to.
pub const CANONICAL_BYTES_PER_PIXEL: usize = 4;

/// Pixel memory layout of decoded or imported pixel data.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    /// Single channel, 8-bit grayscale.
    Gray8,
    /// 3 channels, 8-bit RGB.
    Rgb8,
    /// 4 channels, 8-bit RGBA, straight alpha.
    Rgba8,
    /// 3 channels, 8-bit BGR.
    Bgr8,
    /// 4 channels, 8-bit BGRA, straight alpha.
    Bgra8,
    /// 4 channels, 8-bit BGRX (opaque; 4th byte is padding, not alpha).
    Bgrx8,
    /// 4 channels, 16-bit RGBA (native endian), straight alpha.
    Rgba16,
    /// 4 channels, 8-bit BGRA, premultiplied alpha. The canonical layout.
    Pbgra8,
}

impl PixelLayout {
    /// Bytes per pixel for this layout.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Rgb8 | Self::Bgr8 => 3,
            Self::Rgba8 | Self::Bgra8 | Self::Bgrx8 | Self::Pbgra8 => 4,
            Self::Rgba16 => 8,
        }
    }

    /// Whether the layout carries a meaningful alpha channel.
    pub fn has_alpha(&self) -> bool {
        matches!(
            self,
            Self::Rgba8 | Self::Bgra8 | Self::Rgba16 | Self::Pbgra8
        )
    }

    /// Whether this layout has the same memory representation as `other`.
    ///
    /// `Bgra8` and `Bgrx8` are compatible (same 4-byte B,G,R,X/A layout).
    pub fn is_memory_compatible(&self, other: PixelLayout) -> bool {
        if *self == other {
            return true;
        }
        matches!(
            (*self, other),
            (Self::Bgra8, Self::Bgrx8) | (Self::Bgrx8, Self::Bgra8)
        )
    }

    /// Converter description for 8-bit layouts. `None` for layouts that
    /// must be narrowed to 8 bits first.
    pub(crate) fn raw_layout(&self) -> Option<RawLayout> {
        let straight = ConvertFlags::HAS_ALPHA | ConvertFlags::PREMULTIPLY;
        let layout = match self {
            Self::Gray8 => RawLayout::new(1, [0, 0, 0, 0], ConvertFlags::empty()),
            Self::Rgb8 => RawLayout::new(3, [0, 1, 2, 0], ConvertFlags::empty()),
            Self::Rgba8 => RawLayout::new(4, [0, 1, 2, 3], straight),
            Self::Bgr8 => RawLayout::new(3, [2, 1, 0, 0], ConvertFlags::empty()),
            Self::Bgra8 => RawLayout::new(4, [2, 1, 0, 3], straight),
            Self::Bgrx8 => RawLayout::new(4, [2, 1, 0, 0], ConvertFlags::empty()),
            Self::Pbgra8 => RawLayout::new(4, [2, 1, 0, 3], ConvertFlags::HAS_ALPHA),
            Self::Rgba16 => return None,
        };
        Some(layout)
    }
}

/// Layout of a caller-supplied pixel buffer passed to
/// [`ImageApi::create_from_buffer`](crate::ImageApi::create_from_buffer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One byte per pixel indexing a [`Color`] palette. Always top-down and
    /// opaque.
    Palette,
    /// R, G, B bytes, top-down, opaque.
    R8G8B8,
    /// R, G, B, A bytes, top-down, straight alpha.
    R8G8B8A8,
    /// B, G, R, A bytes, bottom-up (DIB row order), straight alpha.
    B8G8R8A8,
    /// B, G, R, A bytes, bottom-up (DIB row order), alpha already
    /// premultiplied.
    B8G8R8A8Premultiplied,
}

impl PixelFormat {
    /// Bytes one source pixel occupies.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Palette => 1,
            Self::R8G8B8 => 3,
            Self::R8G8B8A8 | Self::B8G8R8A8 | Self::B8G8R8A8Premultiplied => 4,
        }
    }

    /// Channel offsets and conversion flags for this format.
    ///
    /// Returns `None` only for [`PixelFormat::Palette`], which is handled by
    /// the palette routine.
    pub fn raw_layout(&self) -> Option<RawLayout> {
        let layout = match self {
            Self::Palette => return None,
            Self::R8G8B8 => RawLayout::new(3, [0, 1, 2, 0], ConvertFlags::empty()),
            Self::R8G8B8A8 => RawLayout::new(
                4,
                [0, 1, 2, 3],
                ConvertFlags::HAS_ALPHA | ConvertFlags::PREMULTIPLY,
            ),
            Self::B8G8R8A8 => RawLayout::new(
                4,
                [2, 1, 0, 3],
                ConvertFlags::HAS_ALPHA | ConvertFlags::PREMULTIPLY | ConvertFlags::BOTTOM_UP,
            ),
            Self::B8G8R8A8Premultiplied => RawLayout::new(
                4,
                [2, 1, 0, 3],
                ConvertFlags::HAS_ALPHA | ConvertFlags::BOTTOM_UP,
            ),
        };
        Some(layout)
    }
}

/// How the alpha channel of an imported platform bitmap is interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AlphaMode {
    /// Treat the bitmap as opaque; the 4th byte is padding.
    #[default]
    Ignore,
    /// The bitmap carries straight alpha; it is premultiplied on import.
    Use,
    /// The bitmap already carries premultiplied alpha.
    UsePremultiplied,
}

/// A 24-bit palette color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// From a `0x00BBGGRR` color reference value.
    pub const fn from_colorref(value: u32) -> Self {
        Self {
            r: value as u8,
            g: (value >> 8) as u8,
            b: (value >> 16) as u8,
        }
    }

    /// To a `0x00BBGGRR` color reference value.
    pub const fn to_colorref(self) -> u32 {
        self.r as u32 | (self.g as u32) << 8 | (self.b as u32) << 16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_buffer_format_has_a_conversion() {
        let formats = [
            PixelFormat::Palette,
            PixelFormat::R8G8B8,
            PixelFormat::R8G8B8A8,
            PixelFormat::B8G8R8A8,
            PixelFormat::B8G8R8A8Premultiplied,
        ];
        for format in formats {
            match format.raw_layout() {
                Some(layout) => assert_eq!(layout.bytes_per_pixel, format.bytes_per_pixel()),
                None => assert_eq!(format, PixelFormat::Palette),
            }
        }
    }

    #[test]
    fn bgra_formats_are_bottom_up() {
        for format in [PixelFormat::B8G8R8A8, PixelFormat::B8G8R8A8Premultiplied] {
            let layout = format.raw_layout().unwrap();
            assert!(layout.flags.contains(ConvertFlags::BOTTOM_UP));
            assert_eq!((layout.red, layout.green, layout.blue), (2, 1, 0));
        }
        let premul = PixelFormat::B8G8R8A8Premultiplied.raw_layout().unwrap();
        assert!(!premul.flags.contains(ConvertFlags::PREMULTIPLY));
    }

    #[test]
    fn colorref_roundtrip() {
        let c = Color::from_colorref(0x00_30_20_10);
        assert_eq!(c, Color::new(0x10, 0x20, 0x30));
        assert_eq!(c.to_colorref(), 0x00_30_20_10);
    }

    #[test]
    fn only_wide_layouts_lack_raw_layout() {
        assert!(PixelLayout::Rgba16.raw_layout().is_none());
        assert_eq!(
            PixelLayout::Pbgra8.bytes_per_pixel(),
            CANONICAL_BYTES_PER_PIXEL
        );
        assert!(PixelLayout::Bgra8.is_memory_compatible(PixelLayout::Bgrx8));
        assert!(!PixelLayout::Bgrx8.has_alpha());
    }
}
