use std::borrow::Cow;

use crate::codec::ImageFormat;
use crate::pixel::PixelLayout;

/// One decoded frame. Pixels may be borrowed (zero-copy) or owned, and are
/// always top-down and tightly packed.
#[derive(Clone, Debug)]
pub struct DecodeOutput<'a> {
    pixels: Cow<'a, [u8]>,
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub format: ImageFormat,
}

impl<'a> DecodeOutput<'a> {
    /// Access the pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Row stride in bytes.
    pub fn stride(&self) -> usize {
        self.width as usize * self.layout.bytes_per_pixel()
    }

    /// Take ownership of the pixel data (copies if borrowed).
    pub fn into_owned(self) -> DecodeOutput<'static> {
        DecodeOutput {
            pixels: Cow::Owned(self.pixels.into_owned()),
            width: self.width,
            height: self.height,
            layout: self.layout,
            format: self.format,
        }
    }

    /// Whether the pixel data is borrowed (zero-copy from input).
    pub fn is_borrowed(&self) -> bool {
        matches!(self.pixels, Cow::Borrowed(_))
    }

    pub(crate) fn borrowed(
        data: &'a [u8],
        width: u32,
        height: u32,
        layout: PixelLayout,
        format: ImageFormat,
    ) -> Self {
        Self {
            pixels: Cow::Borrowed(data),
            width,
            height,
            layout,
            format,
        }
    }

    pub(crate) fn owned(
        data: Vec<u8>,
        width: u32,
        height: u32,
        layout: PixelLayout,
        format: ImageFormat,
    ) -> Self {
        Self {
            pixels: Cow::Owned(data),
            width,
            height,
            layout,
            format,
        }
    }
}
