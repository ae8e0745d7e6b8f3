use std::fmt;

use crate::backend::{LockMode, Rect, SurfaceMut};
use crate::error::ImageError;
use crate::pixel::PixelLayout;

/// Anything pixels can be pulled from: decoded frames, bitmaps.
pub trait BitmapSource: fmt::Debug {
    fn size(&self) -> (u32, u32);

    fn pixel_layout(&self) -> PixelLayout;

    /// Copy every pixel into `dst`, top-down, rows `stride` bytes apart.
    fn copy_pixels(&self, dst: &mut [u8], stride: usize) -> Result<(), ImageError>;
}

/// Number of bytes `copy_pixels` needs for a source with `stride`.
pub(crate) fn required_len(
    width: u32,
    height: u32,
    layout: PixelLayout,
    stride: usize,
) -> Option<usize> {
    if width == 0 || height == 0 {
        return Some(0);
    }
    let row = (width as usize).checked_mul(layout.bytes_per_pixel())?;
    stride.checked_mul(height as usize - 1)?.checked_add(row)
}

/// A bitmap owned by the imaging factory. Rows are 4-byte aligned.
pub struct Bitmap {
    width: u32,
    height: u32,
    layout: PixelLayout,
    stride: usize,
    pixels: Vec<u8>,
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layout", &self.layout)
            .field("stride", &self.stride)
            .finish_non_exhaustive()
    }
}

impl Bitmap {
    /// Zeroed bitmap. Fails with [`ImageError::Allocation`] when the
    /// buffer cannot be reserved.
    pub(crate) fn new(width: u32, height: u32, layout: PixelLayout) -> Result<Self, ImageError> {
        let stride = (width as usize)
            .checked_mul(layout.bytes_per_pixel())
            .and_then(|row| row.checked_next_multiple_of(4))
            .ok_or(ImageError::DimensionsTooLarge { width, height })?;
        let len = stride
            .checked_mul(height as usize)
            .ok_or(ImageError::DimensionsTooLarge { width, height })?;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| ImageError::Allocation { op: "create_bitmap" })?;
        pixels.resize(len, 0);
        Ok(Self {
            width,
            height,
            layout,
            stride,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Lock `rect` for direct access. Released when the guard drops.
    pub fn lock(&mut self, rect: Rect, mode: LockMode) -> Result<BitmapLock<'_>, ImageError> {
        if !rect.fits(self.width, self.height) {
            log::warn!(
                "bitmap lock: {}x{} at ({}, {}) outside {}x{}",
                rect.width,
                rect.height,
                rect.x,
                rect.y,
                self.width,
                self.height
            );
            return Err(ImageError::Lock { op: "bitmap lock" });
        }
        log::debug!(
            "bitmap locked: {}x{} at ({}, {}) {mode:?}",
            rect.width,
            rect.height,
            rect.x,
            rect.y
        );
        Ok(BitmapLock {
            bitmap: self,
            rect,
            mode,
        })
    }
}

impl BitmapSource for Bitmap {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_layout(&self) -> PixelLayout {
        self.layout
    }

    fn copy_pixels(&self, dst: &mut [u8], stride: usize) -> Result<(), ImageError> {
        let needed = required_len(self.width, self.height, self.layout, stride).ok_or(
            ImageError::DimensionsTooLarge {
                width: self.width,
                height: self.height,
            },
        )?;
        if dst.len() < needed {
            return Err(ImageError::BufferTooSmall {
                needed,
                actual: dst.len(),
            });
        }
        let row = self.width as usize * self.layout.bytes_per_pixel();
        if row == 0 {
            return Ok(());
        }
        for (y, src) in self
            .pixels
            .chunks_exact(self.stride)
            .take(self.height as usize)
            .enumerate()
        {
            dst[y * stride..][..row].copy_from_slice(&src[..row]);
        }
        Ok(())
    }
}

/// Direct view of a locked rectangle of a [`Bitmap`].
#[derive(Debug)]
pub struct BitmapLock<'a> {
    bitmap: &'a mut Bitmap,
    rect: Rect,
    mode: LockMode,
}

impl BitmapLock<'_> {
    fn offset(&self) -> usize {
        self.rect.y as usize * self.bitmap.stride
            + self.rect.x as usize * self.bitmap.layout.bytes_per_pixel()
    }

    pub fn stride(&self) -> usize {
        self.bitmap.stride
    }

    /// Locked pixels, starting at the rectangle's top-left pixel.
    pub fn data(&self) -> &[u8] {
        let offset = self.offset();
        self.bitmap.pixels.get(offset..).unwrap_or_default()
    }

    /// Writable view. Fails for read-only locks.
    pub fn surface(&mut self) -> Result<SurfaceMut<'_>, ImageError> {
        if !self.mode.writes() {
            return Err(ImageError::Lock { op: "bitmap lock" });
        }
        let offset = self.offset();
        let stride = self.bitmap.stride;
        let bytes_per_pixel = self.bitmap.layout.bytes_per_pixel();
        Ok(SurfaceMut {
            data: self.bitmap.pixels.get_mut(offset..).unwrap_or_default(),
            stride,
            bytes_per_pixel,
        })
    }
}

impl Drop for BitmapLock<'_> {
    fn drop(&mut self) {
        log::debug!(
            "bitmap unlocked: {}x{} {:?}",
            self.rect.width,
            self.rect.height,
            self.mode
        );
    }
}
