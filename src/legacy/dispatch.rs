//! Entry-point table of the legacy engine and the objects it hands out.

use std::path::Path;

use super::Status;
use super::engine;
use crate::backend::{LockMode, Rect};
use crate::pixel::CANONICAL_BYTES_PER_PIXEL;
use crate::platform::PlatformBitmap;
use crate::resource::ImageStream;

/// Result of a legacy entry point.
pub type LegacyResult<T> = Result<T, Status>;

/// Row alignment of legacy bitmaps, in bytes.
const ROW_ALIGN: usize = 16;

/// A legacy engine bitmap: 32-bit premultiplied ARGB, which in memory is
/// the canonical B,G,R,A byte order.
#[derive(Debug)]
pub struct LegacyBitmap {
    pub(super) width: u32,
    pub(super) height: u32,
    pub(super) stride: usize,
    pub(super) pixels: Vec<u8>,
    pub(super) lock: Option<(Rect, LockMode)>,
}

impl LegacyBitmap {
    /// Allocate a zeroed (transparent black) bitmap.
    pub fn new(width: u32, height: u32) -> LegacyResult<Self> {
        let stride = (width as usize)
            .checked_mul(CANONICAL_BYTES_PER_PIXEL)
            .and_then(|row| row.checked_next_multiple_of(ROW_ALIGN))
            .ok_or(Status::ValueOverflow)?;
        let len = stride
            .checked_mul(height as usize)
            .ok_or(Status::ValueOverflow)?;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| Status::OutOfMemory)?;
        pixels.resize(len, 0);
        Ok(Self {
            width,
            height,
            stride,
            pixels,
            lock: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Raw rows, `stride` bytes apart, including row padding.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }
}

/// Pixels of a locked rectangle, copied out of the bitmap.
///
/// Writes to `scan0` reach the bitmap when the lock was taken with a
/// writing [`LockMode`] and is released through `unlock_bits`.
#[derive(Debug)]
pub struct BitmapData {
    pub rect: Rect,
    pub mode: LockMode,
    pub stride: usize,
    pub scan0: Vec<u8>,
}

/// Entry points of the legacy engine, resolved once.
///
/// [`LegacyDispatch::builtin`] resolves them to the software engine
/// shipped with this crate. A caller-built table can wrap or replace
/// individual entries.
#[derive(Clone, Copy, Debug)]
pub struct LegacyDispatch {
    /// Import a platform bitmap. The 4th byte of 32-bit pixels is
    /// discarded.
    pub create_bitmap_from_platform: fn(&PlatformBitmap) -> LegacyResult<Box<LegacyBitmap>>,
    pub load_from_path: fn(&Path) -> LegacyResult<Box<LegacyBitmap>>,
    /// Decode from the stream's current position.
    pub load_from_stream: fn(&mut dyn ImageStream) -> LegacyResult<Box<LegacyBitmap>>,
    pub create_bitmap_from_scan0: fn(u32, u32) -> LegacyResult<Box<LegacyBitmap>>,
    pub lock_bits: fn(&mut LegacyBitmap, &Rect, LockMode) -> LegacyResult<BitmapData>,
    pub unlock_bits: fn(&mut LegacyBitmap, BitmapData) -> LegacyResult<()>,
    pub get_width: fn(&LegacyBitmap) -> LegacyResult<u32>,
    pub get_height: fn(&LegacyBitmap) -> LegacyResult<u32>,
    pub dispose_image: fn(Box<LegacyBitmap>) -> LegacyResult<()>,
}

impl LegacyDispatch {
    pub fn builtin() -> Self {
        Self {
            create_bitmap_from_platform: engine::create_bitmap_from_platform,
            load_from_path: engine::load_from_path,
            load_from_stream: engine::load_from_stream,
            create_bitmap_from_scan0: engine::create_bitmap_from_scan0,
            lock_bits: engine::lock_bits,
            unlock_bits: engine::unlock_bits,
            get_width: engine::get_width,
            get_height: engine::get_height,
            dispose_image: engine::dispose_image,
        }
    }
}

impl Default for LegacyDispatch {
    fn default() -> Self {
        Self::builtin()
    }
}
