//! Legacy engine backend.
//!
//! Every operation goes through a [`LegacyDispatch`] table resolved once at
//! construction. Bitmaps are always 32-bit premultiplied, so a freshly
//! created bitmap can be filled straight from the converter.

mod dispatch;
mod engine;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

pub use dispatch::{BitmapData, LegacyBitmap, LegacyDispatch, LegacyResult};

use crate::backend::{Backend, BackendKind, LockMode, Rect, SurfaceMut};
use crate::codec;
use crate::convert;
use crate::error::ImageError;
use crate::image::Image;
use crate::limits::Limits;
use crate::pixel::{AlphaMode, CANONICAL_BYTES_PER_PIXEL};
use crate::platform::PlatformBitmap;
use crate::resource::ImageStream;

/// Bytes read ahead of a load to find the image dimensions. Covers BMP
/// headers with a full palette; PNM headers padded with longer comments
/// are only checked after the engine loads them.
const HEADER_LEN: u64 = 4096;

fn read_header(reader: &mut dyn Read) -> Result<Vec<u8>, ImageError> {
    let mut header = Vec::new();
    reader.take(HEADER_LEN).read_to_end(&mut header)?;
    Ok(header)
}

/// Status codes returned by legacy entry points. The numeric values are
/// the legacy engine's own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[repr(i32)]
pub enum Status {
    #[error("generic error")]
    GenericError = 1,
    #[error("invalid parameter")]
    InvalidParameter = 2,
    #[error("out of memory")]
    OutOfMemory = 3,
    #[error("object busy")]
    ObjectBusy = 4,
    #[error("insufficient buffer")]
    InsufficientBuffer = 5,
    #[error("not implemented")]
    NotImplemented = 6,
    #[error("system error")]
    Win32Error = 7,
    #[error("wrong state")]
    WrongState = 8,
    #[error("aborted")]
    Aborted = 9,
    #[error("file not found")]
    FileNotFound = 10,
    #[error("value overflow")]
    ValueOverflow = 11,
    #[error("access denied")]
    AccessDenied = 12,
    #[error("unknown image format")]
    UnknownImageFormat = 13,
}

impl Status {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// `None` for `0` (success) and unknown codes.
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            1 => Self::GenericError,
            2 => Self::InvalidParameter,
            3 => Self::OutOfMemory,
            4 => Self::ObjectBusy,
            5 => Self::InsufficientBuffer,
            6 => Self::NotImplemented,
            7 => Self::Win32Error,
            8 => Self::WrongState,
            9 => Self::Aborted,
            10 => Self::FileNotFound,
            11 => Self::ValueOverflow,
            12 => Self::AccessDenied,
            13 => Self::UnknownImageFormat,
            _ => return None,
        })
    }
}

fn legacy_error(op: &'static str) -> impl FnOnce(Status) -> ImageError {
    move |status| ImageError::Legacy { op, status }
}

/// Backend driving the legacy engine through its dispatch table.
#[derive(Debug)]
pub struct LegacyBackend {
    table: LegacyDispatch,
    limits: Limits,
}

impl LegacyBackend {
    pub fn new(table: LegacyDispatch, limits: Limits) -> Self {
        Self { table, limits }
    }

    pub fn builtin() -> Self {
        Self::new(LegacyDispatch::builtin(), Limits::default())
    }

    pub fn dispatch(&self) -> &LegacyDispatch {
        &self.table
    }

    /// Check limits against the dimensions in a file header, before the
    /// engine allocates anything. Headers that don't probe are left to the
    /// engine.
    fn screen_header(&self, header: &[u8]) -> Result<(), ImageError> {
        match codec::probe(header) {
            Ok(info) => {
                self.limits
                    .check_allocation(info.width, info.height, CANONICAL_BYTES_PER_PIXEL)?;
            }
            Err(err) => log::trace!("legacy header screen skipped: {err}"),
        }
        Ok(())
    }

    /// Take ownership of a bitmap the engine handed out, enforcing limits
    /// on its final size.
    fn adopt(&self, bitmap: Box<LegacyBitmap>) -> Result<Image, ImageError> {
        let image = LegacyImage::new(bitmap, self.table);
        let (width, height) = image.try_size()?;
        self.limits
            .check_allocation(width, height, CANONICAL_BYTES_PER_PIXEL)?;
        Ok(Image::Legacy(image))
    }
}

impl Default for LegacyBackend {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Backend for LegacyBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Legacy
    }

    fn import_platform_bitmap(
        &self,
        bitmap: &PlatformBitmap,
        alpha: AlphaMode,
    ) -> Result<Image, ImageError> {
        self.limits.check_allocation(
            bitmap.width(),
            bitmap.height(),
            CANONICAL_BYTES_PER_PIXEL,
        )?;
        if alpha == AlphaMode::Ignore {
            let imported = (self.table.create_bitmap_from_platform)(bitmap)
                .map_err(legacy_error("create_bitmap_from_platform"))?;
            return self.adopt(imported);
        }

        // The engine's own import drops alpha; extract it through the
        // converter instead.
        let layout = bitmap.raw_layout(alpha);
        self.create_bitmap_with(bitmap.width(), bitmap.height(), &mut |surface| {
            convert::raw_to_canonical(
                bitmap.width(),
                bitmap.height(),
                surface.data,
                surface.stride,
                surface.bytes_per_pixel,
                bitmap.bits(),
                bitmap.stride(),
                &layout,
            );
        })
    }

    fn load_from_path(&self, path: &Path) -> Result<Image, ImageError> {
        // An unreadable file is left to the engine so it reports its own status.
        if let Ok(mut file) = File::open(path) {
            self.screen_header(&read_header(&mut file)?)?;
        }
        let loaded = (self.table.load_from_path)(path).map_err(legacy_error("load_from_path"))?;
        self.adopt(loaded)
    }

    fn load_from_stream(&self, stream: &mut dyn ImageStream) -> Result<Image, ImageError> {
        let start = stream.stream_position()?;
        let header = read_header(stream)?;
        stream.seek(SeekFrom::Start(start))?;
        self.screen_header(&header)?;
        let loaded =
            (self.table.load_from_stream)(stream).map_err(legacy_error("load_from_stream"))?;
        self.adopt(loaded)
    }

    fn create_bitmap_with(
        &self,
        width: u32,
        height: u32,
        fill: &mut dyn FnMut(SurfaceMut<'_>),
    ) -> Result<Image, ImageError> {
        self.limits
            .check_allocation(width, height, CANONICAL_BYTES_PER_PIXEL)?;
        let bitmap = (self.table.create_bitmap_from_scan0)(width, height)
            .map_err(legacy_error("create_bitmap_from_scan0"))?;
        let mut image = LegacyImage::new(bitmap, self.table);
        {
            let mut lock = image.lock(Rect::full(width, height), LockMode::Write)?;
            fill(lock.surface()?);
        }
        Ok(Image::Legacy(image))
    }
}

/// Image owned by the legacy engine. Disposed through the dispatch table
/// on drop.
#[derive(Debug)]
pub struct LegacyImage {
    bitmap: Option<Box<LegacyBitmap>>,
    table: LegacyDispatch,
}

impl LegacyImage {
    pub(crate) fn new(bitmap: Box<LegacyBitmap>, table: LegacyDispatch) -> Self {
        Self {
            bitmap: Some(bitmap),
            table,
        }
    }

    fn try_size(&self) -> Result<(u32, u32), ImageError> {
        let Some(bitmap) = self.bitmap.as_deref() else {
            return Ok((0, 0));
        };
        let width = (self.table.get_width)(bitmap).map_err(legacy_error("get_width"))?;
        let height = (self.table.get_height)(bitmap).map_err(legacy_error("get_height"))?;
        Ok((width, height))
    }

    /// Dimensions as reported by the engine. An engine failure is logged
    /// and reported as 0.
    pub fn size(&self) -> (u32, u32) {
        let Some(bitmap) = self.bitmap.as_deref() else {
            return (0, 0);
        };
        let width = (self.table.get_width)(bitmap).unwrap_or_else(|status| {
            log::warn!("get_width: {status}");
            0
        });
        let height = (self.table.get_height)(bitmap).unwrap_or_else(|status| {
            log::warn!("get_height: {status}");
            0
        });
        (width, height)
    }

    /// Lock `rect` of the bitmap. The lock is released when the guard
    /// drops.
    pub fn lock(&mut self, rect: Rect, mode: LockMode) -> Result<LegacyLock<'_>, ImageError> {
        let table = self.table;
        let bitmap = self
            .bitmap
            .as_deref_mut()
            .ok_or(ImageError::Lock { op: "lock_bits" })?;
        let data = (table.lock_bits)(bitmap, &rect, mode).map_err(|status| {
            log::warn!("lock_bits: {status}");
            ImageError::Lock { op: "lock_bits" }
        })?;
        log::debug!(
            "legacy bitmap locked: {}x{} at ({}, {}) {mode:?}",
            rect.width,
            rect.height,
            rect.x,
            rect.y
        );
        Ok(LegacyLock {
            table,
            bitmap,
            data: Some(data),
        })
    }

    /// Canonical pixels, tightly packed, read through a read lock.
    pub fn copy_pixels(&mut self) -> Result<Vec<u8>, ImageError> {
        let (width, height) = self.try_size()?;
        let lock = self.lock(Rect::full(width, height), LockMode::Read)?;
        Ok(lock.data().to_vec())
    }

    fn release(&mut self) {
        if let Some(bitmap) = self.bitmap.take()
            && let Err(status) = (self.table.dispose_image)(bitmap)
        {
            log::warn!("dispose_image: {status}");
        }
    }
}

impl Drop for LegacyImage {
    fn drop(&mut self) {
        self.release();
    }
}

/// A locked rectangle of a [`LegacyImage`].
#[derive(Debug)]
pub struct LegacyLock<'a> {
    table: LegacyDispatch,
    bitmap: &'a mut LegacyBitmap,
    data: Option<BitmapData>,
}

impl LegacyLock<'_> {
    /// Writable view of the locked pixels. Fails for read-only locks.
    pub fn surface(&mut self) -> Result<SurfaceMut<'_>, ImageError> {
        match self.data.as_mut() {
            Some(data) if data.mode.writes() => Ok(SurfaceMut {
                data: &mut data.scan0,
                stride: data.stride,
                bytes_per_pixel: CANONICAL_BYTES_PER_PIXEL,
            }),
            _ => Err(ImageError::Lock { op: "lock_bits" }),
        }
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref().map_or(&[], |d| d.scan0.as_slice())
    }

    pub fn stride(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.stride)
    }

    fn unlock(&mut self, data: BitmapData) {
        let rect = data.rect;
        match (self.table.unlock_bits)(self.bitmap, data) {
            Ok(()) => log::debug!("legacy bitmap unlocked: {}x{}", rect.width, rect.height),
            Err(status) => log::warn!("unlock_bits: {status}"),
        }
    }
}

impl Drop for LegacyLock<'_> {
    fn drop(&mut self) {
        if let Some(data) = self.data.take() {
            self.unlock(data);
        }
    }
}
