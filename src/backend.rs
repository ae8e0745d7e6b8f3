//! The seam between the acquisition façade and the two drawing engines.

use std::fmt;
use std::path::Path;

use crate::error::ImageError;
use crate::image::Image;
use crate::pixel::AlphaMode;
use crate::platform::PlatformBitmap;
use crate::resource::ImageStream;

/// Which engine backs an [`ImageApi`](crate::ImageApi).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Imaging factory with decoders and lockable bitmaps.
    #[default]
    Modern,
    /// Flat dispatch table of legacy engine entry points.
    Legacy,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Modern => "modern",
            Self::Legacy => "legacy",
        })
    }
}

/// Integer rectangle in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Rectangle at the origin covering `width` x `height`.
    pub const fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Whether the rectangle lies within a `width` x `height` surface.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.x
            .checked_add(self.width)
            .is_some_and(|right| right <= width)
            && self
                .y
                .checked_add(self.height)
                .is_some_and(|bottom| bottom <= height)
    }
}

/// Access requested when locking a bitmap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LockMode {
    Read,
    Write,
    ReadWrite,
}

impl LockMode {
    pub fn reads(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    pub fn writes(self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

/// Writable view of a locked bitmap surface.
#[derive(Debug)]
pub struct SurfaceMut<'a> {
    pub data: &'a mut [u8],
    /// Bytes between the starts of consecutive rows.
    pub stride: usize,
    pub bytes_per_pixel: usize,
}

/// A drawing engine able to produce [`Image`]s in the canonical layout.
///
/// Every method returns a fully built image or an error; intermediates are
/// released before returning in both cases.
pub trait Backend: Send + Sync + fmt::Debug {
    fn kind(&self) -> BackendKind;

    /// Import a platform bitmap, interpreting its 4th byte per `alpha`.
    fn import_platform_bitmap(
        &self,
        bitmap: &PlatformBitmap,
        alpha: AlphaMode,
    ) -> Result<Image, ImageError>;

    /// Decode frame 0 of the file at `path`.
    fn load_from_path(&self, path: &Path) -> Result<Image, ImageError>;

    /// Decode frame 0 of `stream`, starting at its current position.
    fn load_from_stream(&self, stream: &mut dyn ImageStream) -> Result<Image, ImageError>;

    /// Allocate a `width` x `height` canonical bitmap, lock all of it for
    /// writing and hand the surface to `fill`.
    ///
    /// `fill` is not called when allocation or locking fails.
    fn create_bitmap_with(
        &self,
        width: u32,
        height: u32,
        fill: &mut dyn FnMut(SurfaceMut<'_>),
    ) -> Result<Image, ImageError>;
}
