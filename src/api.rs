//! Image acquisition façade.
//!
//! [`ImageApi`] turns platform bitmaps, files, streams, embedded resources
//! and raw pixel buffers into [`Image`]s in the canonical premultiplied
//! BGRA layout. The backend is picked once, when the API is built.

use std::path::Path;
use std::sync::Arc;

use crate::backend::{Backend, BackendKind};
use crate::convert;
use crate::error::ImageError;
use crate::image::Image;
use crate::legacy::{LegacyBackend, LegacyDispatch};
use crate::limits::Limits;
use crate::modern::{Codec, CodecRegistry, ImagingFactory, ModernBackend};
use crate::pixel::{AlphaMode, Color, PixelFormat};
use crate::platform::PlatformBitmap;
use crate::resource::{ImageStream, MemStream, ResourceId, ResourceModule};

fn logged<T>(op: &str, result: Result<T, ImageError>) -> Result<T, ImageError> {
    result.inspect_err(|err| log::warn!("{op}: {err}"))
}

/// Entry point for acquiring images.
///
/// Cheap to clone; clones share the backend.
#[derive(Clone, Debug)]
pub struct ImageApi {
    backend: Arc<dyn Backend>,
}

impl Default for ImageApi {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ImageApi {
    /// Wrap an already constructed backend.
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn builder() -> ImageApiBuilder {
        ImageApiBuilder::default()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Import a platform bitmap, treating it as opaque.
    pub fn create_from_platform_bitmap(&self, bitmap: &PlatformBitmap) -> Result<Image, ImageError> {
        self.create_from_platform_bitmap_with_alpha(bitmap, AlphaMode::Ignore)
    }

    /// Import a platform bitmap. For 32-bit bitmaps `alpha` decides whether
    /// the 4th byte is padding, straight alpha or premultiplied alpha.
    pub fn create_from_platform_bitmap_with_alpha(
        &self,
        bitmap: &PlatformBitmap,
        alpha: AlphaMode,
    ) -> Result<Image, ImageError> {
        logged(
            "create_from_platform_bitmap",
            self.backend.import_platform_bitmap(bitmap, alpha),
        )
    }

    /// Decode the first frame of the file at `path`.
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> Result<Image, ImageError> {
        let path = path.as_ref();
        logged("load_from_file", self.backend.load_from_path(path)).inspect_err(|_| {
            log::debug!("load_from_file: path was {}", path.display());
        })
    }

    /// Decode the first frame of `stream`, from its current position.
    pub fn load_from_stream(&self, stream: &mut dyn ImageStream) -> Result<Image, ImageError> {
        logged("load_from_stream", self.backend.load_from_stream(stream))
    }

    /// Decode the first frame of an embedded resource.
    pub fn load_from_resource(
        &self,
        module: &dyn ResourceModule,
        res_type: impl Into<ResourceId>,
        name: impl Into<ResourceId>,
    ) -> Result<Image, ImageError> {
        let res_type = res_type.into();
        let name = name.into();
        let result = MemStream::from_resource(module, &res_type, &name)
            .and_then(|mut stream| self.backend.load_from_stream(&mut stream));
        logged("load_from_resource", result)
    }

    /// Build an image from caller-owned pixels.
    ///
    /// `stride` is the distance in bytes between source rows; `0` means
    /// `width * format.bytes_per_pixel()`. `palette` is required for
    /// [`PixelFormat::Palette`] and ignored otherwise. Palette indices are
    /// not range-checked; an index outside `palette` panics.
    pub fn create_from_buffer(
        &self,
        width: u32,
        height: u32,
        stride: usize,
        buffer: &[u8],
        format: PixelFormat,
        palette: Option<&[Color]>,
    ) -> Result<Image, ImageError> {
        logged(
            "create_from_buffer",
            self.create_from_buffer_inner(width, height, stride, buffer, format, palette),
        )
    }

    fn create_from_buffer_inner(
        &self,
        width: u32,
        height: u32,
        stride: usize,
        buffer: &[u8],
        format: PixelFormat,
        palette: Option<&[Color]>,
    ) -> Result<Image, ImageError> {
        let palette = match (format, palette) {
            (PixelFormat::Palette, None) => return Err(ImageError::MissingPalette),
            (_, palette) => palette.unwrap_or_default(),
        };
        let bpp = format.bytes_per_pixel();
        let row = (width as usize)
            .checked_mul(bpp)
            .ok_or(ImageError::DimensionsTooLarge { width, height })?;
        let stride = if stride == 0 { row } else { stride };
        let needed = if width == 0 || height == 0 {
            0
        } else {
            stride
                .checked_mul(height as usize - 1)
                .and_then(|n| n.checked_add(row))
                .ok_or(ImageError::DimensionsTooLarge { width, height })?
        };
        if buffer.len() < needed {
            return Err(ImageError::BufferTooSmall {
                needed,
                actual: buffer.len(),
            });
        }

        let raw = format.raw_layout();
        self.backend
            .create_bitmap_with(width, height, &mut |surface| match &raw {
                Some(layout) => convert::raw_to_canonical(
                    width,
                    height,
                    surface.data,
                    surface.stride,
                    surface.bytes_per_pixel,
                    buffer,
                    stride,
                    layout,
                ),
                None => convert::palette_to_canonical(
                    width,
                    height,
                    surface.data,
                    surface.stride,
                    surface.bytes_per_pixel,
                    buffer,
                    stride,
                    palette,
                ),
            })
    }
}

/// Configures and builds an [`ImageApi`].
///
/// ```
/// use zendraw::{BackendKind, ImageApi, Limits};
///
/// let api = ImageApi::builder()
///     .backend(BackendKind::Legacy)
///     .with_limits(Limits {
///         max_pixels: Some(16_000_000),
///         ..Default::default()
///     })
///     .build();
/// assert_eq!(api.backend_kind(), BackendKind::Legacy);
/// ```
#[derive(Clone, Debug)]
pub struct ImageApiBuilder {
    kind: BackendKind,
    limits: Limits,
    legacy_dispatch: Option<LegacyDispatch>,
    codecs: Vec<Arc<dyn Codec>>,
    imaging: bool,
}

impl Default for ImageApiBuilder {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            limits: Limits::default(),
            legacy_dispatch: None,
            codecs: Vec::new(),
            imaging: true,
        }
    }
}

impl ImageApiBuilder {
    pub fn backend(mut self, kind: BackendKind) -> Self {
        self.kind = kind;
        self
    }

    /// Limits enforced on decoding and bitmap allocation.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Use `table` instead of the built-in legacy engine. Implies
    /// [`BackendKind::Legacy`].
    pub fn with_legacy_dispatch(mut self, table: LegacyDispatch) -> Self {
        self.kind = BackendKind::Legacy;
        self.legacy_dispatch = Some(table);
        self
    }

    /// Register an extra codec with the imaging factory. Later codecs are
    /// tried first.
    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codecs.push(codec);
        self
    }

    /// Build the modern backend without an imaging factory, so every
    /// acquisition fails with [`ImageError::ImagingUnavailable`].
    pub fn without_imaging(mut self) -> Self {
        self.imaging = false;
        self
    }

    pub fn build(self) -> ImageApi {
        let backend: Arc<dyn Backend> = match self.kind {
            BackendKind::Modern if !self.imaging => {
                log::warn!("imaging factory unavailable; image loading is disabled");
                Arc::new(ModernBackend::unavailable())
            }
            BackendKind::Modern => {
                let mut registry = CodecRegistry::new();
                for codec in self.codecs {
                    registry.register(codec);
                }
                Arc::new(ModernBackend::new(ImagingFactory::new(
                    registry,
                    self.limits,
                )))
            }
            BackendKind::Legacy => Arc::new(LegacyBackend::new(
                self.legacy_dispatch.unwrap_or_default(),
                self.limits,
            )),
        };
        log::debug!("image API using the {} backend", backend.kind());
        ImageApi::new(backend)
    }
}
