//! Modern imaging backend.
//!
//! An [`ImagingFactory`] opens decoders, imports platform bitmaps and
//! converts any [`BitmapSource`] into a canonical premultiplied BGRA
//! [`Bitmap`]. Finished images share that bitmap through an [`Arc`].

mod bitmap;
mod decoder;

use std::path::Path;
use std::sync::Arc;

pub use bitmap::{Bitmap, BitmapLock, BitmapSource};
pub use decoder::{Codec, CodecRegistry, Decoder};

use crate::backend::{Backend, BackendKind, LockMode, Rect, SurfaceMut};
use crate::convert;
use crate::error::ImageError;
use crate::image::Image;
use crate::limits::Limits;
use crate::pixel::{AlphaMode, PixelLayout};
use crate::platform::PlatformBitmap;
use crate::resource::{ImageStream, read_remaining};

/// Creates decoders and bitmaps.
#[derive(Clone, Debug, Default)]
pub struct ImagingFactory {
    registry: CodecRegistry,
    limits: Limits,
}

impl ImagingFactory {
    pub fn new(registry: CodecRegistry, limits: Limits) -> Self {
        Self { registry, limits }
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Zeroed bitmap of the given layout, within limits.
    pub fn create_bitmap(
        &self,
        width: u32,
        height: u32,
        layout: PixelLayout,
    ) -> Result<Bitmap, ImageError> {
        self.limits
            .check_allocation(width, height, layout.bytes_per_pixel())?;
        Bitmap::new(width, height, layout)
    }

    /// Copy a platform bitmap into a factory bitmap, top-down, keeping its
    /// pixel layout. `alpha` decides whether the 4th byte is alpha.
    pub fn create_bitmap_from_platform(
        &self,
        source: &PlatformBitmap,
        alpha: AlphaMode,
    ) -> Result<Bitmap, ImageError> {
        let (width, height) = (source.width(), source.height());
        let mut bitmap = self.create_bitmap(width, height, source.pixel_layout(alpha))?;
        {
            let mut lock = bitmap.lock(Rect::full(width, height), LockMode::Write)?;
            let surface = lock.surface()?;
            source.copy_rows_top_down(surface.data, surface.stride);
        }
        Ok(bitmap)
    }

    pub fn create_decoder_from_path(&self, path: &Path) -> Result<Box<dyn Decoder>, ImageError> {
        let data = std::fs::read(path)?;
        self.create_decoder(data)
    }

    /// Open a decoder on `stream` from its current position to its end.
    pub fn create_decoder_from_stream(
        &self,
        stream: &mut dyn ImageStream,
    ) -> Result<Box<dyn Decoder>, ImageError> {
        let data = read_remaining(stream)?;
        self.create_decoder(data)
    }

    /// Open a decoder on a complete file held in memory.
    pub fn create_decoder(&self, data: Vec<u8>) -> Result<Box<dyn Decoder>, ImageError> {
        let codec = self
            .registry
            .find(&data)
            .ok_or(ImageError::UnrecognizedFormat)?;
        log::trace!("opening {} bytes with codec {}", data.len(), codec.name());
        codec.open(data, &self.limits)
    }

    /// Convert any source into a new canonical [`PixelLayout::Pbgra8`]
    /// bitmap.
    pub fn convert_to_canonical(&self, source: &dyn BitmapSource) -> Result<Bitmap, ImageError> {
        let (width, height) = source.size();
        let layout = source.pixel_layout();
        let mut bitmap = self.create_bitmap(width, height, PixelLayout::Pbgra8)?;
        if layout == PixelLayout::Pbgra8 {
            let stride = bitmap.stride();
            let mut lock = bitmap.lock(Rect::full(width, height), LockMode::Write)?;
            source.copy_pixels(lock.surface()?.data, stride)?;
            drop(lock);
            return Ok(bitmap);
        }

        let src_stride = width as usize * layout.bytes_per_pixel();
        let mut staging = vec![0u8; src_stride * height as usize];
        source.copy_pixels(&mut staging, src_stride)?;
        {
            let mut lock = bitmap.lock(Rect::full(width, height), LockMode::Write)?;
            let surface = lock.surface()?;
            convert::layout_to_canonical(
                width,
                height,
                surface.data,
                surface.stride,
                surface.bytes_per_pixel,
                &staging,
                src_stride,
                layout,
            );
        }
        Ok(bitmap)
    }
}

/// Backend over an [`ImagingFactory`]. Without a factory every acquisition
/// fails with [`ImageError::ImagingUnavailable`].
#[derive(Debug)]
pub struct ModernBackend {
    factory: Option<ImagingFactory>,
}

impl ModernBackend {
    pub fn new(factory: ImagingFactory) -> Self {
        Self {
            factory: Some(factory),
        }
    }

    /// Backend whose factory could not be created.
    pub fn unavailable() -> Self {
        Self { factory: None }
    }

    pub fn factory(&self) -> Result<&ImagingFactory, ImageError> {
        self.factory.as_ref().ok_or(ImageError::ImagingUnavailable)
    }

    fn load(&self, decoder: Box<dyn Decoder>) -> Result<Image, ImageError> {
        let factory = self.factory()?;
        let frame = decoder.frame(0)?;
        let bitmap = factory.convert_to_canonical(frame.as_ref())?;
        Ok(Image::Modern(ModernImage::new(bitmap)))
    }
}

impl Default for ModernBackend {
    fn default() -> Self {
        Self::new(ImagingFactory::default())
    }
}

impl Backend for ModernBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Modern
    }

    fn import_platform_bitmap(
        &self,
        bitmap: &PlatformBitmap,
        alpha: AlphaMode,
    ) -> Result<Image, ImageError> {
        let factory = self.factory()?;
        let imported = factory.create_bitmap_from_platform(bitmap, alpha)?;
        let canonical = factory.convert_to_canonical(&imported)?;
        Ok(Image::Modern(ModernImage::new(canonical)))
    }

    fn load_from_path(&self, path: &Path) -> Result<Image, ImageError> {
        let decoder = self.factory()?.create_decoder_from_path(path)?;
        self.load(decoder)
    }

    fn load_from_stream(&self, stream: &mut dyn ImageStream) -> Result<Image, ImageError> {
        let decoder = self.factory()?.create_decoder_from_stream(stream)?;
        self.load(decoder)
    }

    fn create_bitmap_with(
        &self,
        width: u32,
        height: u32,
        fill: &mut dyn FnMut(SurfaceMut<'_>),
    ) -> Result<Image, ImageError> {
        let mut bitmap = self
            .factory()?
            .create_bitmap(width, height, PixelLayout::Pbgra8)?;
        {
            let mut lock = bitmap.lock(Rect::full(width, height), LockMode::Write)?;
            fill(lock.surface()?);
        }
        Ok(Image::Modern(ModernImage::new(bitmap)))
    }
}

/// Image backed by a shared, immutable canonical [`Bitmap`].
#[derive(Clone, Debug)]
pub struct ModernImage {
    bitmap: Arc<Bitmap>,
}

impl ModernImage {
    pub(crate) fn new(bitmap: Bitmap) -> Self {
        Self {
            bitmap: Arc::new(bitmap),
        }
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn size(&self) -> (u32, u32) {
        self.bitmap.size()
    }

    /// Live references to the underlying bitmap.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.bitmap)
    }

    /// Canonical pixels, tightly packed.
    pub fn copy_pixels(&self) -> Result<Vec<u8>, ImageError> {
        let (width, height) = self.size();
        let stride = width as usize * self.bitmap.layout().bytes_per_pixel();
        let mut out = vec![0u8; stride * height as usize];
        self.bitmap.copy_pixels(&mut out, stride)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_import_keeps_layout_until_converted() {
        let factory = ImagingFactory::default();
        let platform =
            PlatformBitmap::new(1, 2, 32, false, vec![1, 2, 3, 4, 200, 100, 50, 128]).unwrap();

        let imported = factory
            .create_bitmap_from_platform(&platform, AlphaMode::Use)
            .unwrap();
        assert_eq!(imported.layout(), PixelLayout::Bgra8);
        let mut raw = [0u8; 8];
        imported.copy_pixels(&mut raw, 4).unwrap();
        assert_eq!(raw, [200, 100, 50, 128, 1, 2, 3, 4]);

        let canonical = factory.convert_to_canonical(&imported).unwrap();
        assert_eq!(canonical.layout(), PixelLayout::Pbgra8);
        let mut out = [0u8; 8];
        canonical.copy_pixels(&mut out, 4).unwrap();
        assert_eq!(out, [100, 50, 25, 128, 0, 0, 0, 4]);
    }

    #[test]
    fn unavailable_factory_fails_everything() {
        let backend = ModernBackend::unavailable();
        let mut called = false;
        assert!(matches!(
            backend.create_bitmap_with(1, 1, &mut |_| called = true),
            Err(ImageError::ImagingUnavailable)
        ));
        assert!(!called);
        let platform = PlatformBitmap::new(1, 1, 24, false, vec![0; 4]).unwrap();
        assert!(matches!(
            backend.import_platform_bitmap(&platform, AlphaMode::Ignore),
            Err(ImageError::ImagingUnavailable)
        ));
    }

    #[test]
    fn unknown_bytes_have_no_decoder() {
        let factory = ImagingFactory::default();
        assert!(matches!(
            factory.create_decoder(b"\x89PNG\r\n".to_vec()),
            Err(ImageError::UnrecognizedFormat)
        ));
    }

    #[test]
    fn clones_share_the_bitmap() {
        let image = ModernImage::new(Bitmap::new(1, 1, PixelLayout::Pbgra8).unwrap());
        assert_eq!(image.ref_count(), 1);
        let other = image.clone();
        assert_eq!(image.ref_count(), 2);
        drop(other);
        assert_eq!(image.ref_count(), 1);
    }
}
