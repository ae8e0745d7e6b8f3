#[cfg(feature = "rgb")]
use rgb::AsPixels as _;

use crate::backend::BackendKind;
use crate::error::ImageError;
use crate::legacy::LegacyImage;
use crate::modern::ModernImage;

/// A loaded image in the canonical premultiplied BGRA layout, owned by the
/// backend that produced it.
///
/// Dropping the image releases it the way its backend requires;
/// [`Image::destroy`] does the same explicitly.
#[derive(Debug)]
pub enum Image {
    Modern(ModernImage),
    Legacy(LegacyImage),
}

impl Image {
    pub fn backend(&self) -> BackendKind {
        match self {
            Self::Modern(_) => BackendKind::Modern,
            Self::Legacy(_) => BackendKind::Legacy,
        }
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        match self {
            Self::Modern(image) => image.size(),
            Self::Legacy(image) => image.size(),
        }
    }

    pub fn width(&self) -> u32 {
        self.size().0
    }

    pub fn height(&self) -> u32 {
        self.size().1
    }

    /// Canonical B,G,R,A bytes, top-down, `width * 4` bytes per row.
    ///
    /// Takes `&mut self` because legacy images are read through a lock.
    pub fn copy_pixels(&mut self) -> Result<Vec<u8>, ImageError> {
        match self {
            Self::Modern(image) => image.copy_pixels(),
            Self::Legacy(image) => image.copy_pixels(),
        }
    }

    /// Release the image.
    pub fn destroy(self) {
        log::trace!("destroying {} image", self.backend());
        drop(self);
    }

    /// Canonical pixels as typed premultiplied BGRA values.
    #[cfg(feature = "rgb")]
    pub fn to_pixels(&mut self) -> Result<Vec<rgb::alt::BGRA<u8>>, ImageError> {
        let bytes = self.copy_pixels()?;
        let pixels: &[rgb::alt::BGRA<u8>] = bytes.as_pixels();
        Ok(pixels.to_vec())
    }

    /// Canonical pixels as an [`imgref::ImgVec`].
    #[cfg(feature = "imgref")]
    pub fn to_imgvec(&mut self) -> Result<imgref::ImgVec<rgb::alt::BGRA<u8>>, ImageError> {
        let (width, height) = self.size();
        Ok(imgref::ImgVec::new(
            self.to_pixels()?,
            width as usize,
            height as usize,
        ))
    }
}

impl From<ModernImage> for Image {
    fn from(image: ModernImage) -> Self {
        Self::Modern(image)
    }
}

impl From<LegacyImage> for Image {
    fn from(image: LegacyImage) -> Self {
        Self::Legacy(image)
    }
}
