use crate::error::ImageError;

/// Resource limits for decoding and bitmap allocation.
///
/// All fields default to `None` (no limit). A limit hit while acquiring an
/// image is reported as an allocation failure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    /// Maximum pixel count (width * height).
    pub max_pixels: Option<u64>,
    /// Maximum bytes for any single pixel buffer allocation.
    pub max_memory_bytes: Option<u64>,
}

impl Limits {
    /// Check dimensions against limits.
    pub(crate) fn check(&self, width: u32, height: u32) -> Result<(), ImageError> {
        if let Some(max_w) = self.max_width
            && u64::from(width) > max_w
        {
            return Err(ImageError::LimitExceeded(format!(
                "width {width} exceeds limit {max_w}"
            )));
        }
        if let Some(max_h) = self.max_height
            && u64::from(height) > max_h
        {
            return Err(ImageError::LimitExceeded(format!(
                "height {height} exceeds limit {max_h}"
            )));
        }
        if let Some(max_px) = self.max_pixels {
            let pixels = u64::from(width) * u64::from(height);
            if pixels > max_px {
                return Err(ImageError::LimitExceeded(format!(
                    "pixel count {pixels} exceeds limit {max_px}"
                )));
            }
        }
        Ok(())
    }

    /// Check that an allocation size is within memory limits.
    pub(crate) fn check_memory(&self, bytes: usize) -> Result<(), ImageError> {
        if let Some(max_mem) = self.max_memory_bytes
            && bytes as u64 > max_mem
        {
            return Err(ImageError::LimitExceeded(format!(
                "allocation {bytes} bytes exceeds memory limit {max_mem}"
            )));
        }
        Ok(())
    }

    /// Dimension check followed by the memory check for a buffer of
    /// `width * height * bytes_per_pixel` bytes.
    pub(crate) fn check_allocation(
        &self,
        width: u32,
        height: u32,
        bytes_per_pixel: usize,
    ) -> Result<usize, ImageError> {
        self.check(width, height)?;
        let bytes = (width as usize)
            .checked_mul(height as usize)
            .and_then(|wh| wh.checked_mul(bytes_per_pixel))
            .ok_or(ImageError::DimensionsTooLarge { width, height })?;
        self.check_memory(bytes)?;
        Ok(bytes)
    }
}
