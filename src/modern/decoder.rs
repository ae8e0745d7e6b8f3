use std::fmt;
use std::sync::Arc;

use enough::Unstoppable;

use super::bitmap::{BitmapSource, required_len};
use crate::codec::{self, ImageFormat, ImageInfo};
use crate::decode::DecodeOutput;
use crate::error::ImageError;
use crate::limits::Limits;
use crate::pixel::PixelLayout;

/// An opened image container.
pub trait Decoder: fmt::Debug {
    fn frame_count(&self) -> u32;

    /// Decode frame `index`. The frame may borrow from the decoder.
    fn frame(&self, index: u32) -> Result<Box<dyn BitmapSource + '_>, ImageError>;
}

/// A container format the imaging factory can open.
pub trait Codec: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Whether `header` (the first bytes of a file) belongs to this codec.
    fn matches(&self, header: &[u8]) -> bool;

    /// Open a whole file. `limits` apply to every frame.
    fn open(&self, data: Vec<u8>, limits: &Limits) -> Result<Box<dyn Decoder>, ImageError>;
}

/// Ordered set of codecs, searched first to last.
#[derive(Clone, Debug)]
pub struct CodecRegistry {
    codecs: Vec<Arc<dyn Codec>>,
}

impl CodecRegistry {
    /// Registry with the BMP, PNM and farbfeld codecs.
    pub fn new() -> Self {
        Self {
            codecs: [ImageFormat::Bmp, ImageFormat::Pnm, ImageFormat::Farbfeld]
                .into_iter()
                .map(|format| Arc::new(NativeCodec { format }) as Arc<dyn Codec>)
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self { codecs: Vec::new() }
    }

    /// Add a codec, consulted before the ones already registered.
    pub fn register(&mut self, codec: Arc<dyn Codec>) -> &mut Self {
        self.codecs.insert(0, codec);
        self
    }

    pub fn find(&self, header: &[u8]) -> Option<&Arc<dyn Codec>> {
        self.codecs.iter().find(|c| c.matches(header))
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Codec backed by the crate's own decoders.
#[derive(Debug)]
struct NativeCodec {
    format: ImageFormat,
}

impl Codec for NativeCodec {
    fn name(&self) -> &str {
        match self.format {
            ImageFormat::Bmp => "bmp",
            ImageFormat::Pnm => "pnm",
            ImageFormat::Farbfeld => "farbfeld",
        }
    }

    fn matches(&self, header: &[u8]) -> bool {
        ImageFormat::detect(header) == Some(self.format)
    }

    fn open(&self, data: Vec<u8>, limits: &Limits) -> Result<Box<dyn Decoder>, ImageError> {
        let info = codec::probe(&data)?;
        limits.check_allocation(info.width, info.height, info.native_layout.bytes_per_pixel())?;
        Ok(Box::new(NativeDecoder {
            data,
            info,
            limits: limits.clone(),
        }))
    }
}

/// Decoder holding the whole file; pixels are decoded when the frame is
/// requested.
#[derive(Debug)]
struct NativeDecoder {
    data: Vec<u8>,
    info: ImageInfo,
    limits: Limits,
}

impl Decoder for NativeDecoder {
    fn frame_count(&self) -> u32 {
        1
    }

    fn frame(&self, index: u32) -> Result<Box<dyn BitmapSource + '_>, ImageError> {
        if index >= self.frame_count() {
            return Err(ImageError::FrameOutOfRange {
                index,
                count: self.frame_count(),
            });
        }
        let output = codec::decode_with_limits(&self.data, Some(&self.limits), &Unstoppable)?;
        log::trace!(
            "{:?} frame {index}: {}x{} {:?}{}",
            self.info.format,
            output.width,
            output.height,
            output.layout,
            if output.is_borrowed() { " (borrowed)" } else { "" }
        );
        Ok(Box::new(DecodedFrame { output }))
    }
}

#[derive(Debug)]
struct DecodedFrame<'a> {
    output: DecodeOutput<'a>,
}

impl BitmapSource for DecodedFrame<'_> {
    fn size(&self) -> (u32, u32) {
        (self.output.width, self.output.height)
    }

    fn pixel_layout(&self) -> PixelLayout {
        self.output.layout
    }

    fn copy_pixels(&self, dst: &mut [u8], stride: usize) -> Result<(), ImageError> {
        let (width, height) = self.size();
        let needed = required_len(width, height, self.output.layout, stride)
            .ok_or(ImageError::DimensionsTooLarge { width, height })?;
        if dst.len() < needed {
            return Err(ImageError::BufferTooSmall {
                needed,
                actual: dst.len(),
            });
        }
        let row = self.output.stride();
        if row == 0 {
            return Ok(());
        }
        for (y, src) in self.output.pixels().chunks_exact(row).enumerate() {
            dst[y * stride..][..row].copy_from_slice(src);
        }
        Ok(())
    }
}
