//! # zendraw
//!
//! Image acquisition for a 2D drawing layer with two interchangeable
//! engines.
//!
//! Every image, whatever its source, ends up in one canonical layout:
//! 4 bytes per pixel, B,G,R,A byte order, premultiplied alpha. Sources are
//! platform bitmaps (DIBs), image files, seekable streams, embedded
//! resources and raw pixel buffers in a handful of [`PixelFormat`]s.
//!
//! ## Backends
//!
//! - **Modern**: an [`ImagingFactory`](modern::ImagingFactory) opens
//!   decoders from a [`CodecRegistry`](modern::CodecRegistry) and converts
//!   frames to canonical bitmaps. Images share their bitmap through an
//!   `Arc`.
//! - **Legacy**: a [`LegacyDispatch`](legacy::LegacyDispatch) table of
//!   engine entry points, resolved once. Images are disposed through the
//!   table.
//!
//! The backend is chosen when the [`ImageApi`] is built and never changes.
//!
//! ## Formats
//!
//! Both engines decode BMP (palette, 16/24/32-bit, bitfields), binary PNM
//! (P5, P6, P7) and farbfeld. [`codec::probe`] reads dimensions without
//! decoding; [`codec::decode`] exposes the decoders directly.
//!
//! ## Usage
//!
//! ```
//! use zendraw::{ImageApi, PixelFormat};
//!
//! let api = ImageApi::default();
//!
//! // 1x1 straight-alpha BGRA, premultiplied on the way in.
//! let mut image = api.create_from_buffer(1, 1, 0, &[200, 100, 50, 128], PixelFormat::B8G8R8A8, None)?;
//! assert_eq!(image.size(), (1, 1));
//! assert_eq!(image.copy_pixels()?, [100, 50, 25, 128]);
//! image.destroy();
//! # Ok::<(), zendraw::ImageError>(())
//! ```

#![forbid(unsafe_code)]

mod api;
mod backend;
pub mod codec;
pub mod convert;
mod decode;
mod error;
mod image;
pub mod legacy;
mod limits;
pub mod modern;
mod pixel;
mod platform;
mod resource;

// Re-exports
pub use api::{ImageApi, ImageApiBuilder};
pub use backend::{Backend, BackendKind, LockMode, Rect, SurfaceMut};
pub use codec::{ImageFormat, ImageInfo};
pub use decode::DecodeOutput;
pub use enough::{Stop, Unstoppable};
pub use error::{ErrorKind, ImageError};
pub use image::Image;
pub use limits::Limits;
pub use pixel::{AlphaMode, CANONICAL_BYTES_PER_PIXEL, Color, PixelFormat, PixelLayout};
pub use platform::PlatformBitmap;
pub use resource::{ImageStream, MemStream, ResourceId, ResourceModule, ResourceTable};
