//! Software implementation of the legacy entry points.

use std::io;
use std::path::Path;

use enough::Unstoppable;

use super::Status;
use super::dispatch::{BitmapData, LegacyBitmap, LegacyResult};
use crate::backend::{LockMode, Rect};
use crate::codec;
use crate::convert;
use crate::error::ImageError;
use crate::pixel::{AlphaMode, CANONICAL_BYTES_PER_PIXEL};
use crate::platform::PlatformBitmap;
use crate::resource::{ImageStream, read_remaining};

pub(super) fn create_bitmap_from_platform(src: &PlatformBitmap) -> LegacyResult<Box<LegacyBitmap>> {
    let mut bitmap = LegacyBitmap::new(src.width(), src.height())?;
    convert::raw_to_canonical(
        src.width(),
        src.height(),
        &mut bitmap.pixels,
        bitmap.stride,
        CANONICAL_BYTES_PER_PIXEL,
        src.bits(),
        src.stride(),
        &src.raw_layout(AlphaMode::Ignore),
    );
    Ok(Box::new(bitmap))
}

pub(super) fn load_from_path(path: &Path) -> LegacyResult<Box<LegacyBitmap>> {
    let data = std::fs::read(path).map_err(|e| {
        log::debug!("legacy engine: reading {} failed: {e}", path.display());
        io_status(&e)
    })?;
    decode_bytes(&data)
}

pub(super) fn load_from_stream(stream: &mut dyn ImageStream) -> LegacyResult<Box<LegacyBitmap>> {
    let data = read_remaining(stream).map_err(|e| {
        log::debug!("legacy engine: reading stream failed: {e}");
        io_status(&e)
    })?;
    decode_bytes(&data)
}

pub(super) fn create_bitmap_from_scan0(width: u32, height: u32) -> LegacyResult<Box<LegacyBitmap>> {
    LegacyBitmap::new(width, height).map(Box::new)
}

pub(super) fn lock_bits(
    bitmap: &mut LegacyBitmap,
    rect: &Rect,
    mode: LockMode,
) -> LegacyResult<BitmapData> {
    if bitmap.lock.is_some() {
        return Err(Status::WrongState);
    }
    if !rect.fits(bitmap.width, bitmap.height) {
        return Err(Status::InvalidParameter);
    }
    let row_bytes = rect.width as usize * CANONICAL_BYTES_PER_PIXEL;
    let len = row_bytes
        .checked_mul(rect.height as usize)
        .ok_or(Status::ValueOverflow)?;
    let mut scan0 = Vec::new();
    scan0.try_reserve_exact(len).map_err(|_| Status::OutOfMemory)?;
    scan0.resize(len, 0);

    if mode.reads() && row_bytes > 0 {
        let x0 = rect.x as usize * CANONICAL_BYTES_PER_PIXEL;
        for (y, dst) in scan0.chunks_exact_mut(row_bytes).enumerate() {
            let start = (rect.y as usize + y) * bitmap.stride + x0;
            dst.copy_from_slice(&bitmap.pixels[start..][..row_bytes]);
        }
    }

    bitmap.lock = Some((*rect, mode));
    Ok(BitmapData {
        rect: *rect,
        mode,
        stride: row_bytes,
        scan0,
    })
}

pub(super) fn unlock_bits(bitmap: &mut LegacyBitmap, data: BitmapData) -> LegacyResult<()> {
    match bitmap.lock {
        Some((rect, mode)) if rect == data.rect && mode == data.mode => {}
        _ => return Err(Status::WrongState),
    }
    bitmap.lock = None;

    if data.mode.writes() && data.stride > 0 {
        let rect = data.rect;
        let row_bytes = rect.width as usize * CANONICAL_BYTES_PER_PIXEL;
        let x0 = rect.x as usize * CANONICAL_BYTES_PER_PIXEL;
        for (y, src) in data
            .scan0
            .chunks_exact(data.stride)
            .take(rect.height as usize)
            .enumerate()
        {
            let start = (rect.y as usize + y) * bitmap.stride + x0;
            bitmap.pixels[start..][..row_bytes].copy_from_slice(&src[..row_bytes]);
        }
    }
    Ok(())
}

pub(super) fn get_width(bitmap: &LegacyBitmap) -> LegacyResult<u32> {
    Ok(bitmap.width)
}

pub(super) fn get_height(bitmap: &LegacyBitmap) -> LegacyResult<u32> {
    Ok(bitmap.height)
}

pub(super) fn dispose_image(bitmap: Box<LegacyBitmap>) -> LegacyResult<()> {
    if bitmap.is_locked() {
        log::warn!("legacy engine: disposing a bitmap that is still locked");
    }
    drop(bitmap);
    Ok(())
}

fn decode_bytes(data: &[u8]) -> LegacyResult<Box<LegacyBitmap>> {
    let decoded = codec::decode(data, Unstoppable).map_err(|e| {
        log::debug!("legacy engine: decode failed: {e}");
        decode_status(&e)
    })?;
    let mut bitmap = LegacyBitmap::new(decoded.width, decoded.height)?;
    convert::layout_to_canonical(
        decoded.width,
        decoded.height,
        &mut bitmap.pixels,
        bitmap.stride,
        CANONICAL_BYTES_PER_PIXEL,
        decoded.pixels(),
        decoded.stride(),
        decoded.layout,
    );
    Ok(Box::new(bitmap))
}

fn io_status(e: &io::Error) -> Status {
    match e.kind() {
        io::ErrorKind::NotFound => Status::FileNotFound,
        io::ErrorKind::PermissionDenied => Status::AccessDenied,
        io::ErrorKind::OutOfMemory => Status::OutOfMemory,
        _ => Status::Win32Error,
    }
}

fn decode_status(e: &ImageError) -> Status {
    match e {
        ImageError::UnrecognizedFormat | ImageError::UnsupportedVariant(_) => {
            Status::UnknownImageFormat
        }
        ImageError::DimensionsTooLarge { .. } => Status::ValueOverflow,
        ImageError::Cancelled(_) => Status::Aborted,
        _ => Status::GenericError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(width: u32, height: u32) -> LegacyBitmap {
        let mut bmp = LegacyBitmap::new(width, height).unwrap();
        for (i, b) in bmp.pixels.iter_mut().enumerate() {
            *b = i as u8;
        }
        bmp
    }

    #[test]
    fn read_lock_copies_rect_out() {
        let mut bmp = filled(4, 2);
        let rect = Rect {
            x: 1,
            y: 1,
            width: 2,
            height: 1,
        };
        let data = lock_bits(&mut bmp, &rect, LockMode::Read).unwrap();
        assert_eq!(data.stride, 8);
        assert_eq!(data.scan0, (20u8..28).collect::<Vec<_>>());
        assert!(bmp.is_locked());
        unlock_bits(&mut bmp, data).unwrap();
        assert!(!bmp.is_locked());
    }

    #[test]
    fn write_lock_copies_back_on_unlock() {
        let mut bmp = LegacyBitmap::new(2, 2).unwrap();
        let mut data = lock_bits(&mut bmp, &Rect::full(2, 2), LockMode::Write).unwrap();
        assert!(data.scan0.iter().all(|&b| b == 0));
        data.scan0.fill(7);
        assert!(bmp.pixels.iter().all(|&b| b == 0));
        unlock_bits(&mut bmp, data).unwrap();
        assert!(bmp.pixels[..8].iter().all(|&b| b == 7));
        // Row padding is untouched.
        assert!(bmp.pixels[8..16].iter().all(|&b| b == 0));
    }

    #[test]
    fn read_lock_never_writes_back() {
        let mut bmp = filled(1, 1);
        let before = bmp.pixels.clone();
        let mut data = lock_bits(&mut bmp, &Rect::full(1, 1), LockMode::Read).unwrap();
        data.scan0.fill(0xee);
        unlock_bits(&mut bmp, data).unwrap();
        assert_eq!(bmp.pixels, before);
    }

    #[test]
    fn double_lock_is_wrong_state() {
        let mut bmp = LegacyBitmap::new(1, 1).unwrap();
        let data = lock_bits(&mut bmp, &Rect::full(1, 1), LockMode::Read).unwrap();
        assert_eq!(
            lock_bits(&mut bmp, &Rect::full(1, 1), LockMode::Read).unwrap_err(),
            Status::WrongState
        );
        unlock_bits(&mut bmp, data).unwrap();
    }

    #[test]
    fn out_of_bounds_rect_is_invalid() {
        let mut bmp = LegacyBitmap::new(2, 2).unwrap();
        assert_eq!(
            lock_bits(&mut bmp, &Rect::full(3, 1), LockMode::Read).unwrap_err(),
            Status::InvalidParameter
        );
        assert!(!bmp.is_locked());
    }

    #[test]
    fn unlock_without_lock_is_wrong_state() {
        let mut bmp = LegacyBitmap::new(1, 1).unwrap();
        let stray = BitmapData {
            rect: Rect::full(1, 1),
            mode: LockMode::Write,
            stride: 4,
            scan0: vec![0; 4],
        };
        assert_eq!(unlock_bits(&mut bmp, stray).unwrap_err(), Status::WrongState);
    }

    #[test]
    fn platform_import_discards_alpha() {
        let src = PlatformBitmap::new(1, 1, 32, true, vec![200, 100, 50, 128]).unwrap();
        let bmp = create_bitmap_from_platform(&src).unwrap();
        assert_eq!(&bmp.pixels()[..4], &[200, 100, 50, 255]);
    }

    #[test]
    fn missing_file_maps_to_file_not_found() {
        let path = std::env::temp_dir().join("zendraw-legacy-engine-no-such-file.bmp");
        assert_eq!(load_from_path(&path).unwrap_err(), Status::FileNotFound);
    }

    #[test]
    fn garbage_maps_to_unknown_format() {
        let mut stream = std::io::Cursor::new(b"not an image".to_vec());
        assert_eq!(
            load_from_stream(&mut stream).unwrap_err(),
            Status::UnknownImageFormat
        );
    }
}
