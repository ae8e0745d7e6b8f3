//! Shared fixtures: hand-built image files and pixel patterns.

#![allow(dead_code)]

use zendraw::{BackendKind, ImageApi};

/// One API per backend, modern first.
pub fn apis() -> [ImageApi; 2] {
    [
        ImageApi::builder().backend(BackendKind::Modern).build(),
        ImageApi::builder().backend(BackendKind::Legacy).build(),
    ]
}

/// Alternating light/dark pixels, `bpp` bytes each.
pub fn checkerboard(w: usize, h: usize, bpp: usize) -> Vec<u8> {
    let mut pixels = vec![0u8; w * h * bpp];
    for y in 0..h {
        for x in 0..w {
            let off = (y * w + x) * bpp;
            let base: u8 = if (x + y) % 2 == 0 { 180 } else { 10 };
            for c in 0..bpp {
                pixels[off + c] = base + c as u8 * 20;
            }
        }
    }
    pixels
}

/// Deterministic xorshift noise.
pub fn noise_pattern(len: usize) -> Vec<u8> {
    let mut state: u32 = 0xDEAD_BEEF;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect()
}

/// Bottom-up 24-bit BMP from top-down B,G,R pixels.
pub fn bmp24(width: u32, height: u32, bgr: &[u8]) -> Vec<u8> {
    let row = width as usize * 3;
    let stride = row.div_ceil(4) * 4;
    let mut bits = Vec::with_capacity(stride * height as usize);
    for y in (0..height as usize).rev() {
        bits.extend_from_slice(&bgr[y * row..][..row]);
        bits.resize(bits.len() + stride - row, 0);
    }
    bmp_file(width as i32, height as i32, 24, &bits)
}

/// Top-down 32-bit `BI_RGB` BMP from B,G,R,X pixels.
pub fn bmp32_top_down(width: u32, height: u32, bgrx: &[u8]) -> Vec<u8> {
    bmp_file(width as i32, -(height as i32), 32, bgrx)
}

fn bmp_file(width: i32, height: i32, bpp: u16, bits: &[u8]) -> Vec<u8> {
    let offset = 14 + 40;
    let mut out = b"BM".to_vec();
    out.extend_from_slice(&((offset + bits.len()) as u32).to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&(offset as u32).to_le_bytes());
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&bpp.to_le_bytes());
    out.extend_from_slice(&[0; 24]);
    out.extend_from_slice(bits);
    out
}

/// Binary PPM (P6), maxval 255.
pub fn ppm(width: u32, height: u32, rgb: &[u8]) -> Vec<u8> {
    let mut out = format!("P6\n{width} {height}\n255\n").into_bytes();
    out.extend_from_slice(rgb);
    out
}

/// PAM (P7) RGB_ALPHA, maxval 255.
pub fn pam_rgba(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "P7\nWIDTH {width}\nHEIGHT {height}\nDEPTH 4\nMAXVAL 255\nTUPLTYPE RGB_ALPHA\nENDHDR\n"
    )
    .into_bytes();
    out.extend_from_slice(rgba);
    out
}

/// Farbfeld from 16-bit R,G,B,A samples.
pub fn farbfeld(width: u32, height: u32, samples: &[u16]) -> Vec<u8> {
    let mut out = b"farbfeld".to_vec();
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_be_bytes());
    }
    out
}

/// Expected canonical bytes for straight R,G,B,A input.
pub fn premultiplied_bgra(rgba: &[u8]) -> Vec<u8> {
    rgba.chunks_exact(4)
        .flat_map(|p| {
            let a = u16::from(p[3]);
            let pm = |c: u8| ((u16::from(c) * a) / 255) as u8;
            [pm(p[2]), pm(p[1]), pm(p[0]), p[3]]
        })
        .collect()
}

/// File under the system temp dir, removed on drop.
pub struct TempFile(pub std::path::PathBuf);

impl TempFile {
    pub fn new(name: &str, contents: &[u8]) -> Self {
        let path = std::env::temp_dir().join(format!(
            "zendraw-{}-{}-{name}",
            std::process::id(),
            std::thread::current().name().unwrap_or("t").replace("::", "-"),
        ));
        std::fs::write(&path, contents).unwrap();
        Self(path)
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}
