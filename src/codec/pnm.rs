//! Binary PNM: P5 (PGM), P6 (PPM), P7 (PAM).
//!
//! 8-bit files with maxval 255 decode zero-copy. Other maxvals and 16-bit
//! samples are rescaled to 8 bits; gray+alpha PAM is expanded to RGBA.

use enough::Stop;

use super::{ImageFormat, ImageInfo, check_limits};
use crate::convert::narrow_u16;
use crate::decode::DecodeOutput;
use crate::error::ImageError;
use crate::limits::Limits;
use crate::pixel::PixelLayout;

struct PnmHeader {
    width: u32,
    height: u32,
    maxval: u32,
    depth: u32,
    data_offset: usize,
}

impl PnmHeader {
    fn layout(&self) -> PixelLayout {
        match self.depth {
            1 => PixelLayout::Gray8,
            3 => PixelLayout::Rgb8,
            _ => PixelLayout::Rgba8,
        }
    }
}

/// Whitespace/comment-aware token reader for P5/P6 headers.
struct Tokens<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Tokens<'a> {
    fn skip_space(&mut self) {
        while let Some(&b) = self.data.get(self.pos) {
            if b == b'#' {
                while self.data.get(self.pos).is_some_and(|&c| c != b'\n') {
                    self.pos += 1;
                }
            } else if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn number(&mut self, what: &str) -> Result<u32, ImageError> {
        self.skip_space();
        let start = self.pos;
        while self.data.get(self.pos).is_some_and(u8::is_ascii_digit) {
            self.pos += 1;
        }
        if start == self.pos {
            return if self.pos >= self.data.len() {
                Err(ImageError::UnexpectedEof)
            } else {
                Err(ImageError::InvalidHeader(format!("expected {what}")))
            };
        }
        std::str::from_utf8(&self.data[start..self.pos])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ImageError::InvalidHeader(format!("{what} out of range")))
    }
}

fn parse_header(data: &[u8]) -> Result<PnmHeader, ImageError> {
    let header = match data.get(..2) {
        Some(b"P5") => parse_pnm(data, 1)?,
        Some(b"P6") => parse_pnm(data, 3)?,
        Some(b"P7") => parse_pam(data)?,
        _ => return Err(ImageError::UnrecognizedFormat),
    };
    if header.width == 0 || header.height == 0 {
        return Err(ImageError::InvalidHeader(format!(
            "PNM dimensions {}x{}",
            header.width,
            header.height
        )));
    }
    if !(1..=65535).contains(&header.maxval) {
        return Err(ImageError::InvalidHeader(format!(
            "PNM maxval {} out of range",
            header.maxval
        )));
    }
    if !(1..=4).contains(&header.depth) {
        return Err(ImageError::UnsupportedVariant(format!(
            "PAM depth {}",
            header.depth
        )));
    }
    Ok(header)
}

fn parse_pnm(data: &[u8], depth: u32) -> Result<PnmHeader, ImageError> {
    let mut tokens = Tokens { data, pos: 2 };
    let width = tokens.number("width")?;
    let height = tokens.number("height")?;
    let maxval = tokens.number("maxval")?;
    // Exactly one whitespace byte separates the header from the samples.
    match data.get(tokens.pos) {
        Some(b) if b.is_ascii_whitespace() => {}
        Some(_) => return Err(ImageError::InvalidHeader("missing whitespace after maxval".into())),
        None => return Err(ImageError::UnexpectedEof),
    }
    Ok(PnmHeader {
        width,
        height,
        maxval,
        depth,
        data_offset: tokens.pos + 1,
    })
}

fn parse_pam(data: &[u8]) -> Result<PnmHeader, ImageError> {
    let mut width = None;
    let mut height = None;
    let mut depth = None;
    let mut maxval = None;
    let mut pos = 2;

    loop {
        let rest = data.get(pos..).ok_or(ImageError::UnexpectedEof)?;
        let line_len = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or(ImageError::UnexpectedEof)?;
        let line = std::str::from_utf8(&rest[..line_len])
            .map_err(|_| ImageError::InvalidHeader("PAM header is not ASCII".into()))?
            .trim();
        pos += line_len + 1;

        let mut words = line.split_ascii_whitespace();
        let Some(key) = words.next() else { continue };
        let mut value = |name: &str| -> Result<u32, ImageError> {
            words
                .next()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| ImageError::InvalidHeader(format!("bad PAM {name}")))
        };
        match key {
            "ENDHDR" => break,
            "WIDTH" => width = Some(value("WIDTH")?),
            "HEIGHT" => height = Some(value("HEIGHT")?),
            "DEPTH" => depth = Some(value("DEPTH")?),
            "MAXVAL" => maxval = Some(value("MAXVAL")?),
            // TUPLTYPE is implied by DEPTH; comments and unknown keys skipped.
            _ => {}
        }
    }

    let missing = |name: &str| ImageError::InvalidHeader(format!("PAM header lacks {name}"));
    Ok(PnmHeader {
        width: width.ok_or_else(|| missing("WIDTH"))?,
        height: height.ok_or_else(|| missing("HEIGHT"))?,
        depth: depth.ok_or_else(|| missing("DEPTH"))?,
        maxval: maxval.ok_or_else(|| missing("MAXVAL"))?,
        data_offset: pos,
    })
}

pub(crate) fn probe(data: &[u8]) -> Result<ImageInfo, ImageError> {
    let header = parse_header(data)?;
    Ok(ImageInfo {
        width: header.width,
        height: header.height,
        format: ImageFormat::Pnm,
        native_layout: header.layout(),
    })
}

pub(crate) fn decode<'a>(
    data: &'a [u8],
    limits: Option<&Limits>,
    stop: &dyn Stop,
) -> Result<DecodeOutput<'a>, ImageError> {
    let header = parse_header(data)?;
    let layout = header.layout();
    check_limits(limits, header.width, header.height, layout)?;
    stop.check()?;

    let w = header.width as usize;
    let h = header.height as usize;
    let depth = header.depth as usize;
    let sample_bytes = if header.maxval > 255 { 2 } else { 1 };
    let too_large = || ImageError::DimensionsTooLarge {
        width: header.width,
        height: header.height,
    };
    let row_bytes = w
        .checked_mul(depth)
        .and_then(|wd| wd.checked_mul(sample_bytes))
        .ok_or_else(too_large)?;
    let expected = row_bytes.checked_mul(h).ok_or_else(too_large)?;
    let samples = data
        .get(header.data_offset..)
        .and_then(|d| d.get(..expected))
        .ok_or(ImageError::UnexpectedEof)?;

    // Zero-copy: 8-bit, maxval 255, and a depth that maps 1:1 onto a layout.
    if sample_bytes == 1 && header.maxval == 255 && depth != 2 {
        return Ok(DecodeOutput::borrowed(
            samples,
            header.width,
            header.height,
            layout,
            ImageFormat::Pnm,
        ));
    }

    let maxval = header.maxval;
    let scale = |v: u32| -> u8 {
        match maxval {
            255 => v as u8,
            65535 => narrow_u16(v as u16),
            _ => ((v.min(maxval) * 255 + maxval / 2) / maxval) as u8,
        }
    };

    let out_bpp = layout.bytes_per_pixel();
    let mut out = Vec::with_capacity(w * h * out_bpp);
    for (row_idx, row) in samples.chunks_exact(row_bytes).enumerate() {
        if row_idx % 16 == 0 {
            stop.check()?;
        }
        for px in row.chunks_exact(depth * sample_bytes) {
            let mut values = [0u8; 4];
            for (i, v) in values.iter_mut().take(depth).enumerate() {
                let raw = if sample_bytes == 2 {
                    u32::from(u16::from_be_bytes([px[i * 2], px[i * 2 + 1]]))
                } else {
                    u32::from(px[i])
                };
                *v = scale(raw);
            }
            match depth {
                2 => out.extend_from_slice(&[values[0], values[0], values[0], values[1]]),
                _ => out.extend_from_slice(&values[..depth]),
            }
        }
    }

    Ok(DecodeOutput::owned(
        out,
        header.width,
        header.height,
        layout,
        ImageFormat::Pnm,
    ))
}
