#![no_main]
use libfuzzer_sys::fuzz_target;
use zendraw::{Color, ImageApi, PixelFormat};

const FORMATS: [PixelFormat; 5] = [
    PixelFormat::Palette,
    PixelFormat::R8G8B8,
    PixelFormat::R8G8B8A8,
    PixelFormat::B8G8R8A8,
    PixelFormat::B8G8R8A8Premultiplied,
];

fuzz_target!(|data: &[u8]| {
    let [w, h, pad, fmt, rest @ ..] = data else {
        return;
    };
    let (width, height) = (u32::from(w % 32), u32::from(h % 32));
    let format = FORMATS[usize::from(*fmt) % FORMATS.len()];
    let stride = if *pad == 0 {
        0
    } else {
        width as usize * format.bytes_per_pixel() + usize::from(pad % 8)
    };
    // A full palette keeps every index in range.
    let palette: Vec<Color> = (0..=255u8).map(|i| Color::new(i, !i, i / 2)).collect();

    let api = ImageApi::default();
    let Ok(mut image) = api.create_from_buffer(width, height, stride, rest, format, Some(&palette))
    else {
        return;
    };
    assert_eq!(image.size(), (width, height));
    let pixels = image.copy_pixels().expect("readback failed");
    // Premultiplied output never has a color channel above alpha, except
    // for premultiplied input which is copied through.
    if format != PixelFormat::B8G8R8A8Premultiplied {
        for px in pixels.chunks_exact(4) {
            assert!(px[0] <= px[3] && px[1] <= px[3] && px[2] <= px[3]);
        }
    }
});
