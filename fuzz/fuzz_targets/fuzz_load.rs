#![no_main]
use libfuzzer_sys::fuzz_target;
use zendraw::{BackendKind, ImageApi, Limits, MemStream};

fuzz_target!(|data: &[u8]| {
    let limits = Limits {
        max_pixels: Some(1 << 22),
        ..Default::default()
    };
    let mut results = Vec::new();
    for kind in [BackendKind::Modern, BackendKind::Legacy] {
        let api = ImageApi::builder()
            .backend(kind)
            .with_limits(limits.clone())
            .build();
        let mut stream = MemStream::new(data);
        results.push(
            api.load_from_stream(&mut stream)
                .ok()
                .and_then(|mut image| image.copy_pixels().ok().map(|px| (image.size(), px))),
        );
    }
    // Both engines decode the same bytes to the same canonical pixels.
    assert_eq!(results[0], results[1], "backends disagree");
});
