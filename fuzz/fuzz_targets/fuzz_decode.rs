#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Probe and decode must never panic, and must agree on dimensions.
    let probed = zendraw::codec::probe(data);
    let Ok(decoded) = zendraw::codec::decode(data, enough::Unstoppable) else {
        return;
    };
    let info = probed.expect("decodable data failed to probe");
    assert_eq!((info.width, info.height), (decoded.width, decoded.height));
    assert_eq!(info.native_layout, decoded.layout);
    assert_eq!(
        decoded.pixels().len(),
        decoded.stride() * decoded.height as usize
    );
});
