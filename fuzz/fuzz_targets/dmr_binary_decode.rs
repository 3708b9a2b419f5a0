#![no_main]

use hal_dmr::codec;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(node) = codec::decode(data) else {
        return;
    };
    let encoded = codec::encode(&node).expect("decoded trees re-encode");
    let reencoded = codec::decode(&encoded)
        .and_then(|node| codec::encode(&node))
        .expect("re-encoded trees decode");
    assert_eq!(reencoded, encoded);
});
