#![no_main]

use hal_dispatch::payload::{DecodedResponse, DmrPayloadProcessor, PayloadProcessor};
use hal_dispatch::transport::HttpMethod;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let get = DmrPayloadProcessor.process(HttpMethod::Get, &raw);
    assert!(get.has_defined("outcome"));
    let _ = DecodedResponse::from_envelope(get);
    let _ = DecodedResponse::from_envelope(DmrPayloadProcessor.process(HttpMethod::Post, &raw));
});
