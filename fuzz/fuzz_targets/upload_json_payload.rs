#![no_main]

use hal_dispatch::payload::{DecodedResponse, PayloadProcessor, UploadPayloadProcessor};
use hal_dispatch::transport::HttpMethod;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let envelope = UploadPayloadProcessor.process(HttpMethod::Post, &raw);
    assert!(envelope.has_defined("outcome"));
    let _ = DecodedResponse::from_envelope(envelope);
});
