#![no_main]
use libfuzzer_sys::fuzz_target;
use valuepack::decode;

fuzz_target!(|data: &[u8]| {
    let _ = decode(data);
});
