#![no_main]

use libfuzzer_sys::fuzz_target;

use longship::discord::verify_signature;

fuzz_target!(|data: &[u8]| {
    // Split the input into signature / timestamp / key / body quarters and
    // feed them through verification. The verifier promises to return
    // false for any malformed input rather than panic, so any crash here
    // is a real bug. Most inputs are not valid hex, which is the point:
    // the decode path must be as total as the verify path.
    let quarter = data.len() / 4;
    let signature = String::from_utf8_lossy(&data[..quarter]);
    let timestamp = String::from_utf8_lossy(&data[quarter..quarter * 2]);
    let public_key = String::from_utf8_lossy(&data[quarter * 2..quarter * 3]);
    let body = &data[quarter * 3..];

    let _ = verify_signature(&signature, &timestamp, body, &public_key);
});
