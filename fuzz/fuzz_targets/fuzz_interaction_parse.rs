#![no_main]

use libfuzzer_sys::fuzz_target;

use longship::discord::{interpret, Interaction};

fuzz_target!(|data: &[u8]| {
    // Interaction payloads arrive from the network after signature
    // verification, but a compromised or buggy platform must still not be
    // able to panic the parser. Interpretation of any payload that
    // deserializes must also be total: unknown actions normalize, they do
    // not crash.
    let Ok(interaction) = serde_json::from_slice::<Interaction>(data) else {
        return;
    };
    let _ = interpret(&interaction);
});
