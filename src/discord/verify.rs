//! Interaction signature verification.
//!
//! Discord signs every webhook delivery with the application's Ed25519 key:
//! the detached signature covers the `X-Signature-Timestamp` header value
//! concatenated with the raw request body. This is the single security
//! boundary of the gateway, so verification runs against the exact bytes
//! received, before any JSON parsing.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

/// Verify a detached Ed25519 signature over `timestamp || body`.
///
/// Returns `false` for any malformed input: bad hex, wrong key or signature
/// length, or a signature that does not verify. A decode failure is treated
/// exactly like an invalid signature, and this function never panics.
pub fn verify_signature(
    signature_hex: &str,
    timestamp: &str,
    body: &[u8],
    public_key_hex: &str,
) -> bool {
    let Some(key_bytes) = decode_exact::<32>(public_key_hex) else {
        return false;
    };
    let Some(sig_bytes) = decode_exact::<64>(signature_hex) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let signature = Signature::from_bytes(&sig_bytes);

    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);

    key.verify(&message, &signature).is_ok()
}

/// Decode a hex string into a fixed-size byte array, or `None` if the input
/// is not valid hex of exactly `N` bytes.
fn decode_exact<const N: usize>(input: &str) -> Option<[u8; N]> {
    let bytes = hex::decode(input).ok()?;
    bytes.try_into().ok()
}
