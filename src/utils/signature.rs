use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Check a hex-encoded HMAC-SHA256 signature over `payload`.
///
/// Comparison happens inside `verify_slice`, which is constant-time.
/// A malformed hex signature is simply invalid, not an error: the
/// caller branches on the boolean and rejects.
pub fn verify_signature(payload: &[u8], signature_hex: &str, secret: &str) -> bool {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);

    match hex::decode(signature_hex.trim()) {
        Ok(sig) => mac.verify_slice(&sig).is_ok(),
        Err(_) => false,
    }
}

/// The client confirmation path signs `orderId|paymentId`, not a
/// serialized body.
pub fn client_confirmation_payload(order_id: &str, payment_id: &str) -> String {
    format!("{}|{}", order_id, payment_id)
}

/// Hex HMAC-SHA256 of `payload`. Used by tests and local tooling to
/// produce valid signatures.
pub fn sign(payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}
