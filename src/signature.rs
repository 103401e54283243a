//! HMAC-SHA256 signatures used by the payment provider.
//!
//! Two forms are verified:
//! - checkout callbacks, signed over `"{order_id}|{payment_id}"` with the
//!   API key secret;
//! - webhook deliveries, signed over the raw request body with the webhook
//!   secret.
//!
//! Signatures travel as lowercase hex. Comparison goes through
//! [`Mac::verify_slice`], which is constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Signs `payload` with `secret`, returning lowercase hex.
#[must_use]
pub fn sign(secret: &[u8], payload: &[u8]) -> String {
    // HMAC accepts keys of any length.
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return String::new();
    };
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Returns `true` iff `signature_hex` is the HMAC of `payload` under
/// `secret`. Malformed hex never verifies.
#[must_use]
pub fn verify(secret: &[u8], payload: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// Verifies a checkout callback signature.
#[must_use]
pub fn verify_payment(secret: &str, order_id: &str, payment_id: &str, signature_hex: &str) -> bool {
    let payload = format!("{order_id}|{payment_id}");
    verify(secret.as_bytes(), payload.as_bytes(), signature_hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"whsec_test";
    const BODY: &[u8] = br#"{"event":"payment.captured","payload":{}}"#;

    #[test]
    fn sign_produces_64_hex_chars() {
        let sig = sign(SECRET, BODY);
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn correct_signature_verifies() {
        let sig = sign(SECRET, BODY);
        assert!(verify(SECRET, BODY, &sig));
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2.
        let sig = sign(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn any_single_byte_payload_mutation_fails() {
        let sig = sign(SECRET, BODY);
        for i in 0..BODY.len() {
            let mut mutated = BODY.to_vec();
            if let Some(byte) = mutated.get_mut(i) {
                *byte ^= 0x01;
            }
            assert!(!verify(SECRET, &mutated, &sig), "mutation at {i} verified");
        }
    }

    #[test]
    fn any_single_byte_signature_mutation_fails() {
        let Ok(raw) = hex::decode(sign(SECRET, BODY)) else {
            return;
        };
        for i in 0..raw.len() {
            let mut mutated = raw.clone();
            if let Some(byte) = mutated.get_mut(i) {
                *byte ^= 0x80;
            }
            assert!(!verify(SECRET, BODY, &hex::encode(&mutated)), "mutation at {i} verified");
        }
    }

    #[test]
    fn wrong_secret_and_garbage_fail() {
        let sig = sign(SECRET, BODY);
        assert!(!verify(b"other", BODY, &sig));
        assert!(!verify(SECRET, BODY, "zz-not-hex"));
        assert!(!verify(SECRET, BODY, ""));
        assert!(!verify(SECRET, BODY, sig.get(..62).unwrap_or_default()));
    }

    #[test]
    fn payment_callback_signs_order_and_payment() {
        let sig = sign(b"key_secret", b"order_abc|pay_xyz");
        assert!(verify_payment("key_secret", "order_abc", "pay_xyz", &sig));
        assert!(!verify_payment("key_secret", "order_abc", "pay_xyz2", &sig));
    }
}
