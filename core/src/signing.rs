//! Canonical JSON + HMAC-SHA256 signing, shared verbatim by both processes
//! so signature verification cannot drift (spec §6 "Signing", §9
//! "Canonical JSON signing").
//!
//! Canonical payload = JSON of the value with the `signature` field
//! removed, object keys recursively sorted, compact separators, UTF-8.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Recursively sort object keys and drop a top-level `signature` field.
/// Arrays are left in order — spec §9 explicitly calls out that
/// reordering arrays breaks the contract, so we never touch them.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: Vec<(&String, &Value)> = map.iter().collect();
            sorted.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k.clone(), canonicalize(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Build the canonical payload bytes for `value`, with any top-level
/// `signature` key removed first.
pub fn canonical_payload(value: &Value) -> Vec<u8> {
    let mut stripped = value.clone();
    if let Value::Object(map) = &mut stripped {
        map.remove("signature");
    }
    let canon = canonicalize(&stripped);
    // serde_json's default Serializer already uses compact separators.
    serde_json::to_vec(&canon).expect("canonical value is always serializable")
}

/// Lowercase hex HMAC-SHA256 over the canonical payload.
pub fn sign(secret: &str, value: &Value) -> String {
    let payload = canonical_payload(value);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(&payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time verification of a lowercase-hex signature, per spec §4.H
/// step 2 ("constant-time compare on hex strings").
pub fn verify(secret: &str, value: &Value, signature_hex: &str) -> bool {
    let expected = sign(secret, value);
    if expected.len() != signature_hex.len() {
        return false;
    }
    expected.as_bytes().ct_eq(signature_hex.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn signing_is_stable_under_key_reordering() {
        let a = json!({"b": 1, "a": 2, "c": {"z": 1, "y": 2}});
        let b = json!({"a": 2, "c": {"y": 2, "z": 1}, "b": 1});
        assert_eq!(sign("secret", &a), sign("secret", &b));
    }

    #[test]
    fn signature_field_is_excluded_from_the_payload() {
        let a = json!({"a": 1, "signature": "deadbeef"});
        let b = json!({"a": 1});
        assert_eq!(sign("secret", &a), sign("secret", &b));
    }

    #[test]
    fn array_order_is_preserved_and_changes_the_signature() {
        let a = json!({"legs": [1, 2, 3]});
        let b = json!({"legs": [3, 2, 1]});
        assert_ne!(sign("secret", &a), sign("secret", &b));
    }

    #[test]
    fn verify_roundtrips() {
        let v = json!({"x": 1, "y": "z"});
        let sig = sign("topsecret", &v);
        assert!(verify("topsecret", &v, &sig));
        assert!(!verify("wrongsecret", &v, &sig));
    }

    #[test]
    fn verify_rejects_truncated_signature() {
        let v = json!({"x": 1});
        let sig = sign("s", &v);
        assert!(!verify("s", &v, &sig[..sig.len() - 2]));
    }
}
