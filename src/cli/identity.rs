use crate::identity::{derive_identity, SecretKey, DIGEST_BITS};
use crate::provenance::collision_probability;
use crate::tensor::Shape;

/// Describe the public identity derived from a key
/// The key itself is never echoed, only its length
pub fn show_identity(key: &SecretKey, shape: Shape) -> String {
    let identity = derive_identity(key, shape);

    let mut output = String::new();
    output.push_str("CryptoNoise Identity\n");
    output.push_str("====================\n\n");
    output.push_str(&format!("Key length: {} chars\n", identity.key_length));
    if key.is_placeholder() {
        output.push_str("Warning: default or empty key, set your own unique key\n");
    }
    output.push_str(&format!("Fingerprint: {}\n", identity.fingerprint()));
    output.push_str(&format!("Signature: {}\n", identity.signature()));
    output.push_str(&format!("Crypto seed: {}\n", identity.seed));
    output.push_str(&format!(
        "Collision probability: {}\n",
        collision_probability(DIGEST_BITS)
    ));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::PLACEHOLDER_KEY;

    fn shape() -> Shape {
        Shape::new(1, 4, 64, 64).unwrap()
    }

    #[test]
    fn test_show_identity() {
        let out = show_identity(&SecretKey::from("alice"), shape());
        assert!(out.contains("Signature: CN-2bd806c97f0e00af"));
        assert!(out.contains("Crypto seed: 2131624111"));
        assert!(out.contains("Key length: 5 chars"));
        assert!(!out.contains("alice"));
        assert!(!out.contains("Warning"));
    }

    #[test]
    fn test_show_identity_warns_on_placeholder() {
        let out = show_identity(&SecretKey::from(PLACEHOLDER_KEY), shape());
        assert!(out.contains("Warning"));
    }
}
