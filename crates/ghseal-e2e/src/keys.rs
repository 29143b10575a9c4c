//! Key pairs standing in for the platform's secret keys
//!
//! The mock API hands out the public half and keeps the secret half so tests
//! can check that stored ciphertexts open with the key they claim to use.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use crypto_box::SecretKey;

/// A public key id plus the matching secret key
pub struct TestKeyPair {
    pub key_id: String,
    secret_key: SecretKey,
}

impl TestKeyPair {
    /// Generate a fresh key pair with the given id
    pub fn generate(key_id: impl Into<String>) -> Self {
        let mut rng = crypto_box::aead::OsRng;
        Self {
            key_id: key_id.into(),
            secret_key: SecretKey::generate(&mut rng),
        }
    }

    /// Base64 public key, as returned by the `public-key` endpoints
    pub fn public_key_b64(&self) -> String {
        BASE64.encode(self.secret_key.public_key().as_bytes())
    }

    /// Open a base64 sealed box. `None` if it was sealed for another key.
    pub fn open(&self, encrypted_value: &str) -> Option<String> {
        let ciphertext = BASE64.decode(encrypted_value).ok()?;
        let plaintext = self.secret_key.unseal(&ciphertext).ok()?;
        String::from_utf8(plaintext).ok()
    }
}

impl std::fmt::Debug for TestKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestKeyPair")
            .field("key_id", &self.key_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghseal::Encrypt;

    #[test]
    fn test_open_sealed_value() {
        let pair = TestKeyPair::generate("key-1");
        let encrypted = Encrypt::new(&pair.public_key_b64())
            .unwrap()
            .encrypt_value("testing")
            .unwrap();
        assert_eq!(pair.open(&encrypted).as_deref(), Some("testing"));
    }

    #[test]
    fn test_open_with_wrong_key() {
        let pair = TestKeyPair::generate("key-1");
        let other = TestKeyPair::generate("key-2");
        let encrypted = Encrypt::new(&other.public_key_b64())
            .unwrap()
            .encrypt_value("testing")
            .unwrap();
        assert!(pair.open(&encrypted).is_none());
    }
}
