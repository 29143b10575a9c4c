//! libsodium-compatible sealed boxes (X25519 + XSalsa20-Poly1305)
//!
//! GitHub decrypts secret values server-side with the private half of the
//! scope's public key, so the output here must be a standard `crypto_box_seal`
//! ciphertext, base64 encoded.

use std::fmt::Display;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use crypto_box::PublicKey;

use crate::error::SealError;

/// Size of an X25519 public key in bytes
pub const PUBLIC_KEY_LEN: usize = 32;

/// Validate a required string argument.
///
/// `None` stands for a value that was never supplied. Anything else is
/// rendered with `Display`, trimmed, and rejected if nothing is left.
pub fn require_string_argument<V: Display>(
    name: &str,
    value: Option<V>,
) -> Result<String, SealError> {
    let value = value.ok_or_else(|| SealError::missing(name))?;

    let trimmed = value.to_string().trim().to_string();
    if trimmed.is_empty() {
        return Err(SealError::empty(name));
    }

    Ok(trimmed)
}

/// Seals values against a single base64-encoded public key
#[derive(Clone)]
pub struct Encrypt {
    public_key: PublicKey,
}

impl Encrypt {
    /// Create an encrypter for a base64-encoded X25519 public key
    pub fn new(public_key: &str) -> Result<Self, SealError> {
        let encoded = require_string_argument("publicKey", Some(public_key))?;

        let key_bytes = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| SealError::InvalidBase64(e.to_string()))?;

        let key_array: [u8; PUBLIC_KEY_LEN] = key_bytes
            .as_slice()
            .try_into()
            .map_err(|_| SealError::InvalidKeyLength(key_bytes.len()))?;

        Ok(Self {
            public_key: PublicKey::from(key_array),
        })
    }

    /// Seal a value and return the base64 ciphertext.
    ///
    /// A fresh ephemeral key is generated for every call, so sealing the same
    /// value twice yields different ciphertexts.
    pub fn encrypt_value<V: Display>(&self, value: V) -> Result<String, SealError> {
        self.encrypt_optional(Some(value))
    }

    /// Seal a value that may not have been supplied
    pub fn encrypt_optional<V: Display>(&self, value: Option<V>) -> Result<String, SealError> {
        let plaintext = require_string_argument("value", value)?;

        let mut rng = crypto_box::aead::OsRng;
        let ciphertext = self
            .public_key
            .seal(&mut rng, plaintext.as_bytes())
            .map_err(|_| SealError::Seal)?;

        tracing::trace!(bytes = ciphertext.len(), "Sealed secret value");

        Ok(BASE64.encode(ciphertext))
    }
}

impl std::fmt::Debug for Encrypt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encrypt")
            .field("public_key", &BASE64.encode(self.public_key.as_bytes()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_box::SecretKey;

    const PUBLIC_KEY: &str = "S953BUzsjznd35oVNTJvlg4iesXZuAL6PS4NB+2EXB0=";

    fn test_keypair() -> (String, SecretKey) {
        let mut rng = crypto_box::aead::OsRng;
        let secret_key = SecretKey::generate(&mut rng);
        let public_key = BASE64.encode(secret_key.public_key().as_bytes());
        (public_key, secret_key)
    }

    #[test]
    fn test_encrypt_hello() {
        let encrypt = Encrypt::new(PUBLIC_KEY).unwrap();
        let encrypted = encrypt.encrypt_value("hello").unwrap();
        assert!(!encrypted.is_empty());
    }

    #[test]
    fn test_encrypt_hello_world() {
        let encrypt = Encrypt::new(PUBLIC_KEY).unwrap();
        let encrypted = encrypt.encrypt_value("hello world").unwrap();
        assert!(!encrypted.is_empty());
    }

    #[test]
    fn test_encrypt_number() {
        let encrypt = Encrypt::new(PUBLIC_KEY).unwrap();
        let encrypted = encrypt.encrypt_value(123456789).unwrap();
        assert!(!encrypted.is_empty());
        assert!(BASE64.decode(&encrypted).is_ok());
    }

    #[test]
    fn test_encrypt_missing_value() {
        let encrypt = Encrypt::new(PUBLIC_KEY).unwrap();
        let err = encrypt.encrypt_optional(None::<&str>).unwrap_err();
        assert!(err.to_string().contains("Need to provide a value"));
        assert!(err.to_string().contains("value"));
    }

    #[test]
    fn test_encrypt_empty_string() {
        let encrypt = Encrypt::new(PUBLIC_KEY).unwrap();
        let err = encrypt.encrypt_value("").unwrap_err();
        assert!(err.to_string().contains("was zero length or empty string"));

        let err = encrypt.encrypt_value("   \n").unwrap_err();
        assert_eq!(err, SealError::empty("value"));
    }

    #[test]
    fn test_empty_public_key_rejected() {
        let err = Encrypt::new("  ").unwrap_err();
        assert_eq!(err, SealError::empty("publicKey"));
    }

    #[test]
    fn test_invalid_public_key_rejected() {
        assert!(matches!(
            Encrypt::new("not-valid-base64!!!"),
            Err(SealError::InvalidBase64(_))
        ));

        let short_key = BASE64.encode(b"too-short");
        assert_eq!(
            Encrypt::new(&short_key).unwrap_err(),
            SealError::InvalidKeyLength(9)
        );
    }

    #[test]
    fn test_sealed_value_opens_with_matching_key() {
        let (public_key, secret_key) = test_keypair();
        let encrypt = Encrypt::new(&public_key).unwrap();

        let encrypted = encrypt.encrypt_value("  super-secret-value-42\n").unwrap();
        let ciphertext = BASE64.decode(&encrypted).unwrap();
        let opened = secret_key.unseal(&ciphertext).unwrap();

        // The trimmed value is what gets sealed
        assert_eq!(opened, b"super-secret-value-42");
    }

    #[test]
    fn test_ciphertexts_differ_per_call() {
        let (public_key, _) = test_keypair();
        let encrypt = Encrypt::new(&public_key).unwrap();

        let first = encrypt.encrypt_value("same-input").unwrap();
        let second = encrypt.encrypt_value("same-input").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_require_string_argument() {
        assert_eq!(
            require_string_argument("name", Some("  padded ")).unwrap(),
            "padded"
        );
        assert_eq!(
            require_string_argument::<&str>("name", None).unwrap_err(),
            SealError::missing("name")
        );
    }
}
