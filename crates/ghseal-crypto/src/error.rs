use thiserror::Error;

/// Errors raised while validating arguments or sealing a value
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SealError {
    /// Argument was not supplied at all
    #[error("Need to provide a value for argument \"{name}\"")]
    MissingArgument { name: String },

    /// Argument was supplied but is empty once trimmed
    #[error("\"{name}\" value provided was zero length or empty string")]
    EmptyArgument { name: String },

    /// Public key is not valid base64
    #[error("Public key is not valid base64: {0}")]
    InvalidBase64(String),

    /// Public key decoded to the wrong number of bytes
    #[error("Invalid public key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    /// The sealed box construction itself failed
    #[error("Sealed box encryption failed")]
    Seal,
}

impl SealError {
    /// Create a missing argument error
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }

    /// Create an empty argument error
    pub fn empty(name: impl Into<String>) -> Self {
        Self::EmptyArgument { name: name.into() }
    }
}
