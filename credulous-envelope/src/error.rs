//! Error types for the envelope codec and key material loader.

use std::fmt;

/// Errors raised while parsing, encrypting, or decrypting an envelope.
#[derive(Debug)]
pub enum EnvelopeError {
    /// The on-disk JSON, or a base64/inner-JSON blob it contains, is malformed.
    BadEncoding(String),
    /// An RSA or AES operation failed (wrong key, corrupt ciphertext, bad padding).
    BadCipher(String),
    /// None of the envelope's encryption records matched the supplied private key.
    NoMatchingRecipient,
    /// The envelope's `Version` field names a format this codec does not understand.
    UnknownVersion(String),
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadEncoding(msg) => write!(f, "bad envelope encoding: {}", msg),
            Self::BadCipher(msg) => write!(f, "cipher error: {}", msg),
            Self::NoMatchingRecipient => write!(f, "no encryption record matches this key"),
            Self::UnknownVersion(v) => write!(f, "unknown envelope version: {}", v),
        }
    }
}

impl std::error::Error for EnvelopeError {}

/// Errors raised while loading or parsing SSH key material.
#[derive(Debug)]
pub enum KeyMaterialError {
    /// The private key file could not be read from disk.
    BadKeyFile(String),
    /// The public key line is not a well-formed `ssh-rsa <base64>` entry.
    BadKeyFormat(String),
    /// The key is syntactically valid but not an RSA key.
    UnsupportedKeyType,
    /// The container is encrypted and no correct passphrase was supplied.
    BadPassphrase,
}

impl fmt::Display for KeyMaterialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadKeyFile(msg) => write!(f, "cannot read key file: {}", msg),
            Self::BadKeyFormat(msg) => write!(f, "malformed public key: {}", msg),
            Self::UnsupportedKeyType => write!(f, "only RSA keys are supported"),
            Self::BadPassphrase => write!(f, "incorrect passphrase for private key"),
        }
    }
}

impl std::error::Error for KeyMaterialError {}

impl From<KeyMaterialError> for EnvelopeError {
    fn from(e: KeyMaterialError) -> Self {
        EnvelopeError::BadCipher(e.to_string())
    }
}
