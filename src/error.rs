//! CLI-boundary error type: wraps every lower-level error so the binary can
//! print a single `ERROR: <message>` line and exit non-zero.

use std::fmt;

#[derive(Debug)]
pub enum CliError {
    /// A flag or argument was missing or malformed.
    Usage(String),
    /// A required environment variable was absent.
    Env(String),
    Store(credulous_store::StoreError),
    Verifier(credulous_store::VerifierError),
    Rotator(credulous_store::RotatorError),
    Cloud(credulous_store::CloudError),
    Envelope(credulous_envelope::EnvelopeError),
    KeyMaterial(credulous_envelope::KeyMaterialError),
    Io(std::io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage(msg) => write!(f, "{}", msg),
            Self::Env(msg) => write!(f, "{}", msg),
            Self::Store(e) => write!(f, "{}", e),
            Self::Verifier(e) => write!(f, "{}", e),
            Self::Rotator(e) => write!(f, "{}", e),
            Self::Cloud(e) => write!(f, "{}", e),
            Self::Envelope(e) => write!(f, "{}", e),
            Self::KeyMaterial(e) => write!(f, "{}", e),
            Self::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {}

impl From<credulous_store::StoreError> for CliError {
    fn from(e: credulous_store::StoreError) -> Self {
        Self::Store(e)
    }
}

impl From<credulous_store::VerifierError> for CliError {
    fn from(e: credulous_store::VerifierError) -> Self {
        Self::Verifier(e)
    }
}

impl From<credulous_store::RotatorError> for CliError {
    fn from(e: credulous_store::RotatorError) -> Self {
        Self::Rotator(e)
    }
}

impl From<credulous_store::CloudError> for CliError {
    fn from(e: credulous_store::CloudError) -> Self {
        Self::Cloud(e)
    }
}

impl From<credulous_envelope::EnvelopeError> for CliError {
    fn from(e: credulous_envelope::EnvelopeError) -> Self {
        Self::Envelope(e)
    }
}

impl From<credulous_envelope::KeyMaterialError> for CliError {
    fn from(e: credulous_envelope::KeyMaterialError) -> Self {
        Self::KeyMaterial(e)
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
