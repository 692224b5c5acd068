//! Error types for the credential store, the verifier, and the rotator.

use std::fmt;

/// Errors raised while resolving paths in, or reading/writing, the
/// credential store.
#[derive(Debug)]
pub enum StoreError {
    /// No account subdirectory exists under the store root at all.
    NoCredentialsSaved,
    /// `account` was omitted and more than one account subdirectory exists.
    AmbiguousAccount,
    /// `user` was omitted and more than one user subdirectory exists.
    AmbiguousUser,
    /// A `user@account` specifier did not contain exactly one `@`.
    BadAccountSpecifier(String),
    /// The requested (account, user) pair has no stored envelope file.
    NotFound,
    /// A filesystem operation failed.
    IoError(String),
    /// Something under the store root could not be deserialized as an
    /// envelope.
    EnvelopeError(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentialsSaved => {
                write!(f, "No saved credentials found; please run 'credulous save' first")
            }
            Self::AmbiguousAccount => {
                write!(f, "More than one account found; please specify account and user")
            }
            Self::AmbiguousUser => {
                write!(f, "More than one user found; please specify a user")
            }
            Self::BadAccountSpecifier(s) => write!(f, "malformed account specifier: {}", s),
            Self::NotFound => write!(f, "no credential file found"),
            Self::IoError(msg) => write!(f, "I/O error: {}", msg),
            Self::EnvelopeError(msg) => write!(f, "envelope error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::IoError(e.to_string())
    }
}

impl From<credulous_envelope::EnvelopeError> for StoreError {
    fn from(e: credulous_envelope::EnvelopeError) -> Self {
        StoreError::EnvelopeError(e.to_string())
    }
}

/// Errors raised while verifying a decrypted credential against the cloud
/// identity service.
#[derive(Debug)]
pub enum VerifierError {
    /// The envelope's `AccountAliasOrId` does not match what the cloud
    /// identity service reports.
    AccountMismatch,
    /// The signing key was not found among the user's live access keys.
    UserMismatch,
    /// The cloud identity service returned an ARN with other than five
    /// colon-separated fields.
    BadAccountIdentifier(String),
    /// The cloud identity collaborator itself failed.
    CloudError(String),
}

impl fmt::Display for VerifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountMismatch => write!(
                f,
                "FATAL: account alias in credential does not match requested alias"
            ),
            Self::UserMismatch => write!(
                f,
                "FATAL: username in credential does not match requested username"
            ),
            Self::BadAccountIdentifier(arn) => write!(f, "malformed ARN: {}", arn),
            Self::CloudError(msg) => write!(f, "cloud identity error: {}", msg),
        }
    }
}

impl std::error::Error for VerifierError {}

/// Errors raised by the access-key rotation state machine.
#[derive(Debug)]
pub enum RotatorError {
    /// The user has no access keys to rotate at all.
    ZeroKeys,
    /// `DeleteAccessKey` failed; no cloud-side mutation has happened yet.
    DeleteFailed(String),
    /// `CreateAccessKey` failed after a key was already deleted. Recoverable
    /// only by manual intervention.
    CreateFailed(String),
    /// The newly created key never became visible within the polling budget.
    NotLive,
    /// The cloud identity collaborator itself failed outside the above cases.
    CloudError(String),
}

impl fmt::Display for RotatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroKeys => write!(f, "user has no access keys to rotate"),
            Self::DeleteFailed(msg) => write!(f, "failed to delete access key: {}", msg),
            Self::CreateFailed(msg) => write!(
                f,
                "failed to create a replacement access key after deleting the old one: {}",
                msg
            ),
            Self::NotLive => write!(f, "new access key did not become live in time"),
            Self::CloudError(msg) => write!(f, "cloud identity error: {}", msg),
        }
    }
}

impl std::error::Error for RotatorError {}

impl From<VerifierError> for RotatorError {
    fn from(e: VerifierError) -> Self {
        match e {
            VerifierError::CloudError(msg) => RotatorError::CloudError(msg),
            other => RotatorError::CloudError(other.to_string()),
        }
    }
}
