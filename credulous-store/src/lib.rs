//! # credulous-store
//!
//! The on-disk credential store, the cloud-identity verifier, and the
//! access-key rotation state machine for the Credulous vault.
//!
//! Encryption and the envelope wire formats live in `credulous-envelope`;
//! this crate is concerned with where envelopes live on disk and how a
//! decrypted credential is checked against, and rotated at, a cloud
//! identity service.

pub mod cloud;
pub mod error;
pub mod rotator;
pub mod store;
pub mod types;
pub mod verifier;

pub use cloud::{AccessKeyInfo, AccessKeyStatus, CloudError, CloudIdentity, CloudUser};
pub use error::{RotatorError, StoreError, VerifierError};
pub use rotator::{rotate, RotationOutcome, RotationState};
pub use store::CredentialStore;
pub use types::VaultPaths;
pub use verifier::{effective_account_alias, verify};
