//! On-disk JSON shapes for the envelope formats this codec understands.
//!
//! Three shapes exist on disk simultaneously in a real vault:
//!
//! - `2014-06-12` (current): [`Envelope`] with hybrid AES/RSA ciphertexts.
//! - `2014-05-31` (intermediate): the same [`Envelope`] shape, but each
//!   `Ciphertext` is a bare RSA-OAEP blob of the whole credential, no AES
//!   layer.
//! - unversioned (legacy): [`LegacyEnvelope`], one recipient, salted
//!   per-field RSA-OAEP.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const VERSION_CURRENT: &str = "2014-06-12";
pub const VERSION_INTERMEDIATE: &str = "2014-05-31";
/// Sentinel version tag used for the in-memory envelope synthesized from a
/// legacy file. Never written to disk.
pub const VERSION_LEGACY: &str = "noversion";

/// The label bound into every RSA-OAEP operation this codec performs.
pub const OAEP_LABEL: &str = "Credulous";

/// A single cloud credential plus whatever environment variables were
/// captured alongside it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlaintextCredential {
    #[serde(rename = "KeyId")]
    pub key_id: String,
    #[serde(rename = "SecretKey")]
    pub secret_key: String,
    #[serde(rename = "EnvVars", default)]
    pub env_vars: BTreeMap<String, String>,
}

/// One recipient's ciphertext within an [`Envelope`].
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EncryptionRecord {
    #[serde(rename = "Fingerprint")]
    pub fingerprint: String,
    #[serde(rename = "Ciphertext")]
    pub ciphertext: String,
    /// Populated only for a legacy file migrated in memory; never
    /// serialized, mirroring the unexported `decoded` field the original
    /// tool keeps off an `Encryption` struct.
    #[serde(skip)]
    pub decoded: Option<PlaintextCredential>,
}

/// The current-format (and intermediate-format) envelope shape.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Envelope {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "IamUsername")]
    pub iam_username: String,
    #[serde(rename = "AccountAliasOrId")]
    pub account_alias_or_id: String,
    #[serde(rename = "CreateTime")]
    pub create_time: String,
    #[serde(rename = "LifeTime")]
    pub life_time: i64,
    #[serde(rename = "Encryptions")]
    pub encryptions: Vec<EncryptionRecord>,
}

/// The unversioned legacy shape: one recipient, flat fields, shared salt.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LegacyEnvelope {
    #[serde(rename = "CreateTime")]
    pub create_time: String,
    #[serde(rename = "LifeTime")]
    pub life_time: i64,
    #[serde(rename = "KeyId")]
    pub key_id: String,
    #[serde(rename = "SecretKey")]
    pub secret_key: String,
    #[serde(rename = "Salt")]
    pub salt: String,
    #[serde(rename = "AccountAliasOrId")]
    pub account_alias_or_id: String,
    #[serde(rename = "IamUsername")]
    pub iam_username: String,
    #[serde(rename = "FingerPrint")]
    pub fingerprint: String,
}

/// The inner JSON wrapped by the `Ciphertext` field of a current-format
/// `EncryptionRecord`: an RSA-OAEP-wrapped content key alongside the
/// AES-256-CFB ciphertext it unlocks.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct HybridCiphertext {
    #[serde(rename = "EncodedKey")]
    pub encoded_key: String,
    #[serde(rename = "Ciphertext")]
    pub ciphertext: String,
}
