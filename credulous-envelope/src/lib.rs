//! Envelope codec and key material handling for the Credulous credential
//! vault.
//!
//! A vault file holds one or more RSA-OAEP-wrapped AES-256-CFB ciphertexts
//! of a JSON credential, one per recipient fingerprint, plus the older
//! formats a long-lived vault still has to read: an intermediate pure-RSA
//! form and the original unversioned, salted, single-recipient form.

pub mod codec;
pub mod error;
pub mod keymaterial;
pub mod migrate;
pub mod wire;

pub use error::{EnvelopeError, KeyMaterialError};
pub use keymaterial::{fingerprint, load_private_key, parse_public_key, PassphrasePrompt};
pub use wire::{Envelope, PlaintextCredential};

use rsa::{RsaPrivateKey, RsaPublicKey};

/// Encrypts `credential` for every `(fingerprint, public_key)` recipient,
/// producing a current-format (`2014-06-12`) envelope.
pub fn seal(
    credential: &PlaintextCredential,
    recipients: &[(String, RsaPublicKey)],
    iam_username: String,
    account_alias_or_id: String,
    create_time: String,
    life_time: i64,
) -> Result<Envelope, EnvelopeError> {
    let encryptions = codec::seal(credential, recipients)?;
    Ok(Envelope {
        version: wire::VERSION_CURRENT.to_string(),
        iam_username,
        account_alias_or_id,
        create_time,
        life_time,
        encryptions,
    })
}

/// Reads raw file bytes of any understood vintage and decrypts the
/// credential addressed to `private_key`.
pub fn open(bytes: &[u8], private_key: &RsaPrivateKey) -> Result<PlaintextCredential, EnvelopeError> {
    let envelope = migrate::read_envelope(bytes, private_key)?;
    codec::open(&envelope, private_key)
}
