//! Reads an envelope file of unknown vintage off disk and produces a
//! single, uniform `Envelope` value for [`crate::codec::open`] to consume.
//!
//! A current or intermediate file is just deserialized; decryption happens
//! later, lazily, once a caller has a private key to try. A legacy file
//! has no `Encryptions` list to defer through, so it is decrypted here,
//! eagerly, and wrapped in a synthetic single-recipient `Envelope` whose
//! lone record already carries its `decoded` plaintext.

use rsa::RsaPrivateKey;

use crate::codec::legacy_decrypt_field;
use crate::error::EnvelopeError;
use crate::keymaterial::fingerprint;
use crate::wire::{
    EncryptionRecord, Envelope, LegacyEnvelope, PlaintextCredential, VERSION_CURRENT,
    VERSION_INTERMEDIATE, VERSION_LEGACY,
};

/// Parses `bytes` (the raw contents of one credential file) into an
/// `Envelope`, decrypting the legacy path eagerly against `private_key`.
pub fn read_envelope(bytes: &[u8], private_key: &RsaPrivateKey) -> Result<Envelope, EnvelopeError> {
    let probe: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| EnvelopeError::BadEncoding(e.to_string()))?;

    match probe.get("Version").and_then(|v| v.as_str()) {
        None => parse_legacy(bytes, private_key),
        Some(VERSION_CURRENT) => parse_current(bytes),
        Some(VERSION_INTERMEDIATE) => {
            tracing::warn!("reading an intermediate-format (2014-05-31) credential file");
            eprintln!(
                "WARNING: this credential file uses an older format; run 'credulous save' again to upgrade it"
            );
            parse_current(bytes)
        }
        Some(other) => Err(EnvelopeError::UnknownVersion(other.to_string())),
    }
}

fn parse_current(bytes: &[u8]) -> Result<Envelope, EnvelopeError> {
    let envelope: Envelope =
        serde_json::from_slice(bytes).map_err(|e| EnvelopeError::BadEncoding(e.to_string()))?;
    if envelope.encryptions.is_empty() {
        return Err(EnvelopeError::BadEncoding(
            "envelope carries no encryption records".into(),
        ));
    }
    tracing::info!(version = %envelope.version, "parsed envelope");
    Ok(envelope)
}

fn parse_legacy(bytes: &[u8], private_key: &RsaPrivateKey) -> Result<Envelope, EnvelopeError> {
    let legacy: LegacyEnvelope =
        serde_json::from_slice(bytes).map_err(|e| EnvelopeError::BadEncoding(e.to_string()))?;

    let recipient_fingerprint = fingerprint(&private_key.to_public_key());
    tracing::debug!(
        wanted = %recipient_fingerprint,
        found = %legacy.fingerprint,
        "matching legacy envelope fingerprint"
    );
    if recipient_fingerprint != legacy.fingerprint {
        return Err(EnvelopeError::NoMatchingRecipient);
    }

    let key_id = legacy_decrypt_field(&legacy.key_id, &legacy.salt, private_key)?;
    let secret_key = legacy_decrypt_field(&legacy.secret_key, &legacy.salt, private_key)?;

    tracing::warn!("reading a legacy (unversioned) credential file");
    eprintln!(
        "WARNING: this credential file uses the original unversioned format; run 'credulous save' again to upgrade it"
    );

    let decoded = PlaintextCredential {
        key_id,
        secret_key,
        env_vars: Default::default(),
    };

    Ok(Envelope {
        version: VERSION_LEGACY.to_string(),
        iam_username: legacy.iam_username,
        account_alias_or_id: legacy.account_alias_or_id,
        create_time: legacy.create_time,
        life_time: legacy.life_time,
        encryptions: vec![EncryptionRecord {
            fingerprint: legacy.fingerprint,
            ciphertext: String::new(),
            decoded: Some(decoded),
        }],
    })
}
