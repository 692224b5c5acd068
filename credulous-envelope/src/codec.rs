//! Encrypting and decrypting envelopes.
//!
//! `seal` always produces the current hybrid format. `open` dispatches on
//! an already-parsed [`Envelope`]'s `Version` field; the legacy path is
//! handled earlier, by [`crate::migrate`], since it needs the private key
//! at parse time rather than at open time.

use aes::Aes256;
use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use cipher::{AsyncStreamCipher, KeyIvInit};
use rand_core::{OsRng, RngCore};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use zeroize::Zeroize;

use crate::error::EnvelopeError;
use crate::keymaterial::fingerprint;
use crate::wire::{
    EncryptionRecord, Envelope, HybridCiphertext, PlaintextCredential, OAEP_LABEL,
    VERSION_CURRENT, VERSION_INTERMEDIATE,
};

type Aes256CfbEncryptor = cfb_mode::Encryptor<Aes256>;
type Aes256CfbDecryptor = cfb_mode::Decryptor<Aes256>;

fn oaep() -> Oaep {
    Oaep::new_with_label::<Sha1, _>(OAEP_LABEL)
}

/// Produces one [`EncryptionRecord`] per recipient, each carrying an
/// independently generated content key wrapping the same plaintext
/// credential.
pub fn seal(
    credential: &PlaintextCredential,
    recipients: &[(String, RsaPublicKey)],
) -> Result<Vec<EncryptionRecord>, EnvelopeError> {
    let plaintext = serde_json::to_vec(credential)
        .map_err(|e| EnvelopeError::BadEncoding(e.to_string()))?;

    recipients
        .iter()
        .map(|(recipient_fingerprint, public_key)| {
            seal_one(&plaintext, recipient_fingerprint, public_key)
        })
        .collect()
}

fn seal_one(
    plaintext: &[u8],
    recipient_fingerprint: &str,
    public_key: &RsaPublicKey,
) -> Result<EncryptionRecord, EnvelopeError> {
    let mut content_key = [0u8; 32];
    OsRng.fill_bytes(&mut content_key);
    let mut iv = [0u8; 16];
    OsRng.fill_bytes(&mut iv);

    let mut buf = plaintext.to_vec();
    Aes256CfbEncryptor::new(&content_key.into(), &iv.into()).encrypt(&mut buf);

    let mut aes_blob = iv.to_vec();
    aes_blob.extend_from_slice(&buf);

    let encoded_key = public_key
        .encrypt(&mut OsRng, oaep(), &content_key)
        .map_err(|e| EnvelopeError::BadCipher(e.to_string()))?;
    content_key.zeroize();

    let inner = HybridCiphertext {
        encoded_key: B64.encode(encoded_key),
        ciphertext: B64.encode(aes_blob),
    };
    let inner_json =
        serde_json::to_vec(&inner).map_err(|e| EnvelopeError::BadEncoding(e.to_string()))?;

    Ok(EncryptionRecord {
        fingerprint: recipient_fingerprint.to_string(),
        ciphertext: B64.encode(inner_json),
        decoded: None,
    })
}

/// Decrypts an already-parsed envelope against `private_key`, walking its
/// encryption records for the one whose fingerprint matches.
pub fn open(envelope: &Envelope, private_key: &RsaPrivateKey) -> Result<PlaintextCredential, EnvelopeError> {
    let recipient_fingerprint = fingerprint(&private_key.to_public_key());

    let record = envelope
        .encryptions
        .iter()
        .find(|record| record.fingerprint == recipient_fingerprint)
        .ok_or(EnvelopeError::NoMatchingRecipient)?;

    if let Some(decoded) = &record.decoded {
        return Ok(decoded.clone());
    }

    match envelope.version.as_str() {
        VERSION_CURRENT => open_hybrid(&record.ciphertext, private_key),
        VERSION_INTERMEDIATE => open_transitional(&record.ciphertext, private_key),
        other => Err(EnvelopeError::UnknownVersion(other.to_string())),
    }
}

fn open_hybrid(ciphertext_b64: &str, private_key: &RsaPrivateKey) -> Result<PlaintextCredential, EnvelopeError> {
    let outer = B64
        .decode(ciphertext_b64)
        .map_err(|e| EnvelopeError::BadEncoding(e.to_string()))?;
    let inner: HybridCiphertext =
        serde_json::from_slice(&outer).map_err(|e| EnvelopeError::BadEncoding(e.to_string()))?;

    let wrapped_key = B64
        .decode(&inner.encoded_key)
        .map_err(|e| EnvelopeError::BadEncoding(e.to_string()))?;
    let content_key = private_key
        .decrypt(oaep(), &wrapped_key)
        .map_err(|e| EnvelopeError::BadCipher(e.to_string()))?;
    let mut content_key: [u8; 32] = content_key
        .try_into()
        .map_err(|_| EnvelopeError::BadCipher("content key has unexpected length".into()))?;

    let aes_blob = B64
        .decode(&inner.ciphertext)
        .map_err(|e| EnvelopeError::BadEncoding(e.to_string()))?;
    if aes_blob.len() < 16 {
        return Err(EnvelopeError::BadCipher("ciphertext shorter than one IV".into()));
    }
    let (iv, ciphertext) = aes_blob.split_at(16);

    let mut buf = ciphertext.to_vec();
    Aes256CfbDecryptor::new(&content_key.into(), iv.into()).decrypt(&mut buf);
    content_key.zeroize();

    serde_json::from_slice(&buf).map_err(|e| EnvelopeError::BadEncoding(e.to_string()))
}

/// Decodes the `2014-05-31` transitional format: the `Ciphertext` field is
/// a bare RSA-OAEP blob of the full credential JSON, no AES layer.
fn open_transitional(ciphertext_b64: &str, private_key: &RsaPrivateKey) -> Result<PlaintextCredential, EnvelopeError> {
    let ciphertext = B64
        .decode(ciphertext_b64)
        .map_err(|e| EnvelopeError::BadEncoding(e.to_string()))?;
    let plaintext = private_key
        .decrypt(oaep(), &ciphertext)
        .map_err(|e| EnvelopeError::BadCipher(e.to_string()))?;
    serde_json::from_slice(&plaintext).map_err(|e| EnvelopeError::BadEncoding(e.to_string()))
}

/// Generates an 8-byte salt, base64-encoded, for the legacy per-field
/// RSA-OAEP scheme.
pub fn generate_legacy_salt() -> String {
    let mut salt = [0u8; 8];
    OsRng.fill_bytes(&mut salt);
    B64.encode(salt)
}

/// Encrypts one legacy field: `salt || plaintext`, RSA-OAEP'd whole.
pub fn legacy_encrypt_field(
    plaintext: &str,
    salt: &str,
    public_key: &RsaPublicKey,
) -> Result<String, EnvelopeError> {
    let combined = format!("{salt}{plaintext}");
    let ciphertext = public_key
        .encrypt(&mut OsRng, oaep(), combined.as_bytes())
        .map_err(|e| EnvelopeError::BadCipher(e.to_string()))?;
    Ok(B64.encode(ciphertext))
}

/// Decrypts one legacy field and strips the shared salt prefix.
pub fn legacy_decrypt_field(
    ciphertext_b64: &str,
    salt: &str,
    private_key: &RsaPrivateKey,
) -> Result<String, EnvelopeError> {
    let ciphertext = B64
        .decode(ciphertext_b64)
        .map_err(|e| EnvelopeError::BadEncoding(e.to_string()))?;
    let plaintext = private_key
        .decrypt(oaep(), &ciphertext)
        .map_err(|e| EnvelopeError::BadCipher(e.to_string()))?;
    let plaintext = String::from_utf8(plaintext)
        .map_err(|e| EnvelopeError::BadEncoding(e.to_string()))?;
    Ok(plaintext.replacen(salt, "", 1))
}
