//! Loading and fingerprinting RSA key material.
//!
//! Private keys come from an OpenSSH-armored container; public keys come
//! from a single `authorized_keys`-style line. Both ultimately yield
//! `rsa` crate types so the codec module never has to know where the
//! numbers came from.

use std::fmt;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
use md5::{Digest, Md5};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};

use crate::error::KeyMaterialError;

/// Out-of-scope terminal collaborator: asked for a passphrase only when the
/// private key container on disk turns out to be encrypted.
pub trait PassphrasePrompt {
    fn prompt(&self, key_path: &Path) -> std::io::Result<String>;
}

/// A `PassphrasePrompt` that never succeeds; useful when a caller already
/// knows its keys are unencrypted.
pub struct NoPrompt;

impl PassphrasePrompt for NoPrompt {
    fn prompt(&self, key_path: &Path) -> std::io::Result<String> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!(
                "{} is passphrase-protected and no prompt was supplied",
                key_path.display()
            ),
        ))
    }
}

/// A `PassphrasePrompt` backed by a fixed string, for tests.
pub struct FixedPassphrase(pub String);

impl PassphrasePrompt for FixedPassphrase {
    fn prompt(&self, _key_path: &Path) -> std::io::Result<String> {
        Ok(self.0.clone())
    }
}

/// Loads an RSA private key from an OpenSSH-armored container at `path`,
/// prompting for a passphrase through `prompt` if the container is
/// encrypted.
pub fn load_private_key(
    path: &Path,
    prompt: &dyn PassphrasePrompt,
) -> Result<RsaPrivateKey, KeyMaterialError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| KeyMaterialError::BadKeyFile(format!("{}: {}", path.display(), e)))?;

    let mut private = ssh_key::PrivateKey::from_openssh(&data)
        .map_err(|e| KeyMaterialError::BadKeyFile(format!("{}: {}", path.display(), e)))?;

    if private.is_encrypted() {
        let passphrase = prompt
            .prompt(path)
            .map_err(|_| KeyMaterialError::BadPassphrase)?;
        private = private
            .decrypt(passphrase.as_bytes())
            .map_err(|_| KeyMaterialError::BadPassphrase)?;
    } else {
        tracing::warn!(path = %path.display(), "loaded an unencrypted private key container");
    }

    let ssh_key::private::KeypairData::Rsa(keypair) = private.key_data() else {
        return Err(KeyMaterialError::UnsupportedKeyType);
    };

    let n = BigUint::from_bytes_be(keypair.public.n.as_bytes());
    let e = BigUint::from_bytes_be(keypair.public.e.as_bytes());
    let d = BigUint::from_bytes_be(keypair.private.d.as_bytes());
    let p = BigUint::from_bytes_be(keypair.private.p.as_bytes());
    let q = BigUint::from_bytes_be(keypair.private.q.as_bytes());

    RsaPrivateKey::from_components(n, e, d, vec![p, q])
        .map_err(|e| KeyMaterialError::BadKeyFile(e.to_string()))
}

/// Parses one `ssh-rsa <base64> [comment]` line into an RSA public key.
///
/// The base64 payload is the standard SSH wire format: a length-prefixed
/// algorithm name, then length-prefixed `e`, then length-prefixed `n`.
/// Decoded directly here rather than through a general-purpose SSH key
/// parser, since that's the whole of what an `authorized_keys` entry is.
pub fn parse_public_key(line: &str) -> Result<RsaPublicKey, KeyMaterialError> {
    let mut fields = line.trim().split_whitespace();
    let algorithm = fields
        .next()
        .ok_or_else(|| KeyMaterialError::BadKeyFormat("empty line".into()))?;
    if algorithm != "ssh-rsa" {
        return Err(KeyMaterialError::BadKeyFormat(format!(
            "unsupported key algorithm: {}",
            algorithm
        )));
    }
    let blob_b64 = fields
        .next()
        .ok_or_else(|| KeyMaterialError::BadKeyFormat("missing key blob".into()))?;
    let blob = B64
        .decode(blob_b64)
        .map_err(|e| KeyMaterialError::BadKeyFormat(e.to_string()))?;

    let mut cursor = WireCursor::new(&blob);
    let name = cursor.read_string()?;
    if name != b"ssh-rsa" {
        return Err(KeyMaterialError::BadKeyFormat(
            "wire algorithm name does not match ssh-rsa".into(),
        ));
    }
    let e = BigUint::from_bytes_be(cursor.read_string()?);
    let n = BigUint::from_bytes_be(cursor.read_string()?);

    RsaPublicKey::new(n, e).map_err(|e| KeyMaterialError::BadKeyFormat(e.to_string()))
}

struct WireCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> WireCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read_string(&mut self) -> Result<&'a [u8], KeyMaterialError> {
        if self.pos + 4 > self.bytes.len() {
            return Err(KeyMaterialError::BadKeyFormat("truncated wire blob".into()));
        }
        let len = u32::from_be_bytes(self.bytes[self.pos..self.pos + 4].try_into().unwrap()) as usize;
        self.pos += 4;
        if self.pos + len > self.bytes.len() {
            return Err(KeyMaterialError::BadKeyFormat("truncated wire blob".into()));
        }
        let field = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(field)
    }
}

/// Renders the wire-format bytes (`ssh-rsa` name + `e` + `n`, each
/// length-prefixed) that back both the authorized_keys encoding and the
/// classic OpenSSH MD5 fingerprint.
pub fn wire_bytes(public_key: &RsaPublicKey) -> Vec<u8> {
    let mut buf = Vec::new();
    write_wire_string(&mut buf, b"ssh-rsa");
    write_wire_string(&mut buf, &mpint_bytes(public_key.e()));
    write_wire_string(&mut buf, &mpint_bytes(public_key.n()));
    buf
}

fn write_wire_string(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

/// SSH mpints are two's-complement big-endian; a leading zero byte is
/// inserted whenever the value's high bit would otherwise read as negative.
fn mpint_bytes(n: &BigUint) -> Vec<u8> {
    let mut bytes = n.to_bytes_be();
    if bytes.first().is_some_and(|b| b & 0x80 != 0) {
        bytes.insert(0, 0);
    }
    bytes
}

/// The classic OpenSSH MD5 fingerprint: 16 lowercase hex octets joined by
/// `:`, over the key's SSH wire-format serialization.
pub fn fingerprint(public_key: &RsaPublicKey) -> String {
    let digest = Md5::digest(wire_bytes(public_key));
    digest
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

pub(crate) struct DisplayFingerprint<'a>(pub &'a RsaPublicKey);

impl fmt::Display for DisplayFingerprint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", fingerprint(self.0))
    }
}
