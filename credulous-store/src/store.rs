//! The on-disk credential store: `$HOME/.credulous/local/<account>/<user>/<epoch>-<last8>.json`.

use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use credulous_envelope::wire::Envelope;

use crate::error::StoreError;
use crate::types::VaultPaths;

/// Lists the names of immediate subdirectories of `dir`, sorted.
/// A missing `dir` is treated as empty rather than an error, since an
/// account or user with no saves yet simply has no directory.
fn list_subdirs(dir: &Path) -> Result<Vec<String>, StoreError> {
    let read_dir = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut names = Vec::new();
    for entry in read_dir {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Lists the names of envelope files directly inside `dir`, byte-sorted.
/// Filenames are `<epoch>-<last8>.json`, so byte order tracks creation
/// order and does not depend on the filesystem's own directory order.
fn list_envelope_files(dir: &Path) -> Result<Vec<String>, StoreError> {
    let read_dir = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut names = Vec::new();
    for entry in read_dir {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

fn create_dir_private(dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    fs::set_permissions(dir, fs::Permissions::from_mode(0o700))?;
    Ok(())
}

fn write_file_private(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    fs::write(path, bytes)?;
    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

/// Builds the `<create-epoch>-<last8>.json` filename for a saved envelope.
/// The epoch is the credential's `CreateTime` (the access key's creation
/// time), not the moment this file happens to be written.
fn envelope_filename(key_id: &str, create_epoch: i64) -> String {
    let suffix = if key_id.len() > 8 {
        &key_id[key_id.len() - 8..]
    } else {
        key_id
    };
    format!("{}-{}.json", create_epoch, suffix)
}

/// Resolves an account/user subdirectory choice according to the
/// "0 directories -> no credentials, 1 -> use it, >1 -> ambiguous" rule.
fn resolve_one(dir: &Path, ambiguous: StoreError) -> Result<String, StoreError> {
    let dirs = list_subdirs(dir)?;
    match dirs.len() {
        0 => Err(StoreError::NoCredentialsSaved),
        1 => Ok(dirs.into_iter().next().unwrap()),
        _ => Err(ambiguous),
    }
}

/// The directory-tree credential store.
pub struct CredentialStore {
    paths: VaultPaths,
}

impl CredentialStore {
    pub fn new(paths: VaultPaths) -> Self {
        Self { paths }
    }

    /// Resolves `account`/`user` to concrete names, falling back to the
    /// sole existing subdirectory when either is omitted.
    pub fn resolve(
        &self,
        account: Option<&str>,
        user: Option<&str>,
    ) -> Result<(String, String), StoreError> {
        let account = match account {
            Some(a) => a.to_string(),
            None => resolve_one(&self.paths.local_root(), StoreError::AmbiguousAccount)?,
        };
        let user = match user {
            Some(u) => u.to_string(),
            None => resolve_one(
                &self.paths.account_dir(&account),
                StoreError::AmbiguousUser,
            )?,
        };
        Ok((account, user))
    }

    /// Parses a `user@account` specifier into its two parts.
    pub fn split_specifier(specifier: &str) -> Result<(String, String), StoreError> {
        let mut parts = specifier.splitn(2, '@');
        let user = parts.next().unwrap_or_default();
        let account = parts
            .next()
            .ok_or_else(|| StoreError::BadAccountSpecifier(specifier.to_string()))?;
        if user.is_empty() || account.is_empty() {
            return Err(StoreError::BadAccountSpecifier(specifier.to_string()));
        }
        Ok((user.to_string(), account.to_string()))
    }

    /// Writes `envelope`'s JSON encoding into the account/user directory,
    /// creating it (mode 0700) if needed, and the file itself at mode 0600.
    /// The filename's epoch comes from `envelope.create_time`, the access
    /// key's creation time, not from the moment this write happens.
    pub fn save(&self, envelope: &Envelope, key_id: &str) -> Result<PathBuf, StoreError> {
        let dir = self
            .paths
            .user_dir(&envelope.account_alias_or_id, &envelope.iam_username);
        create_dir_private(&dir)?;

        let create_epoch: i64 = envelope.create_time.parse().map_err(|_| {
            StoreError::EnvelopeError(format!(
                "CreateTime is not a decimal epoch-seconds string: {}",
                envelope.create_time
            ))
        })?;

        let bytes = serde_json::to_vec(envelope)
            .map_err(|e| StoreError::IoError(format!("encoding envelope: {}", e)))?;
        let path = dir.join(envelope_filename(key_id, create_epoch));
        write_file_private(&path, &bytes)?;
        tracing::info!(path = %path.display(), "saved credential envelope");
        Ok(path)
    }

    /// Returns the raw bytes of the most recently saved envelope for
    /// `account`/`user`, selected by byte-sorted filename order (the
    /// filenames embed the creation epoch, so this is also recency order).
    pub fn load_latest_bytes(&self, account: &str, user: &str) -> Result<Vec<u8>, StoreError> {
        let dir = self.paths.user_dir(account, user);
        let files = list_envelope_files(&dir)?;
        let latest = files.last().ok_or(StoreError::NotFound)?;
        Ok(fs::read(dir.join(latest))?)
    }

    /// Lists every `user@account` pair that has at least one saved envelope.
    pub fn list_available(&self) -> Result<Vec<String>, StoreError> {
        let accounts = list_subdirs(&self.paths.local_root())?;
        if accounts.is_empty() {
            return Err(StoreError::NoCredentialsSaved);
        }

        let mut available = Vec::new();
        for account in accounts {
            let users = list_subdirs(&self.paths.account_dir(&account))?;
            for user in users {
                let files = list_envelope_files(&self.paths.user_dir(&account, &user))?;
                if !files.is_empty() {
                    available.push(format!("{}@{}", user, account));
                }
            }
        }
        Ok(available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_envelope(account: &str, user: &str) -> Envelope {
        Envelope {
            version: "2014-06-12".to_string(),
            iam_username: user.to_string(),
            account_alias_or_id: account.to_string(),
            create_time: "1402531200".to_string(),
            life_time: 0,
            encryptions: Vec::new(),
        }
    }

    #[test]
    fn save_then_load_latest_round_trips_bytes() {
        let home = tempdir().unwrap();
        let store = CredentialStore::new(VaultPaths::from_home(home.path()));
        let envelope = sample_envelope("prod", "alice");

        let path = store.save(&envelope, "AKIA1234567890ABCDEF").unwrap();
        assert!(path.exists());

        let loaded = store.load_latest_bytes("prod", "alice").unwrap();
        let parsed: Envelope = serde_json::from_slice(&loaded).unwrap();
        assert_eq!(parsed.iam_username, "alice");
    }

    #[test]
    fn load_latest_picks_the_byte_greatest_filename() {
        let home = tempdir().unwrap();
        let paths = VaultPaths::from_home(home.path());
        let dir = paths.user_dir("prod", "alice");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("100-aaaaaaaa.json"), b"{}").unwrap();
        fs::write(dir.join("200-bbbbbbbb.json"), b"second").unwrap();

        let store = CredentialStore::new(paths);
        let loaded = store.load_latest_bytes("prod", "alice").unwrap();
        assert_eq!(loaded, b"second");
    }

    #[test]
    fn resolve_fails_with_no_credentials_saved_on_empty_store() {
        let home = tempdir().unwrap();
        let store = CredentialStore::new(VaultPaths::from_home(home.path()));
        let err = store.resolve(None, None).unwrap_err();
        assert!(matches!(err, StoreError::NoCredentialsSaved));
    }

    #[test]
    fn resolve_defaults_the_sole_account_and_user() {
        let home = tempdir().unwrap();
        let store = CredentialStore::new(VaultPaths::from_home(home.path()));
        store
            .save(&sample_envelope("prod", "alice"), "AKIA1234567890ABCDEF")
            .unwrap();

        let (account, user) = store.resolve(None, None).unwrap();
        assert_eq!(account, "prod");
        assert_eq!(user, "alice");
    }

    #[test]
    fn resolve_is_ambiguous_with_two_accounts() {
        let home = tempdir().unwrap();
        let store = CredentialStore::new(VaultPaths::from_home(home.path()));
        store
            .save(&sample_envelope("prod", "alice"), "AKIA1234567890ABCDEF")
            .unwrap();
        store
            .save(&sample_envelope("staging", "alice"), "AKIA1234567890ABCDEF")
            .unwrap();

        let err = store.resolve(None, None).unwrap_err();
        assert!(matches!(err, StoreError::AmbiguousAccount));
    }

    #[test]
    fn resolve_is_ambiguous_with_two_users_in_one_account() {
        let home = tempdir().unwrap();
        let store = CredentialStore::new(VaultPaths::from_home(home.path()));
        store
            .save(&sample_envelope("prod", "alice"), "AKIA1234567890ABCDEF")
            .unwrap();
        store
            .save(&sample_envelope("prod", "bob"), "AKIA1234567890ABCDEF")
            .unwrap();

        let err = store.resolve(Some("prod"), None).unwrap_err();
        assert!(matches!(err, StoreError::AmbiguousUser));
    }

    #[test]
    fn list_available_reports_every_saved_user_at_account() {
        let home = tempdir().unwrap();
        let store = CredentialStore::new(VaultPaths::from_home(home.path()));
        store
            .save(&sample_envelope("prod", "alice"), "AKIA1234567890ABCDEF")
            .unwrap();
        store
            .save(&sample_envelope("prod", "bob"), "AKIA1234567890ABCDEF")
            .unwrap();

        let mut available = store.list_available().unwrap();
        available.sort();
        assert_eq!(available, vec!["alice@prod".to_string(), "bob@prod".to_string()]);
    }

    #[test]
    fn split_specifier_rejects_missing_at_sign() {
        let err = CredentialStore::split_specifier("alice-prod").unwrap_err();
        assert!(matches!(err, StoreError::BadAccountSpecifier(_)));
    }

    #[test]
    fn split_specifier_accepts_user_at_account() {
        let (user, account) = CredentialStore::split_specifier("alice@prod").unwrap();
        assert_eq!(user, "alice");
        assert_eq!(account, "prod");
    }

    #[test]
    fn saved_file_permissions_are_private() {
        let home = tempdir().unwrap();
        let store = CredentialStore::new(VaultPaths::from_home(home.path()));
        let path = store
            .save(&sample_envelope("prod", "alice"), "AKIA1234567890ABCDEF")
            .unwrap();

        #[cfg(unix)]
        {
            let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600);
        }
    }
}
