//! Orchestration for the `credulous` CLI: `save`, `source`, `list`,
//! `current`, and `rotate`, built on top of `credulous-envelope` (the wire
//! formats and codec) and `credulous-store` (the directory-tree store,
//! the verifier, and the rotation state machine).

pub mod cli;
pub mod error;

pub use error::CliError;

use std::collections::BTreeMap;
use std::path::Path;

use credulous_envelope::keymaterial::PassphrasePrompt;
use credulous_envelope::wire::PlaintextCredential;
use credulous_envelope::{fingerprint, load_private_key, parse_public_key};
use credulous_store::{
    effective_account_alias, rotate as run_rotation, AccessKeyInfo, CloudError, CloudIdentity,
    CloudUser, CredentialStore, RotationOutcome, VaultPaths,
};
use rsa::RsaPublicKey;

/// A `CloudIdentity` that always fails. Talking to a real IAM-style service
/// is a live network integration left to the operator; this placeholder
/// keeps `current`, `rotate`, and `save`'s username/account defaulting
/// well-typed until a caller supplies a real implementation.
pub struct NullCloudIdentity;

fn unconfigured() -> CloudError {
    CloudError(
        "no cloud identity backend is configured; pass --username and --account explicitly"
            .to_string(),
    )
}

impl CloudIdentity for NullCloudIdentity {
    fn get_user(&self, _username: &str) -> Result<CloudUser, CloudError> {
        Err(unconfigured())
    }
    fn access_keys(&self, _username: &str) -> Result<Vec<AccessKeyInfo>, CloudError> {
        Err(unconfigured())
    }
    fn list_account_aliases(&self) -> Result<Vec<String>, CloudError> {
        Err(unconfigured())
    }
    fn create_access_key(&self, _username: &str) -> Result<(String, String), CloudError> {
        Err(unconfigured())
    }
    fn delete_access_key(&self, _id: &str, _username: &str) -> Result<(), CloudError> {
        Err(unconfigured())
    }
}

fn home_dir() -> Result<String, CliError> {
    std::env::var("HOME").map_err(|_| CliError::Env("HOME is not set".to_string()))
}

pub fn vault_paths() -> Result<VaultPaths, CliError> {
    Ok(VaultPaths::from_home(home_dir()?))
}

fn credential_from_env() -> Result<(String, String), CliError> {
    let id = std::env::var("AWS_ACCESS_KEY_ID")
        .map_err(|_| CliError::Env("AWS_ACCESS_KEY_ID is not set".to_string()))?;
    let secret = std::env::var("AWS_SECRET_ACCESS_KEY")
        .map_err(|_| CliError::Env("AWS_SECRET_ACCESS_KEY is not set".to_string()))?;
    Ok((id, secret))
}

fn load_recipients(key_paths: &[String]) -> Result<Vec<(String, RsaPublicKey)>, CliError> {
    if key_paths.is_empty() {
        return Err(CliError::Usage(
            "at least one --key recipient is required".to_string(),
        ));
    }
    let mut recipients = Vec::new();
    for path in key_paths {
        let line = std::fs::read_to_string(path)?;
        let public_key = parse_public_key(&line)?;
        recipients.push((fingerprint(&public_key), public_key));
    }
    Ok(recipients)
}

fn render_exports(credential: &PlaintextCredential) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "export AWS_ACCESS_KEY_ID=\"{}\"\n",
        credential.key_id
    ));
    out.push_str(&format!(
        "export AWS_SECRET_ACCESS_KEY=\"{}\"\n",
        credential.secret_key
    ));
    for (name, value) in &credential.env_vars {
        out.push_str(&format!("export {}=\"{}\"\n", name, value));
    }
    out
}

/// The envelope's `CreateTime` is a decimal string of seconds since the
/// epoch for the access key's creation time, not the file write time.
/// Resolved from the access key's reported creation date, falling back to
/// now if the cloud identity collaborator can't supply it (e.g.
/// `NullCloudIdentity`).
fn resolve_create_epoch(cloud: &dyn CloudIdentity, username: &str, key_id: &str) -> i64 {
    cloud
        .access_keys(username)
        .ok()
        .and_then(|keys| keys.into_iter().find(|k| k.id == key_id))
        .map(|k| k.create_date)
        .unwrap_or_else(|| chrono::Utc::now().timestamp())
}

/// `save`: build a plaintext credential from the ambient environment,
/// encrypt it for every recipient, and write a new envelope.
pub fn cmd_save(
    key_paths: &[String],
    username: Option<String>,
    account: Option<String>,
    cloud: &dyn CloudIdentity,
) -> Result<(), CliError> {
    let (key_id, secret_key) = credential_from_env()?;
    let recipients = load_recipients(key_paths)?;

    let username = match username {
        Some(u) => u,
        None => cloud.get_user("")?.name,
    };
    let account = match account {
        Some(a) => a,
        None => effective_account_alias(cloud)?,
    };

    let create_time = resolve_create_epoch(cloud, &username, &key_id).to_string();
    let credential = PlaintextCredential {
        key_id: key_id.clone(),
        secret_key,
        env_vars: BTreeMap::new(),
    };

    let envelope = credulous_envelope::seal(
        &credential,
        &recipients,
        username.clone(),
        account.clone(),
        create_time,
        0,
    )?;

    let store = CredentialStore::new(vault_paths()?);
    store.save(&envelope, &key_id)?;
    tracing::info!(user = %username, account = %account, "saved credential");
    Ok(())
}

/// `source`: locate the newest envelope for `account`/`username`, decrypt
/// it, and render `export` lines for the shell to evaluate.
pub fn cmd_source(
    account: Option<String>,
    username: Option<String>,
    key_path: &str,
    prompt: &dyn PassphrasePrompt,
) -> Result<String, CliError> {
    let store = CredentialStore::new(vault_paths()?);
    let (account, username) = store.resolve(account.as_deref(), username.as_deref())?;

    let bytes = store.load_latest_bytes(&account, &username)?;
    let private_key = load_private_key(Path::new(key_path), prompt)?;
    let credential = credulous_envelope::open(&bytes, &private_key)?;

    tracing::info!(user = %username, account = %account, "sourced credential");
    Ok(render_exports(&credential))
}

/// `list`: every `user@account` pair with at least one saved envelope.
pub fn cmd_list() -> Result<Vec<String>, CliError> {
    let store = CredentialStore::new(vault_paths()?);
    Ok(store.list_available()?)
}

/// `current`: the account/user the ambient credentials belong to, as
/// reported by the cloud identity collaborator.
pub fn cmd_current(cloud: &dyn CloudIdentity) -> Result<String, CliError> {
    let _ = credential_from_env()?;
    let user = cloud.get_user("")?;
    let alias = effective_account_alias(cloud)?;
    Ok(format!("{}@{}", user.name, alias))
}

/// `rotate`: run the rotation state machine for the caller's own access
/// keys, then re-encrypt and save the freshly provisioned credential.
pub fn cmd_rotate(
    key_paths: &[String],
    cloud: &dyn CloudIdentity,
) -> Result<RotationOutcome, CliError> {
    let recipients = load_recipients(key_paths)?;
    let user = cloud.get_user("")?;
    let account = effective_account_alias(cloud)?;

    let outcome = run_rotation(cloud, &user.name, |_id, _secret| {
        Box::new(NullCloudIdentity) as Box<dyn CloudIdentity>
    })?;

    let credential = PlaintextCredential {
        key_id: outcome.new_key_id.clone(),
        secret_key: outcome.new_secret.clone(),
        env_vars: BTreeMap::new(),
    };
    let create_time = resolve_create_epoch(cloud, &user.name, &outcome.new_key_id).to_string();
    let envelope = credulous_envelope::seal(
        &credential,
        &recipients,
        user.name,
        account,
        create_time,
        0,
    )?;

    let store = CredentialStore::new(vault_paths()?);
    store.save(&envelope, &outcome.new_key_id)?;
    tracing::info!(
        deleted = ?outcome.deleted_key_id,
        created = %outcome.new_key_id,
        "rotated access key"
    );
    Ok(outcome)
}
