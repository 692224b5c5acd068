//! Confirms a decrypted credential still identifies the account and user
//! it claims to, by asking the cloud identity collaborator.

use crate::cloud::CloudIdentity;
use crate::error::VerifierError;
use credulous_envelope::wire::PlaintextCredential;

/// Extracts the account id from an IAM-style ARN
/// (`arn:partition:service:region:account-id:resource`), the fifth
/// colon-separated field.
fn account_id_from_arn(arn: &str) -> Result<&str, VerifierError> {
    arn.splitn(6, ':')
        .nth(4)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| VerifierError::BadAccountIdentifier(arn.to_string()))
}

/// Resolves the effective account alias-or-id: the first account alias if
/// one exists, otherwise the account id parsed out of the caller's own ARN.
/// Exposed for callers (such as `save`) that need to default an omitted
/// account/username without running the full `verify` check.
pub fn effective_account_alias(cloud: &dyn CloudIdentity) -> Result<String, VerifierError> {
    let aliases = cloud
        .list_account_aliases()
        .map_err(|e| VerifierError::CloudError(e.to_string()))?;
    if let Some(alias) = aliases.into_iter().next() {
        return Ok(alias);
    }
    let caller = cloud
        .get_user("")
        .map_err(|e| VerifierError::CloudError(e.to_string()))?;
    Ok(account_id_from_arn(&caller.arn)?.to_string())
}

/// Confirms `credential` (already decrypted) still belongs to
/// `expected_account`/`expected_username` at the cloud identity service.
///
/// `expected_username == expected_account` is the root-user convention:
/// access keys are then looked up under the empty username, matching the
/// "current caller" query used throughout this collaborator.
pub fn verify(
    cloud: &dyn CloudIdentity,
    credential: &PlaintextCredential,
    expected_account: &str,
    expected_username: &str,
) -> Result<(), VerifierError> {
    let alias = effective_account_alias(cloud)?;
    if alias != expected_account {
        return Err(VerifierError::AccountMismatch);
    }

    let query_username = if expected_username == alias {
        ""
    } else {
        expected_username
    };

    let keys = cloud
        .access_keys(query_username)
        .map_err(|e| VerifierError::CloudError(e.to_string()))?;

    let owns_key = keys.iter().any(|k| k.id == credential.key_id);
    if !owns_key {
        return Err(VerifierError::UserMismatch);
    }

    tracing::info!(account = %expected_account, user = %expected_username, "credential verified");
    Ok(())
}
