//! Access-key rotation state machine: `Idle` → `Surveyed` → `Deleted` →
//! `Provisioned` → `Active` / `Failed`.
//!
//! Deleting before creating keeps "at most two live keys" true even when
//! the pre-rotation state already has two; polling after creation bounds
//! the window before the identity service accepts the new key.

use std::thread;
use std::time::Duration;

use crate::cloud::{AccessKeyInfo, AccessKeyStatus, CloudIdentity};
use crate::error::RotatorError;

const POLL_INTERVAL: Duration = Duration::from_secs(1);
const POLL_ATTEMPTS: u32 = 30;

/// States the rotation runs through, in order. Exposed for observability
/// and tests; `rotate` either returns `Ok` having reached `Active` or
/// `Err` at whichever state it failed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RotationState {
    Idle,
    Surveyed,
    Deleted,
    Provisioned,
    Active,
    Failed,
}

/// The result of a successful rotation.
#[derive(Clone, Debug)]
pub struct RotationOutcome {
    pub deleted_key_id: Option<String>,
    pub new_key_id: String,
    pub new_secret: String,
    pub poll_attempts: u32,
}

/// Picks the access key to delete before provisioning a replacement: the
/// first `Inactive` key if any exists, otherwise the oldest, tie-broken
/// lexicographically by id.
fn choose_deletion_target(keys: &[AccessKeyInfo]) -> AccessKeyInfo {
    if let Some(inactive) = keys.iter().find(|k| k.status == AccessKeyStatus::Inactive) {
        return inactive.clone();
    }
    keys.iter()
        .min_by(|a, b| a.create_date.cmp(&b.create_date).then_with(|| a.id.cmp(&b.id)))
        .expect("keys is non-empty")
        .clone()
}

/// Runs the full rotation state machine for `username`.
///
/// `client_for` builds a `CloudIdentity` scoped to the freshly created
/// key, used only for the post-provision liveness poll — a real identity
/// service must see requests signed with the new key before it reports
/// the key as usable.
pub fn rotate(
    cloud: &dyn CloudIdentity,
    username: &str,
    client_for: impl Fn(&str, &str) -> Box<dyn CloudIdentity>,
) -> Result<RotationOutcome, RotatorError> {
    // Idle -> Surveyed
    let keys = cloud
        .access_keys(username)
        .map_err(|e| RotatorError::CloudError(e.to_string()))?;
    tracing::info!(state = ?RotationState::Surveyed, count = keys.len(), "surveyed access keys");

    if keys.is_empty() {
        tracing::warn!(state = ?RotationState::Failed, "no access keys to rotate");
        return Err(RotatorError::ZeroKeys);
    }

    // Surveyed -> Deleted
    let deleted_key_id = if keys.len() >= 2 {
        let target = choose_deletion_target(&keys);
        cloud
            .delete_access_key(&target.id, username)
            .map_err(|e| {
                tracing::warn!(state = ?RotationState::Failed, "delete failed");
                RotatorError::DeleteFailed(e.to_string())
            })?;
        tracing::info!(state = ?RotationState::Deleted, id = %target.id, "deleted access key");
        Some(target.id)
    } else {
        tracing::info!(state = ?RotationState::Deleted, "single key present, nothing to delete");
        None
    };

    // Deleted -> Provisioned
    let (new_key_id, new_secret) = cloud.create_access_key(username).map_err(|e| {
        tracing::warn!(
            state = ?RotationState::Failed,
            deleted = ?deleted_key_id,
            "create failed after deletion; manual intervention required"
        );
        RotatorError::CreateFailed(e.to_string())
    })?;
    tracing::info!(state = ?RotationState::Provisioned, id = %new_key_id, "provisioned new access key");

    // Provisioned -> Active
    let new_client = client_for(&new_key_id, &new_secret);
    let mut poll_attempts = 0;
    let mut live = false;
    while poll_attempts < POLL_ATTEMPTS {
        poll_attempts += 1;
        let reachable = new_client
            .get_user("")
            .and_then(|_| new_client.list_account_aliases())
            .is_ok();
        if reachable {
            live = true;
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }

    if !live {
        tracing::warn!(state = ?RotationState::Failed, "new key never became live");
        return Err(RotatorError::NotLive);
    }

    tracing::info!(state = ?RotationState::Active, attempts = poll_attempts, "rotation complete");
    Ok(RotationOutcome {
        deleted_key_id,
        new_key_id,
        new_secret,
        poll_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{CloudUser, InMemoryCloudIdentity};

    fn fake_cloud() -> InMemoryCloudIdentity {
        InMemoryCloudIdentity::new(
            CloudUser {
                arn: "arn:aws:iam::123456789012:user/alice".into(),
                path: "/".into(),
                id: "AID1".into(),
                name: "alice".into(),
            },
            Some("prod".into()),
        )
    }

    #[test]
    fn happy_path_deletes_oldest_and_provisions_a_new_key() {
        let cloud = fake_cloud();
        cloud.seed_key("A", AccessKeyStatus::Active, 100);
        cloud.seed_key("B", AccessKeyStatus::Active, 200);

        let outcome = rotate(&cloud, "alice", |_, _| Box::new(fake_cloud())).unwrap();
        // fake_cloud() in client_for is a fresh instance so it's trivially
        // live; this exercises the polling path without asserting on it.
        assert_eq!(outcome.deleted_key_id.as_deref(), Some("A"));
        assert_eq!(outcome.poll_attempts, 1);

        let remaining = cloud.key_ids();
        assert!(remaining.contains(&"B".to_string()));
        assert!(!remaining.contains(&"A".to_string()));
        assert!(remaining.contains(&outcome.new_key_id));
    }

    #[test]
    fn prefers_deleting_an_inactive_key_regardless_of_age() {
        let cloud = fake_cloud();
        cloud.seed_key("OLD", AccessKeyStatus::Active, 50);
        cloud.seed_key("STALE", AccessKeyStatus::Inactive, 9_999_999);

        let outcome = rotate(&cloud, "alice", |_, _| Box::new(fake_cloud())).unwrap();
        assert_eq!(outcome.deleted_key_id.as_deref(), Some("STALE"));
    }

    #[test]
    fn single_key_is_never_deleted() {
        let cloud = fake_cloud();
        cloud.seed_key("ONLY", AccessKeyStatus::Active, 100);

        let outcome = rotate(&cloud, "alice", |_, _| Box::new(fake_cloud())).unwrap();
        assert_eq!(outcome.deleted_key_id, None);
        assert!(cloud.key_ids().contains(&"ONLY".to_string()));
    }

    #[test]
    fn zero_keys_fails_immediately() {
        let cloud = fake_cloud();
        let err = rotate(&cloud, "alice", |_, _| Box::new(fake_cloud())).unwrap_err();
        assert!(matches!(err, RotatorError::ZeroKeys));
    }

    #[test]
    fn create_failure_after_delete_leaves_only_the_surviving_key() {
        let cloud = fake_cloud();
        cloud.seed_key("A", AccessKeyStatus::Active, 100);
        cloud.seed_key("B", AccessKeyStatus::Active, 200);

        struct NoCreate(InMemoryCloudIdentity);
        impl CloudIdentity for NoCreate {
            fn get_user(&self, u: &str) -> Result<CloudUser, crate::cloud::CloudError> {
                self.0.get_user(u)
            }
            fn access_keys(&self, u: &str) -> Result<Vec<AccessKeyInfo>, crate::cloud::CloudError> {
                self.0.access_keys(u)
            }
            fn list_account_aliases(&self) -> Result<Vec<String>, crate::cloud::CloudError> {
                self.0.list_account_aliases()
            }
            fn create_access_key(&self, _u: &str) -> Result<(String, String), crate::cloud::CloudError> {
                Err(crate::cloud::CloudError("throttled".into()))
            }
            fn delete_access_key(&self, id: &str, u: &str) -> Result<(), crate::cloud::CloudError> {
                self.0.delete_access_key(id, u)
            }
        }

        let blocked = NoCreate(cloud);
        let err = rotate(&blocked, "alice", |_, _| Box::new(fake_cloud())).unwrap_err();
        assert!(matches!(err, RotatorError::CreateFailed(_)));

        let remaining = blocked.0.key_ids();
        assert_eq!(remaining, vec!["B".to_string()]);
    }
}
