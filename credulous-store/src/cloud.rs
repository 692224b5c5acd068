//! The cloud identity capability the verifier and rotator consume.
//!
//! Modeled as an explicit trait up front (per the duck-typed-test-doubles
//! design note this vault resolves), with an in-memory fake for tests
//! rather than a live client baked into the core.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

/// A cloud identity principal, as returned by `GetUser`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloudUser {
    pub arn: String,
    pub path: String,
    pub id: String,
    pub name: String,
}

/// Liveness of one access key, as returned by `AccessKeys`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKeyStatus {
    Active,
    Inactive,
}

/// One access key as reported by the cloud identity service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessKeyInfo {
    pub user_name: String,
    pub id: String,
    pub status: AccessKeyStatus,
    /// Seconds since the epoch; compared numerically by the rotator, not
    /// parsed as a calendar date.
    pub create_date: i64,
}

/// The collaborator failed to answer a request at all (network, auth,
/// throttling — anything below the level this crate reasons about).
#[derive(Debug, Clone)]
pub struct CloudError(pub String);

impl fmt::Display for CloudError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for CloudError {}

/// The five operations the verifier and rotator need from a cloud
/// identity / IAM-style service. An empty `username` means "the caller
/// whose credentials are currently signing requests".
pub trait CloudIdentity {
    fn get_user(&self, username: &str) -> Result<CloudUser, CloudError>;
    fn access_keys(&self, username: &str) -> Result<Vec<AccessKeyInfo>, CloudError>;
    fn list_account_aliases(&self) -> Result<Vec<String>, CloudError>;
    fn create_access_key(&self, username: &str) -> Result<(String, String), CloudError>;
    fn delete_access_key(&self, id: &str, username: &str) -> Result<(), CloudError>;
}

/// An in-memory `CloudIdentity` fake for tests: one account, a fixed
/// caller identity, and a mutable table of access keys.
pub struct InMemoryCloudIdentity {
    pub account_alias: Option<String>,
    pub caller: CloudUser,
    keys: RefCell<HashMap<String, AccessKeyInfo>>,
    next_id: RefCell<u64>,
}

impl InMemoryCloudIdentity {
    pub fn new(caller: CloudUser, account_alias: Option<String>) -> Self {
        Self {
            account_alias,
            caller,
            keys: RefCell::new(HashMap::new()),
            next_id: RefCell::new(0),
        }
    }

    /// Seeds one access key directly, bypassing `create_access_key`, for
    /// setting up a rotator test's starting state.
    pub fn seed_key(&self, id: &str, status: AccessKeyStatus, create_date: i64) {
        self.keys.borrow_mut().insert(
            id.to_string(),
            AccessKeyInfo {
                user_name: self.caller.name.clone(),
                id: id.to_string(),
                status,
                create_date,
            },
        );
    }

    pub fn key_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.keys.borrow().keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl CloudIdentity for InMemoryCloudIdentity {
    fn get_user(&self, _username: &str) -> Result<CloudUser, CloudError> {
        Ok(self.caller.clone())
    }

    fn access_keys(&self, _username: &str) -> Result<Vec<AccessKeyInfo>, CloudError> {
        let mut keys: Vec<AccessKeyInfo> = self.keys.borrow().values().cloned().collect();
        keys.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(keys)
    }

    fn list_account_aliases(&self) -> Result<Vec<String>, CloudError> {
        Ok(self.account_alias.clone().into_iter().collect())
    }

    fn create_access_key(&self, username: &str) -> Result<(String, String), CloudError> {
        let mut next_id = self.next_id.borrow_mut();
        *next_id += 1;
        let id = format!("AKIAGENERATED{:07}", next_id);
        let secret = format!("secret-{}", id);
        self.keys.borrow_mut().insert(
            id.clone(),
            AccessKeyInfo {
                user_name: username.to_string(),
                id: id.clone(),
                status: AccessKeyStatus::Active,
                create_date: 0,
            },
        );
        Ok((id, secret))
    }

    fn delete_access_key(&self, id: &str, _username: &str) -> Result<(), CloudError> {
        if self.keys.borrow_mut().remove(id).is_none() {
            return Err(CloudError(format!("no such access key: {}", id)));
        }
        Ok(())
    }
}
