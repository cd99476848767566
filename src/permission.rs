use crate::error::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::{debug, info};
use uuid::Uuid;

/// Grant state of a single permission as reported by the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PermissionState {
    #[default]
    Unknown,
    Granted,
    Denied,
}

/// Correlates one permission request with its single result callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(Uuid);

impl RequestToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestToken {
    fn default() -> Self {
        Self::new()
    }
}

/// External permission subsystem.
///
/// `check` reflects the current grant state; `request` issues one asynchronous
/// prompt for the given set. The host answers a request by calling
/// `CameraSessionController::on_permission_result` with the same token,
/// exactly once.
#[async_trait]
pub trait PermissionBackend: Send + Sync {
    fn check(&self, permission: &str) -> PermissionState;

    async fn request(&self, permissions: &[String], token: RequestToken) -> Result<()>;
}

/// Backend whose grants are fixed up front by the embedding environment.
///
/// `request` has nothing to prompt; the host is expected to read the current
/// grants back and deliver the result itself.
pub struct StaticPermissions {
    granted: HashSet<String>,
}

impl StaticPermissions {
    pub fn new(granted: impl IntoIterator<Item = String>) -> Self {
        Self {
            granted: granted.into_iter().collect(),
        }
    }

    /// Grant states for a required set, as the host would report them back.
    pub fn granted_subset(&self, required: &[String]) -> HashSet<String> {
        required
            .iter()
            .filter(|p| self.granted.contains(*p))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PermissionBackend for StaticPermissions {
    fn check(&self, permission: &str) -> PermissionState {
        if self.granted.contains(permission) {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        }
    }

    async fn request(&self, permissions: &[String], token: RequestToken) -> Result<()> {
        info!(
            "Static permission backend received request {:?} for {:?}",
            token, permissions
        );
        Ok(())
    }
}

/// Scripted backend for tests: records every request it receives.
pub struct MockPermissionBackend {
    granted: Mutex<HashSet<String>>,
    requests: Mutex<Vec<(Vec<String>, RequestToken)>>,
}

impl MockPermissionBackend {
    pub fn new() -> Self {
        Self {
            granted: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn grant(&self, permission: &str) {
        self.granted.lock().insert(permission.to_string());
    }

    pub fn revoke(&self, permission: &str) {
        self.granted.lock().remove(permission);
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<(Vec<String>, RequestToken)> {
        self.requests.lock().last().cloned()
    }
}

impl Default for MockPermissionBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionBackend for MockPermissionBackend {
    fn check(&self, permission: &str) -> PermissionState {
        if self.granted.lock().contains(permission) {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        }
    }

    async fn request(&self, permissions: &[String], token: RequestToken) -> Result<()> {
        debug!("Mock permission request {:?} for {:?}", token, permissions);
        self.requests.lock().push((permissions.to_vec(), token));
        Ok(())
    }
}
