//! Motion permission prompt, present only on some platforms.

use crate::sensors::types::{Permission, PermissionError};
use futures::future::{self, BoxFuture, FutureExt};

/// Platform prompt for motion sensor access.
pub trait PermissionGate: Send + Sync {
    /// Ask the user for motion access. This is the only suspending call the
    /// engine makes; it has no timeout of its own.
    fn request_motion_permission(&self) -> BoxFuture<'static, Result<Permission, PermissionError>>;
}

/// Gate that always answers the same way.
#[derive(Debug, Clone, Copy)]
pub struct StaticPermission(pub Permission);

impl PermissionGate for StaticPermission {
    fn request_motion_permission(&self) -> BoxFuture<'static, Result<Permission, PermissionError>> {
        future::ready(Ok(self.0)).boxed()
    }
}
