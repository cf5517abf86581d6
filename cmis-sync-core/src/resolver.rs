//! Remote existence checks.
//!
//! Every call goes to the repository; results are never kept. Lookup errors
//! fail open: they are logged and reported as "absent", so a transient
//! network problem looks like a missing object and the following create call
//! surfaces the real failure if the object does exist.

use tracing::{debug, warn};

use crate::contract::{RemoteObjectRef, Repository};

/// Fresh lookup of `remote_path`.
pub async fn exists<R>(repo: &R, remote_path: &str) -> Option<RemoteObjectRef>
where
    R: Repository + ?Sized,
{
    match repo.lookup_by_path(remote_path).await {
        Ok(Some(found)) => {
            debug!(path = remote_path, id = %found.id, kind = %found.kind, "[SYNC][LOOKUP] Found remote object");
            Some(found)
        }
        Ok(None) => {
            debug!(path = remote_path, "[SYNC][LOOKUP] Remote path absent");
            None
        }
        Err(e) => {
            warn!(path = remote_path, error = %e, "[SYNC][LOOKUP] Lookup failed, treating as absent");
            None
        }
    }
}
