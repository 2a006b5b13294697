//! Decides whether a local file and a remote object hold the same content.

use tracing::debug;

use crate::fs::types::{LocalFileRecord, RemoteObjectRecord};

/// `true` when a transfer is needed to make the two sides agree.
///
/// Hashes are ground truth when both sides have one. Without them, equal sizes
/// count as identical; no bytes are compared, so same-size edits can be missed.
pub fn are_different(local: &LocalFileRecord, remote: &RemoteObjectRecord) -> bool {
    if !local.exists || !remote.exists {
        return true;
    }

    if let Some(remote_hash) = remote.hash.as_deref().filter(|h| !h.is_empty()) {
        let local_hash = local.hash();
        if !local_hash.is_empty() {
            let different = local_hash != remote_hash;
            debug!(
                "Hash comparison: {} {}",
                remote.relative_key,
                if different { "different" } else { "identical" }
            );
            return different;
        }
    }

    let different = local.size != remote.size;
    debug!(
        "Size comparison: {} {}",
        remote.relative_key,
        if different { "different" } else { "identical" }
    );
    different
}
