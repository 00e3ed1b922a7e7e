//! Best-effort owner name lookup.

use std::fs::Metadata;

/// Name of the user owning the node described by `metadata`.
///
/// Returns an empty string when the lookup fails or the UID has no entry in
/// the user database.
#[cfg(unix)]
pub(crate) fn owner_name(metadata: &Metadata) -> String {
    use nix::unistd::{Uid, User};
    use std::os::unix::fs::MetadataExt;

    let uid = metadata.uid();
    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => user.name,
        Ok(None) => String::new(),
        Err(errno) => {
            log::debug!("Could not resolve owner of uid {}: {}", uid, errno);
            String::new()
        }
    }
}

#[cfg(not(unix))]
pub(crate) fn owner_name(_metadata: &Metadata) -> String {
    String::new()
}
