//! Owner and group name lookup.

use std::collections::HashMap;
use std::fmt;
use std::os::unix::ffi::OsStrExt;

use uzers::{Groups, Users, UsersCache};

/// Source of user and group names for header `uname`/`gname` fields.
pub trait IdentityLookup {
    /// Name of the user with the given uid, if it has one.
    fn user_name(&self, uid: u32) -> Option<Vec<u8>>;

    /// Name of the group with the given gid, if it has one.
    fn group_name(&self, gid: u32) -> Option<Vec<u8>>;
}

/// Names from the system user and group databases, cached per id.
pub struct SystemIdentities {
    cache: UsersCache,
}

impl SystemIdentities {
    /// Create a lookup with an empty cache.
    pub fn new() -> Self {
        Self {
            cache: UsersCache::new(),
        }
    }
}

impl Default for SystemIdentities {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SystemIdentities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemIdentities").finish_non_exhaustive()
    }
}

impl IdentityLookup for SystemIdentities {
    fn user_name(&self, uid: u32) -> Option<Vec<u8>> {
        self.cache
            .get_user_by_uid(uid)
            .map(|user| user.name().as_bytes().to_vec())
    }

    fn group_name(&self, gid: u32) -> Option<Vec<u8>> {
        self.cache
            .get_group_by_gid(gid)
            .map(|group| group.name().as_bytes().to_vec())
    }
}

/// A fixed table of names, for tests and reproducible archives.
///
/// ```
/// use ustar_archive::{IdentityLookup, StaticIdentities};
///
/// let ids = StaticIdentities::new().with_user(1000, "alice").with_group(100, "users");
/// assert_eq!(ids.user_name(1000).as_deref(), Some(&b"alice"[..]));
/// assert_eq!(ids.group_name(5), None);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticIdentities {
    users: HashMap<u32, Vec<u8>>,
    groups: HashMap<u32, Vec<u8>>,
}

impl StaticIdentities {
    /// An empty table; every lookup fails.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user name.
    #[must_use]
    pub fn with_user(mut self, uid: u32, name: impl AsRef<[u8]>) -> Self {
        self.users.insert(uid, name.as_ref().to_vec());
        self
    }

    /// Add a group name.
    #[must_use]
    pub fn with_group(mut self, gid: u32, name: impl AsRef<[u8]>) -> Self {
        self.groups.insert(gid, name.as_ref().to_vec());
        self
    }
}

impl IdentityLookup for StaticIdentities {
    fn user_name(&self, uid: u32) -> Option<Vec<u8>> {
        self.users.get(&uid).cloned()
    }

    fn group_name(&self, gid: u32) -> Option<Vec<u8>> {
        self.groups.get(&gid).cloned()
    }
}

impl<T: IdentityLookup + ?Sized> IdentityLookup for &T {
    fn user_name(&self, uid: u32) -> Option<Vec<u8>> {
        (**self).user_name(uid)
    }

    fn group_name(&self, gid: u32) -> Option<Vec<u8>> {
        (**self).group_name(gid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_lookup() {
        let ids = StaticIdentities::new().with_user(0, "root").with_group(0, "wheel");
        assert_eq!(ids.user_name(0), Some(b"root".to_vec()));
        assert_eq!(ids.group_name(0), Some(b"wheel".to_vec()));
        assert_eq!(ids.user_name(1), None);
    }

    #[test]
    fn test_system_lookup_root() {
        // uid 0 is named on any system these tests run on.
        let ids = SystemIdentities::new();
        assert!(ids.user_name(0).is_some_and(|name| !name.is_empty()));
    }
}
