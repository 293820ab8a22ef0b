use crate::platform::Ownership;

const USER_READ: u32 = 0o400;
const GROUP_READ: u32 = 0o040;
const OTHER_READ: u32 = 0o004;

/// Whether `test_uid`/`test_gid` would be allowed to read an entry with the given
/// mode and ownership. Evaluated purely from the stat result so the answer does not
/// depend on who the scanning process runs as.
pub fn can_read(mode: u32, owner_uid: u32, owner_gid: u32, test_uid: u32, test_gid: u32) -> bool {
    let bit = if test_uid == owner_uid {
        USER_READ
    } else if test_gid == owner_gid {
        GROUP_READ
    } else {
        OTHER_READ
    };
    mode & bit != 0
}

pub fn ownership_allows_read(ownership: &Ownership, test_uid: u32, test_gid: u32) -> bool {
    can_read(
        ownership.mode,
        ownership.uid,
        ownership.gid,
        test_uid,
        test_gid,
    )
}
