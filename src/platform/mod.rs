use std::fs::Metadata;
use std::time::SystemTime;

/// Permission bits and ownership of a stat'ed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

#[cfg(unix)]
pub fn ownership(metadata: &Metadata) -> Ownership {
    use std::os::unix::fs::MetadataExt;
    Ownership {
        mode: metadata.mode(),
        uid: metadata.uid(),
        gid: metadata.gid(),
    }
}

/// Without unix ownership we report everything as owned by uid/gid 0 and derive
/// the read bits from the readonly flag, which always grants read.
#[cfg(not(unix))]
pub fn ownership(metadata: &Metadata) -> Ownership {
    let mode = if metadata.permissions().readonly() {
        0o444
    } else {
        0o666
    };
    Ownership {
        mode,
        uid: 0,
        gid: 0,
    }
}

/// Creation time where the filesystem records one, otherwise the inode change time.
#[cfg(unix)]
pub fn creation_time(metadata: &Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;
    use std::time::Duration;

    metadata.created().ok().or_else(|| {
        let secs = u64::try_from(metadata.ctime()).ok()?;
        let nanos = u32::try_from(metadata.ctime_nsec()).ok()?;
        SystemTime::UNIX_EPOCH.checked_add(Duration::new(secs, nanos))
    })
}

#[cfg(not(unix))]
pub fn creation_time(metadata: &Metadata) -> Option<SystemTime> {
    metadata.created().ok()
}

#[cfg(unix)]
pub fn effective_uid() -> u32 {
    unsafe { libc::geteuid() }
}

#[cfg(unix)]
pub fn effective_gid() -> u32 {
    unsafe { libc::getegid() }
}

#[cfg(not(unix))]
pub fn effective_uid() -> u32 {
    0
}

#[cfg(not(unix))]
pub fn effective_gid() -> u32 {
    0
}
