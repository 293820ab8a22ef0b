use crate::platform::{self, Ownership};
use chrono::{DateTime, Utc};
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// One physical file observed during a scan, with the attributes used for
/// candidate narrowing and access control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
    pub name: String,
    /// Extension without the leading dot, empty when the name has none.
    pub file_type: String,
    /// Name of the containing directory (last component only).
    pub parent: String,
    pub rel_path: PathBuf,
    /// Advisory; see [`platform::creation_time`].
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub is_dir: bool,
    pub is_symlink: bool,
}

impl FileRecord {
    /// Stat `path` without following symlinks and build its record. `root` is the
    /// directory `rel_path` is computed against.
    pub fn from_path(path: &Path, root: &Path) -> io::Result<Self> {
        let metadata = fs::symlink_metadata(path)?;
        Ok(Self::from_metadata(path, root, &metadata))
    }

    /// Build a record from an lstat result already in hand.
    pub fn from_metadata(path: &Path, root: &Path, metadata: &Metadata) -> Self {
        let Ownership { mode, uid, gid } = platform::ownership(metadata);

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let file_type = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();

        let parent = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();

        let rel_path = path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| PathBuf::from(&name));

        let created = platform::creation_time(metadata).unwrap_or(UNIX_EPOCH);
        let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
        let file_type_info = metadata.file_type();

        Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            name,
            file_type,
            parent,
            rel_path,
            created: DateTime::<Utc>::from(created),
            modified: DateTime::<Utc>::from(modified),
            mode,
            uid,
            gid,
            is_dir: file_type_info.is_dir(),
            is_symlink: file_type_info.is_symlink(),
        }
    }
}
