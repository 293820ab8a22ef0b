//! Filesystem inventory: walks directory trees or explicit file lists, applies the
//! configured filters and records comparison metadata for every surviving file.
//! Per-entry failures are classified onto the [`ScanResult`] and never abort a scan.

pub mod access;
pub mod filters;
pub mod record;
pub mod result;
pub mod walk;

pub use record::FileRecord;
pub use result::{ScanCounters, ScanResult, SkipCounts};
pub use walk::{ScanSource, Scanner};
