pub mod compare;
pub mod config;
pub mod error;
pub mod index;
pub mod platform;
pub mod scanner;
pub mod session;

pub use compare::Checksum;
pub use config::{AppConfig, ScanConfig, ScanOptions};
pub use error::{Error, Result};
pub use index::{CandidateQuery, ComparisonIndex};
pub use scanner::{FileRecord, ScanCounters, ScanResult, Scanner};
pub use session::{CompareOutcome, MatchFlags, Phase, Session};
