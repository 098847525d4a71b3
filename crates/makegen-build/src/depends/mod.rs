//! Dependency tracking between builds
//!
//! Each object (and each target) owns a pair of files next to it in the
//! binary directory:
//! - `<owner>.depends.make`, the record listing `<owner>: <dependee>` lines
//!   that the generated makefiles include
//! - `<owner>.depends`, the mark file whose timestamp tells make the record
//!   is current
//!
//! The scanner writes both after a scan. The checker validates a record
//! against the filesystem before the generated rules are trusted again.

pub mod checker;
pub mod record;
pub mod scanner;

pub use checker::{CheckOutcome, DependencyIntegrityChecker};
pub use record::{mark_file_name, record_file_name, DependencyRecord};
pub use scanner::{scan_all, DependencyScanner, ScanRequest};
