//! Working-tree scanning: turns a directory on disk into a `Manifest`.

mod errors;
mod ignore;
mod normalize;
mod walk;

pub use errors::{ScanError, ScanErrorCode, ScanResult, ScanWarning};
pub use ignore::IgnoreRules;
pub use normalize::NormalizationReport;
pub use walk::scan;
