//! Domain model for reportcard: grades, reports and the error taxonomy.

pub mod error;
pub mod grade;
pub mod report;

pub use error::{FingerprintError, ReportCardError, Result, WorkspaceError};
pub use grade::Grade;
pub use report::Report;
