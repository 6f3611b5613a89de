//! Community coordinate corrections: validation against tambon boundaries,
//! application to the unit dataset, and audit reporting.

pub mod apply;
pub mod backup;
pub mod boundary;
pub mod clean;
pub mod report;
pub mod validate;

pub use apply::{
    apply_corrections, load_corrections, parse_corrections, AppliedCorrection, Correction,
    CorrectionOutcome, SkippedCorrection, CORRECTION_SOURCE,
};
pub use backup::create_backup;
pub use boundary::BoundaryIndex;
pub use clean::{clean_corrections, CleanSummary, PII_COLUMN};
pub use report::{tier_counts, CorrectionReport, InputFiles};
pub use validate::{validate_coordinate, within_thailand, Validation};
