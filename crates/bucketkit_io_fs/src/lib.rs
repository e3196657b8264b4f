//! `bucketkit_io_fs` v1:
//! Rust-side engine that copies a source tree into per-extension buckets.
//!
//! Modules:
//! - `copy`   : traversal and bucket copy orchestration
//! - `spec`   : enums/options/events/errors
//! - `report` : run-time report model
//! - `util`   : shared helper functions

pub mod copy;
pub mod report;
pub mod spec;
mod util;

pub use copy::{copy_into_buckets, copy_into_buckets_with};
pub use report::{ReportBucket, ReportBucketBuilder};
pub use spec::{
    BucketCopyError, EnumBucketErrorKind, EnumBucketEvent, EnumBucketFileConflictStrategy,
    EnumBucketPatternMode, EnumBucketSymlinkStrategy, SpecBucketCopy, SpecBucketError,
    SpecBucketOptions,
};
