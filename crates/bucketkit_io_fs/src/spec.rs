//! Bucketing specification models, event types and top-level error types.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Symlink handling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumBucketSymlinkStrategy {
    /// Follow the link and copy the target bytes/entries.
    Dereference,
    /// Ignore symlink entries.
    SkipSymlinks,
}

/// Existing destination file conflict policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumBucketFileConflictStrategy {
    /// Replace destination file with source file.
    Overwrite,
    /// Keep destination file and skip current source file.
    Skip,
    /// Record an error and skip this file.
    Error,
}

/// Pattern matching mode for include/exclude lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumBucketPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

/// Category of a per-file failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumBucketErrorKind {
    /// The extension bucket directory could not be created.
    BucketInit,
    /// Reading the source or writing the destination failed.
    Copy,
    /// Destination exists and the conflict policy refuses it.
    Conflict,
    /// Destination path is (or passes through) a symbolic link.
    UnsafeDestination,
    /// Source entry could not be inspected.
    Inspect,
    /// Symlink target does not exist.
    BrokenSymlink,
}

impl EnumBucketErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BucketInit => "bucket_init",
            Self::Copy => "copy",
            Self::Conflict => "conflict",
            Self::UnsafeDestination => "unsafe_destination",
            Self::Inspect => "inspect",
            Self::BrokenSymlink => "broken_symlink",
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Input options for `copy_into_buckets`.
#[derive(Debug, Clone)]
pub struct SpecBucketOptions {
    /// Include patterns applied to file basename.
    pub patterns_include_files: Option<Vec<String>>,
    /// Exclude patterns applied to file basename.
    pub patterns_exclude_files: Option<Vec<String>>,
    /// Include patterns applied to directory basename.
    pub patterns_include_dirs: Option<Vec<String>>,
    /// Exclude patterns applied to directory basename.
    pub patterns_exclude_dirs: Option<Vec<String>>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumBucketPatternMode,
    /// Conflict behavior for destination files.
    pub rule_conflict_file: EnumBucketFileConflictStrategy,
    /// Symlink handling behavior.
    pub rule_symlink: EnumBucketSymlinkStrategy,
    /// Ignore files nested deeper than this many levels (source root files are level 1).
    pub depth_limit: Option<usize>,
    /// Bucket for files without extension. `None` places them in the destination root.
    pub bucket_no_extension: Option<String>,
    /// Do not write files; report planned copies instead.
    pub if_dry_run: bool,
}

impl Default for SpecBucketOptions {
    fn default() -> Self {
        Self {
            patterns_include_files: None,
            patterns_exclude_files: None,
            patterns_include_dirs: None,
            patterns_exclude_dirs: None,
            rule_pattern: EnumBucketPatternMode::Glob,
            rule_conflict_file: EnumBucketFileConflictStrategy::Overwrite,
            rule_symlink: EnumBucketSymlinkStrategy::Dereference,
            depth_limit: None,
            bucket_no_extension: None,
            if_dry_run: false,
        }
    }
}

/// One per-file failure with source path, category and error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecBucketError {
    /// Source file that failed.
    pub path: PathBuf,
    /// Failure category.
    pub kind: EnumBucketErrorKind,
    /// User-facing error text.
    pub exception: String,
}

/// One file routed into a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecBucketCopy {
    pub path_file_src: PathBuf,
    /// Bucket directory (destination root for the empty bucket).
    pub path_dir_bucket: PathBuf,
    pub path_file_dst: PathBuf,
    /// Bucket name as reported; empty for the destination root.
    pub name_bucket: String,
}

/// Outcome for one source entry, streamed while the walk runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumBucketEvent {
    Copied(SpecBucketCopy),
    /// Dry-run counterpart of `Copied`.
    Planned(SpecBucketCopy),
    Skipped { path: PathBuf, reason: String },
    Failed(SpecBucketError),
}

impl fmt::Display for EnumBucketEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copied(spec_copy) => write!(
                f,
                "Copied: {} -> {}",
                spec_copy.path_file_src.display(),
                spec_copy.path_dir_bucket.display()
            ),
            Self::Planned(spec_copy) => write!(
                f,
                "Would copy: {} -> {}",
                spec_copy.path_file_src.display(),
                spec_copy.path_dir_bucket.display()
            ),
            Self::Skipped { path, reason } => write!(f, "Skipped: {} ({reason})", path.display()),
            Self::Failed(spec_error) => write!(
                f,
                "Error copying {}: {}",
                spec_error.path.display(),
                spec_error.exception
            ),
        }
    }
}

/// "Top-level call failed" errors (input validation / setup stage).
#[derive(Debug, Error)]
pub enum BucketCopyError {
    /// Invalid depth value.
    #[error("{0}")]
    InvalidDepthLimit(String),
    /// Invalid include/exclude pattern.
    #[error("{0}")]
    InvalidPattern(String),
    /// Bucket name for extensionless files is not a single path component.
    #[error("Invalid bucket name for files without extension: `{0}`")]
    InvalidBucketName(String),
    /// Source path is not a directory.
    #[error("Source is not a directory: {}", .0.display())]
    SourceNotDirectory(PathBuf),
    /// Source and destination resolve to the same directory.
    #[error("Source and destination are the same directory: {}", .0.display())]
    SourceIsDestination(PathBuf),
    /// Destination root initialization failed.
    #[error("Failed to initialize destination {}: {message}", .path.display())]
    DestinationInitFailed { path: PathBuf, message: String },
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{
        BucketCopyError, EnumBucketErrorKind, EnumBucketEvent, SpecBucketCopy, SpecBucketError,
    };

    #[test]
    fn event_lines_match_cli_contract() {
        let spec_copy = SpecBucketCopy {
            path_file_src: PathBuf::from("src/a.txt"),
            path_dir_bucket: PathBuf::from("dist/txt"),
            path_file_dst: PathBuf::from("dist/txt/a.txt"),
            name_bucket: "txt".to_string(),
        };
        assert_eq!(
            EnumBucketEvent::Copied(spec_copy.clone()).to_string(),
            "Copied: src/a.txt -> dist/txt"
        );
        assert_eq!(
            EnumBucketEvent::Planned(spec_copy).to_string(),
            "Would copy: src/a.txt -> dist/txt"
        );

        let event_failed = EnumBucketEvent::Failed(SpecBucketError {
            path: PathBuf::from("src/b.csv"),
            kind: EnumBucketErrorKind::Copy,
            exception: "Permission denied".to_string(),
        });
        assert_eq!(
            event_failed.to_string(),
            "Error copying src/b.csv: Permission denied"
        );
    }

    #[test]
    fn setup_error_messages_name_paths() {
        let err = BucketCopyError::SourceNotDirectory(PathBuf::from("missing"));
        assert_eq!(err.to_string(), "Source is not a directory: missing");

        let err = BucketCopyError::DestinationInitFailed {
            path: PathBuf::from("dist"),
            message: "denied".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to initialize destination dist: denied");
    }
}
