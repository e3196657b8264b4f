//! Command-line arguments and their mapping onto [`SpecBucketOptions`].

use std::path::PathBuf;

use bucketkit_io_fs::{
    EnumBucketFileConflictStrategy, EnumBucketPatternMode, EnumBucketSymlinkStrategy,
    SpecBucketOptions,
};
use clap::{ArgAction, Parser};

const C_DEFAULT_DESTINATION: &str = "dist";

/// Copy every file of a directory tree into one folder per file extension.
#[derive(Debug, Parser)]
#[command(name = "bucketkit", version)]
pub struct Cli {
    /// Directory to scan (recursively)
    pub source: PathBuf,

    /// Directory receiving the extension folders
    #[arg(default_value = C_DEFAULT_DESTINATION)]
    pub destination: PathBuf,

    /// Only copy files whose name matches PATTERN (repeatable)
    #[arg(long = "include", value_name = "PATTERN")]
    pub patterns_include_files: Vec<String>,

    /// Do not copy files whose name matches PATTERN (repeatable)
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub patterns_exclude_files: Vec<String>,

    /// Only descend into directories whose name matches PATTERN (repeatable)
    #[arg(long = "include-dir", value_name = "PATTERN")]
    pub patterns_include_dirs: Vec<String>,

    /// Never descend into directories whose name matches PATTERN (repeatable)
    #[arg(long = "exclude-dir", value_name = "PATTERN")]
    pub patterns_exclude_dirs: Vec<String>,

    /// How patterns are interpreted: glob, regex or literal
    #[arg(long = "pattern-mode", value_name = "MODE", default_value = "glob", value_parser = parse_rule_pattern)]
    pub rule_pattern: EnumBucketPatternMode,

    /// What to do when the destination file exists: overwrite, skip or error
    #[arg(long = "on-conflict", value_name = "POLICY", default_value = "overwrite", value_parser = parse_rule_conflict_file)]
    pub rule_conflict_file: EnumBucketFileConflictStrategy,

    /// Symbolic link handling: dereference or skip
    #[arg(long = "symlinks", value_name = "POLICY", default_value = "dereference", value_parser = parse_rule_symlink)]
    pub rule_symlink: EnumBucketSymlinkStrategy,

    /// Ignore files nested deeper than N levels (files in SOURCE are level 1)
    #[arg(long = "max-depth", value_name = "N")]
    pub depth_limit: Option<usize>,

    /// Folder for files without extension (default: the destination itself)
    #[arg(long = "no-ext-bucket", value_name = "NAME")]
    pub bucket_no_extension: Option<String>,

    /// Print what would be copied without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print a counter summary after the run
    #[arg(long)]
    pub summary: bool,

    /// More log output; also prints skipped files (-vv for trace logs)
    #[arg(short, long, action = ArgAction::Count, conflicts_with = "quiet")]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn to_options(&self) -> SpecBucketOptions {
        SpecBucketOptions {
            patterns_include_files: non_empty(&self.patterns_include_files),
            patterns_exclude_files: non_empty(&self.patterns_exclude_files),
            patterns_include_dirs: non_empty(&self.patterns_include_dirs),
            patterns_exclude_dirs: non_empty(&self.patterns_exclude_dirs),
            rule_pattern: self.rule_pattern,
            rule_conflict_file: self.rule_conflict_file,
            rule_symlink: self.rule_symlink,
            depth_limit: self.depth_limit,
            bucket_no_extension: self.bucket_no_extension.clone(),
            if_dry_run: self.dry_run,
        }
    }
}

fn non_empty(values: &[String]) -> Option<Vec<String>> {
    (!values.is_empty()).then(|| values.to_vec())
}

pub fn parse_rule_pattern(value: &str) -> Result<EnumBucketPatternMode, String> {
    match value {
        "glob" => Ok(EnumBucketPatternMode::Glob),
        "regex" => Ok(EnumBucketPatternMode::Regex),
        "literal" => Ok(EnumBucketPatternMode::Literal),
        _ => Err(format!(
            "Invalid pattern mode: `{value}`. Expected one of: ['glob', 'regex', 'literal']"
        )),
    }
}

pub fn parse_rule_conflict_file(value: &str) -> Result<EnumBucketFileConflictStrategy, String> {
    match value {
        "overwrite" => Ok(EnumBucketFileConflictStrategy::Overwrite),
        "skip" => Ok(EnumBucketFileConflictStrategy::Skip),
        "error" => Ok(EnumBucketFileConflictStrategy::Error),
        _ => Err(format!(
            "Invalid file conflict strategy: `{value}`. Expected one of: ['overwrite', 'skip', 'error']"
        )),
    }
}

pub fn parse_rule_symlink(value: &str) -> Result<EnumBucketSymlinkStrategy, String> {
    match value {
        "dereference" => Ok(EnumBucketSymlinkStrategy::Dereference),
        "skip" => Ok(EnumBucketSymlinkStrategy::SkipSymlinks),
        _ => Err(format!(
            "Invalid symlink strategy: `{value}`. Expected one of: ['dereference', 'skip']"
        )),
    }
}
