use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::spec::{BucketCopyError, EnumBucketPatternMode, EnumBucketSymlinkStrategy};

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) enum TypeBucketPatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

impl TypeBucketPatternSeq {
    fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Literal(v) => v.iter().any(|p| value.contains(p.as_str())),
            Self::Glob(v) => v.iter().any(|p| p.is_match(value)),
            Self::Regex(v) => v.iter().any(|p| p.is_match(value)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SpecBucketPatterns {
    pub(crate) patterns_include_files: Option<TypeBucketPatternSeq>,
    pub(crate) patterns_exclude_files: Option<TypeBucketPatternSeq>,
    pub(crate) patterns_include_dirs: Option<TypeBucketPatternSeq>,
    pub(crate) patterns_exclude_dirs: Option<TypeBucketPatternSeq>,
}

impl SpecBucketPatterns {
    pub(crate) fn from_raw(
        patterns_include_files: Option<&[String]>,
        patterns_exclude_files: Option<&[String]>,
        patterns_include_dirs: Option<&[String]>,
        patterns_exclude_dirs: Option<&[String]>,
        rule_pattern: EnumBucketPatternMode,
    ) -> Result<Self, BucketCopyError> {
        Ok(Self {
            patterns_include_files: compile_patterns(patterns_include_files, rule_pattern)?,
            patterns_exclude_files: compile_patterns(patterns_exclude_files, rule_pattern)?,
            patterns_include_dirs: compile_patterns(patterns_include_dirs, rule_pattern)?,
            patterns_exclude_dirs: compile_patterns(patterns_exclude_dirs, rule_pattern)?,
        })
    }

    pub(crate) fn has_dir_filters(&self) -> bool {
        self.patterns_include_dirs.is_some() || self.patterns_exclude_dirs.is_some()
    }
}

fn compile_patterns(
    patterns: Option<&[String]>,
    rule_pattern: EnumBucketPatternMode,
) -> Result<Option<TypeBucketPatternSeq>, BucketCopyError> {
    let Some(patterns) = patterns else {
        return Ok(None);
    };
    if patterns.is_empty() {
        return Ok(None);
    }

    match rule_pattern {
        EnumBucketPatternMode::Literal => {
            Ok(Some(TypeBucketPatternSeq::Literal(patterns.to_vec())))
        }
        EnumBucketPatternMode::Glob => {
            let mut l_glob = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let matcher = Glob::new(pattern)
                    .map_err(|e| invalid_pattern(pattern, e))?
                    .compile_matcher();
                l_glob.push(matcher);
            }
            Ok(Some(TypeBucketPatternSeq::Glob(l_glob)))
        }
        EnumBucketPatternMode::Regex => {
            let mut l_regex = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                l_regex.push(Regex::new(pattern).map_err(|e| invalid_pattern(pattern, e))?);
            }
            Ok(Some(TypeBucketPatternSeq::Regex(l_regex)))
        }
    }
}

fn invalid_pattern(pattern: &str, e: impl std::fmt::Display) -> BucketCopyError {
    BucketCopyError::InvalidPattern(format!("Invalid pattern `{pattern}`: {e}"))
}

/// `true` when `value` fails the include list or hits the exclude list.
pub(crate) fn should_exclude_by_patterns(
    value: &str,
    patterns_include: Option<&TypeBucketPatternSeq>,
    patterns_exclude: Option<&TypeBucketPatternSeq>,
) -> bool {
    let b_included = patterns_include.is_none_or(|p| p.is_match(value));
    let b_excluded = patterns_exclude.is_some_and(|p| p.is_match(value));
    !b_included || b_excluded
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region BucketNaming

/// Extension of a file name without the dot.
///
/// Names whose part before the last dot is only dots (`.bashrc`, `..bashrc`)
/// and names ending in a dot have none.
pub(crate) fn derive_extension(name_file: &OsStr) -> Option<&OsStr> {
    let ext = Path::new(name_file)
        .extension()
        .filter(|ext| !ext.is_empty())?;
    let raw_name = name_file.as_encoded_bytes();
    let n_stem = raw_name.len() - ext.len() - 1;
    if raw_name[..n_stem].iter().all(|&b| b == b'.') {
        return None;
    }
    Some(ext)
}

/// Resolve the bucket directory for `name_file` under `path_dir_dst`.
///
/// Returns `(name_bucket, path_dir_bucket)`. Files without extension go to
/// `bucket_no_extension` when set, otherwise to the destination root itself
/// (empty bucket name).
pub(crate) fn derive_bucket(
    name_file: &OsStr,
    path_dir_dst: &Path,
    bucket_no_extension: Option<&str>,
) -> (String, PathBuf) {
    match (derive_extension(name_file), bucket_no_extension) {
        (Some(ext), _) => (ext.to_string_lossy().into_owned(), path_dir_dst.join(ext)),
        (None, Some(name_bucket)) => (name_bucket.to_string(), path_dir_dst.join(name_bucket)),
        (None, None) => (String::new(), path_dir_dst.to_path_buf()),
    }
}

/// A bucket name must be exactly one normal path component.
pub(crate) fn is_valid_bucket_name(name_bucket: &str) -> bool {
    let mut iter_components = Path::new(name_bucket).components();
    matches!(
        (iter_components.next(), iter_components.next()),
        (Some(Component::Normal(part)), None) if part == OsStr::new(name_bucket)
    )
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

/// Error when `path` exists as a symbolic link. Missing paths are fine.
pub(crate) fn validate_not_symlink(path: &Path) -> Result<(), String> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => Err(format!(
            "Unsafe destination path is a symbolic link: {}",
            path.display()
        )),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(format!(
            "Failed to inspect destination path {} ({e})",
            path.display()
        )),
    }
}

pub(crate) fn should_error_broken_symlink(
    path_symlink: &Path,
    rule_symlink: EnumBucketSymlinkStrategy,
) -> bool {
    rule_symlink == EnumBucketSymlinkStrategy::Dereference && !path_symlink.exists()
}

/// Whether both paths resolve to the same file on disk.
pub(crate) fn is_same_file(path_a: &Path, path_b: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;

        match (fs::metadata(path_a), fs::metadata(path_b)) {
            (Ok(meta_a), Ok(meta_b)) => meta_a.dev() == meta_b.dev() && meta_a.ino() == meta_b.ino(),
            _ => false,
        }
    }
    #[cfg(not(unix))]
    {
        match (fs::canonicalize(path_a), fs::canonicalize(path_b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// Copy file bytes, then carry over permissions, timestamps and (Linux) xattrs.
pub(crate) fn copy_file_with_metadata(
    path_file_src: &Path,
    path_file_dst: &Path,
) -> Result<u64, io::Error> {
    use filetime::{FileTime, set_file_times};

    let n_bytes = fs::copy(path_file_src, path_file_dst)?;

    let stat_src = fs::metadata(path_file_src)?;
    fs::set_permissions(path_file_dst, stat_src.permissions())?;
    set_file_times(
        path_file_dst,
        FileTime::from_last_access_time(&stat_src),
        FileTime::from_last_modification_time(&stat_src),
    )?;

    #[cfg(target_os = "linux")]
    copy_xattrs_linux(path_file_src, path_file_dst);

    Ok(n_bytes)
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_file_src: &Path, path_file_dst: &Path) {
    let Ok(iter_xattr_names) = xattr::list(path_file_src) else {
        return;
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_file_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_file_dst, &name, &raw_value) {
            tracing::debug!(
                path = %path_file_dst.display(),
                attr = %name.to_string_lossy(),
                "xattr not copied: {e}"
            );
        }
    }
}

pub(crate) fn is_depth_within_limit(depth_value: usize, depth_limit: Option<usize>) -> bool {
    depth_limit.is_none_or(|limit| depth_value <= limit)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;
    use std::path::{Path, PathBuf};

    use super::{
        SpecBucketPatterns, derive_bucket, derive_extension, is_depth_within_limit,
        is_valid_bucket_name, should_exclude_by_patterns,
    };
    use crate::spec::EnumBucketPatternMode;

    fn ext(name: &str) -> Option<&str> {
        derive_extension(OsStr::new(name)).and_then(OsStr::to_str)
    }

    #[test]
    fn extension_follows_last_dot() {
        assert_eq!(ext("file1.txt"), Some("txt"));
        assert_eq!(ext("archive.tar.gz"), Some("gz"));
        assert_eq!(ext("IMG_0001.JPG"), Some("JPG"));
        assert_eq!(ext("Makefile"), None);
        assert_eq!(ext(".bashrc"), None);
        assert_eq!(ext("..bashrc"), None);
        assert_eq!(ext("...a.b"), Some("b"));
        assert_eq!(ext(".config.json"), Some("json"));
        assert_eq!(ext("trailing."), None);
    }

    #[test]
    fn bucket_for_extensionless_file_defaults_to_root() {
        let dst = Path::new("dist");

        let (name, path) = derive_bucket(OsStr::new("a.csv"), dst, None);
        assert_eq!(name, "csv");
        assert_eq!(path, PathBuf::from("dist/csv"));

        let (name, path) = derive_bucket(OsStr::new("README"), dst, None);
        assert_eq!(name, "");
        assert_eq!(path, PathBuf::from("dist"));

        let (name, path) = derive_bucket(OsStr::new("README"), dst, Some("no_ext"));
        assert_eq!(name, "no_ext");
        assert_eq!(path, PathBuf::from("dist/no_ext"));
    }

    #[test]
    fn bucket_name_must_be_single_component() {
        assert!(is_valid_bucket_name("no_ext"));
        assert!(!is_valid_bucket_name(""));
        assert!(!is_valid_bucket_name("."));
        assert!(!is_valid_bucket_name(".."));
        assert!(!is_valid_bucket_name("a/b"));
        assert!(!is_valid_bucket_name("/abs"));
    }

    #[test]
    fn pattern_filters_combine_include_and_exclude() {
        let include = vec!["*.txt".to_string()];
        let exclude = vec!["skip_*".to_string()];
        let spec_pats = SpecBucketPatterns::from_raw(
            Some(&include),
            Some(&exclude),
            None,
            None,
            EnumBucketPatternMode::Glob,
        )
        .expect("compile");

        let check = |name: &str| {
            should_exclude_by_patterns(
                name,
                spec_pats.patterns_include_files.as_ref(),
                spec_pats.patterns_exclude_files.as_ref(),
            )
        };
        assert!(!check("keep.txt"));
        assert!(check("skip_me.txt"));
        assert!(check("other.csv"));
        assert!(!spec_pats.has_dir_filters());
    }

    #[test]
    fn literal_patterns_match_substrings() {
        let include = vec!["report".to_string()];
        let spec_pats = SpecBucketPatterns::from_raw(
            Some(&include),
            None,
            None,
            None,
            EnumBucketPatternMode::Literal,
        )
        .expect("compile");

        let patterns = spec_pats.patterns_include_files.as_ref();
        assert!(!should_exclude_by_patterns("q1_report.csv", patterns, None));
        assert!(should_exclude_by_patterns("notes.csv", patterns, None));
    }

    #[test]
    fn depth_limit_is_inclusive() {
        assert!(is_depth_within_limit(5, None));
        assert!(is_depth_within_limit(2, Some(2)));
        assert!(!is_depth_within_limit(3, Some(2)));
    }
}
