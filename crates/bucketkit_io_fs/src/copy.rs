//! Source tree traversal and extension-bucket copy orchestration.

use std::collections::{HashMap, HashSet};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::report::{ReportBucket, ReportBucketBuilder};
use crate::spec::{
    BucketCopyError, EnumBucketErrorKind, EnumBucketEvent, EnumBucketFileConflictStrategy,
    EnumBucketSymlinkStrategy, SpecBucketCopy, SpecBucketError, SpecBucketOptions,
};
use crate::util::{
    SpecBucketPatterns, copy_file_with_metadata, derive_bucket, is_depth_within_limit,
    is_same_file, is_valid_bucket_name, should_error_broken_symlink, should_exclude_by_patterns,
    validate_not_symlink,
};

#[derive(Debug, Clone)]
struct SpecDirEntry {
    path_dir_src_sub: PathBuf,
    name_dir: String,
    if_is_symlink: bool,
}

#[derive(Debug, Clone)]
struct SpecFileEntry {
    path_file_src: PathBuf,
    name_file: OsString,
    if_is_symlink: bool,
}

#[derive(Debug, Clone)]
enum EnumBucketState {
    Ready,
    Failed(String),
}

struct SpecBucketContext<'a> {
    path_dir_dst: PathBuf,
    /// Canonical destination root when it lies inside the source tree.
    path_dir_dst_in_src: Option<PathBuf>,
    spec_bk_options: SpecBucketOptions,
    spec_bk_pats: SpecBucketPatterns,
    builder_bk_report: ReportBucketBuilder,
    set_visited_dirs: HashSet<(u64, u64)>,
    dict_buckets: HashMap<PathBuf, EnumBucketState>,
    on_event: &'a mut dyn FnMut(&EnumBucketEvent),
}

impl SpecBucketContext<'_> {
    fn emit(&mut self, event: EnumBucketEvent) {
        match &event {
            EnumBucketEvent::Copied(spec_copy) => debug!(
                src = %spec_copy.path_file_src.display(),
                bucket = %spec_copy.name_bucket,
                "copied"
            ),
            EnumBucketEvent::Planned(spec_copy) => debug!(
                src = %spec_copy.path_file_src.display(),
                bucket = %spec_copy.name_bucket,
                "planned"
            ),
            EnumBucketEvent::Skipped { path, reason } => {
                debug!(src = %path.display(), "skipped: {reason}")
            }
            EnumBucketEvent::Failed(spec_error) => warn!(
                src = %spec_error.path.display(),
                kind = spec_error.kind.as_str(),
                "{}",
                spec_error.exception
            ),
        }
        (self.on_event)(&event);
        self.builder_bk_report.record(event);
    }

    fn fail(&mut self, path: PathBuf, kind: EnumBucketErrorKind, exception: String) {
        self.emit(EnumBucketEvent::Failed(SpecBucketError {
            path,
            kind,
            exception,
        }));
    }

    fn skip(&mut self, path: PathBuf, reason: &str) {
        self.emit(EnumBucketEvent::Skipped {
            path,
            reason: reason.to_string(),
        });
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.builder_bk_report.add_warning(message);
    }
}

/// Copy every regular file under `dir_source` into per-extension buckets
/// under `dir_destination`.
///
/// See [`copy_into_buckets_with`] for details.
pub fn copy_into_buckets<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_bk_options: SpecBucketOptions,
) -> Result<ReportBucket, BucketCopyError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    copy_into_buckets_with(dir_source, dir_destination, spec_bk_options, |_| {})
}

/// Copy every regular file under `dir_source` into per-extension buckets
/// under `dir_destination`, streaming each per-file outcome to `on_event`.
///
/// The tree is flattened: `src/a.txt` and `src/sub/b.txt` both land in
/// `dst/txt/`. Buckets are created on first use. Behavior is further shaped by
/// [`SpecBucketOptions`]:
/// - include/exclude pattern rules for files and directories,
/// - conflict policy for existing destination files (overwrite by default),
/// - symlink handling strategy,
/// - optional depth limiting,
/// - bucket for extensionless files,
/// - dry-run.
///
/// Returns [`ReportBucket`] when the walk completes, with per-file failures
/// stored in the report. Returns [`BucketCopyError`] only for setup and
/// validation failures, before any file is copied.
pub fn copy_into_buckets_with<P, Q, F>(
    dir_source: P,
    dir_destination: Q,
    spec_bk_options: SpecBucketOptions,
    mut on_event: F,
) -> Result<ReportBucket, BucketCopyError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    F: FnMut(&EnumBucketEvent),
{
    if spec_bk_options.depth_limit == Some(0) {
        return Err(BucketCopyError::InvalidDepthLimit(
            "Arg `depth_limit` must be >= 1 or None.".to_string(),
        ));
    }
    if let Some(name_bucket) = spec_bk_options.bucket_no_extension.as_deref()
        && !is_valid_bucket_name(name_bucket)
    {
        return Err(BucketCopyError::InvalidBucketName(name_bucket.to_string()));
    }

    let path_dir_src = dir_source.as_ref().to_path_buf();
    let path_dir_dst = dir_destination.as_ref().to_path_buf();

    if !path_dir_src.is_dir() {
        return Err(BucketCopyError::SourceNotDirectory(path_dir_src));
    }
    let spec_bk_pats = SpecBucketPatterns::from_raw(
        spec_bk_options.patterns_include_files.as_deref(),
        spec_bk_options.patterns_exclude_files.as_deref(),
        spec_bk_options.patterns_include_dirs.as_deref(),
        spec_bk_options.patterns_exclude_dirs.as_deref(),
        spec_bk_options.rule_pattern,
    )?;

    let init_failed = |message: String| BucketCopyError::DestinationInitFailed {
        path: path_dir_dst.clone(),
        message,
    };
    fs::create_dir_all(&path_dir_dst).map_err(|e| init_failed(e.to_string()))?;
    let meta_dir_dst =
        fs::symlink_metadata(&path_dir_dst).map_err(|e| init_failed(e.to_string()))?;
    if meta_dir_dst.file_type().is_symlink() {
        return Err(init_failed(
            "Destination root path must not be a symbolic link.".to_string(),
        ));
    }

    let path_dir_src_real = fs::canonicalize(&path_dir_src)
        .map_err(|_| BucketCopyError::SourceNotDirectory(path_dir_src.clone()))?;
    let path_dir_dst_real =
        fs::canonicalize(&path_dir_dst).map_err(|e| init_failed(e.to_string()))?;
    if path_dir_src_real == path_dir_dst_real {
        return Err(BucketCopyError::SourceIsDestination(path_dir_src));
    }
    let path_dir_dst_in_src = path_dir_dst_real
        .starts_with(&path_dir_src_real)
        .then_some(path_dir_dst_real);

    info!(
        src = %path_dir_src.display(),
        dst = %path_dir_dst.display(),
        dry_run = spec_bk_options.if_dry_run,
        "bucketing files by extension"
    );

    let mut dict_buckets = HashMap::new();
    dict_buckets.insert(path_dir_dst.clone(), EnumBucketState::Ready);

    let mut spec_bk_ctx = SpecBucketContext {
        path_dir_dst,
        path_dir_dst_in_src,
        spec_bk_options,
        spec_bk_pats,
        builder_bk_report: ReportBucketBuilder::default(),
        set_visited_dirs: HashSet::new(),
        dict_buckets,
        on_event: &mut on_event,
    };

    walk_directory(&path_dir_src, 0, &mut spec_bk_ctx);

    let report = spec_bk_ctx.builder_bk_report.build();
    info!("{report}");
    Ok(report)
}

fn walk_directory(path_root: &Path, n_depth_relative: usize, spec_bk_ctx: &mut SpecBucketContext) {
    if spec_bk_ctx.spec_bk_options.rule_symlink == EnumBucketSymlinkStrategy::Dereference {
        match fs::metadata(path_root) {
            #[cfg(unix)]
            Ok(stat_root) => {
                use std::os::unix::fs::MetadataExt;
                if !spec_bk_ctx
                    .set_visited_dirs
                    .insert((stat_root.dev(), stat_root.ino()))
                {
                    spec_bk_ctx.warn(format!(
                        "Directory already visited (symlink loop): {}",
                        path_root.display()
                    ));
                    return;
                }
            }
            #[cfg(not(unix))]
            Ok(_) => {}
            Err(e) => {
                spec_bk_ctx.warn(format!(
                    "Failed to stat directory {} ({e})",
                    path_root.display()
                ));
                return;
            }
        }
    }

    let iter_entries = match fs::read_dir(path_root) {
        Ok(iter) => iter,
        Err(e) => {
            spec_bk_ctx.warn(format!(
                "Failed to read directory {} ({e})",
                path_root.display()
            ));
            return;
        }
    };

    let mut l_dirs: Vec<SpecDirEntry> = Vec::new();
    let mut l_files: Vec<SpecFileEntry> = Vec::new();

    for entry_res in iter_entries {
        let entry = match entry_res {
            Ok(v) => v,
            Err(e) => {
                spec_bk_ctx.warn(format!(
                    "Failed to read directory entry under {} ({e})",
                    path_root.display()
                ));
                continue;
            }
        };

        let path_entry = entry.path();
        let cfg_file_type = match entry.file_type() {
            Ok(v) => v,
            Err(e) => {
                spec_bk_ctx.warn(format!("Failed to inspect {} ({e})", path_entry.display()));
                continue;
            }
        };

        let b_is_symlink = cfg_file_type.is_symlink();
        if cfg_file_type.is_dir() || (b_is_symlink && path_entry.is_dir()) {
            l_dirs.push(SpecDirEntry {
                path_dir_src_sub: path_entry,
                name_dir: entry.file_name().to_string_lossy().into_owned(),
                if_is_symlink: b_is_symlink,
            });
        } else if cfg_file_type.is_file() || b_is_symlink {
            l_files.push(SpecFileEntry {
                path_file_src: path_entry,
                name_file: entry.file_name(),
                if_is_symlink: b_is_symlink,
            });
        } else {
            spec_bk_ctx.warn(format!("Special file skipped: {}", path_entry.display()));
        }
    }

    l_dirs.sort_by(|a, b| a.name_dir.cmp(&b.name_dir));
    l_files.sort_by(|a, b| a.name_file.cmp(&b.name_file));

    if spec_bk_ctx.spec_bk_pats.has_dir_filters() {
        let spec_bk_pats = &spec_bk_ctx.spec_bk_pats;
        l_dirs.retain(|d| {
            !should_exclude_by_patterns(
                &d.name_dir,
                spec_bk_pats.patterns_include_dirs.as_ref(),
                spec_bk_pats.patterns_exclude_dirs.as_ref(),
            )
        });
    }

    // Files one level further down would exceed the limit.
    if spec_bk_ctx
        .spec_bk_options
        .depth_limit
        .is_some_and(|n| n_depth_relative + 1 >= n)
    {
        l_dirs.clear();
    }

    for dir_entry in l_dirs {
        if dir_entry.if_is_symlink
            && spec_bk_ctx.spec_bk_options.rule_symlink == EnumBucketSymlinkStrategy::SkipSymlinks
        {
            debug!(path = %dir_entry.path_dir_src_sub.display(), "symlinked directory skipped");
            continue;
        }
        if let Some(path_dst_real) = spec_bk_ctx.path_dir_dst_in_src.as_ref()
            && fs::canonicalize(&dir_entry.path_dir_src_sub).is_ok_and(|p| p == *path_dst_real)
        {
            spec_bk_ctx.warn(format!(
                "Destination directory inside source skipped: {}",
                dir_entry.path_dir_src_sub.display()
            ));
            continue;
        }
        walk_directory(&dir_entry.path_dir_src_sub, n_depth_relative + 1, spec_bk_ctx);
    }

    for file_entry in l_files {
        handle_file_entry(file_entry, n_depth_relative + 1, spec_bk_ctx);
    }
}

fn handle_file_entry(
    spec_file_entry: SpecFileEntry,
    depth_value: usize,
    spec_bk_ctx: &mut SpecBucketContext,
) {
    if !is_depth_within_limit(depth_value, spec_bk_ctx.spec_bk_options.depth_limit) {
        return;
    }
    spec_bk_ctx.builder_bk_report.add_scanned();

    if should_exclude_by_patterns(
        &spec_file_entry.name_file.to_string_lossy(),
        spec_bk_ctx.spec_bk_pats.patterns_include_files.as_ref(),
        spec_bk_ctx.spec_bk_pats.patterns_exclude_files.as_ref(),
    ) {
        return;
    }
    spec_bk_ctx.builder_bk_report.add_matched();

    let SpecFileEntry {
        path_file_src,
        name_file,
        if_is_symlink,
    } = spec_file_entry;

    let enum_rule_symlink = spec_bk_ctx.spec_bk_options.rule_symlink;
    if if_is_symlink {
        if enum_rule_symlink == EnumBucketSymlinkStrategy::SkipSymlinks {
            spec_bk_ctx.skip(path_file_src, "symbolic link");
            return;
        }
        if should_error_broken_symlink(&path_file_src, enum_rule_symlink) {
            let message = format!("Broken symlink: {}", path_file_src.display());
            spec_bk_ctx.fail(path_file_src, EnumBucketErrorKind::BrokenSymlink, message);
            return;
        }
    }

    // Follows links; symlinks to devices or sockets are not copied.
    let meta_file_src = match fs::metadata(&path_file_src) {
        Ok(v) => v,
        Err(e) => {
            spec_bk_ctx.fail(path_file_src, EnumBucketErrorKind::Inspect, e.to_string());
            return;
        }
    };
    if !meta_file_src.is_file() {
        spec_bk_ctx.warn(format!(
            "Special file target skipped: {}",
            path_file_src.display()
        ));
        spec_bk_ctx.skip(path_file_src, "not a regular file");
        return;
    }

    let (name_bucket, path_dir_bucket) = derive_bucket(
        &name_file,
        &spec_bk_ctx.path_dir_dst,
        spec_bk_ctx.spec_bk_options.bucket_no_extension.as_deref(),
    );
    let path_file_dst = path_dir_bucket.join(&name_file);
    let if_dry_run = spec_bk_ctx.spec_bk_options.if_dry_run;

    if !if_dry_run && let Err(message) = ensure_bucket(&path_dir_bucket, spec_bk_ctx) {
        spec_bk_ctx.fail(path_file_src, EnumBucketErrorKind::BucketInit, message);
        return;
    }
    if let Err(message) = validate_not_symlink(&path_file_dst) {
        spec_bk_ctx.fail(path_file_src, EnumBucketErrorKind::UnsafeDestination, message);
        return;
    }
    if let Some(event) = check_file_conflict(
        &path_file_src,
        &path_file_dst,
        spec_bk_ctx.spec_bk_options.rule_conflict_file,
    ) {
        spec_bk_ctx.emit(event);
        return;
    }

    let spec_copy = SpecBucketCopy {
        path_file_src,
        path_dir_bucket,
        path_file_dst,
        name_bucket,
    };
    if if_dry_run {
        spec_bk_ctx.emit(EnumBucketEvent::Planned(spec_copy));
        return;
    }

    match copy_file_with_metadata(&spec_copy.path_file_src, &spec_copy.path_file_dst) {
        Ok(_) => spec_bk_ctx.emit(EnumBucketEvent::Copied(spec_copy)),
        Err(e) => spec_bk_ctx.fail(
            spec_copy.path_file_src,
            EnumBucketErrorKind::Copy,
            e.to_string(),
        ),
    }
}

/// Create the bucket directory once per run. A failed bucket stays failed.
fn ensure_bucket(
    path_dir_bucket: &Path,
    spec_bk_ctx: &mut SpecBucketContext,
) -> Result<(), String> {
    if let Some(enum_state) = spec_bk_ctx.dict_buckets.get(path_dir_bucket) {
        return match enum_state {
            EnumBucketState::Ready => Ok(()),
            EnumBucketState::Failed(message) => Err(message.clone()),
        };
    }

    let res_bucket = validate_not_symlink(path_dir_bucket).and_then(|_| {
        fs::create_dir_all(path_dir_bucket).map_err(|e| {
            format!(
                "Failed to create bucket {} ({e})",
                path_dir_bucket.display()
            )
        })
    });
    let enum_state = match &res_bucket {
        Ok(()) => {
            debug!(bucket = %path_dir_bucket.display(), "bucket ready");
            EnumBucketState::Ready
        }
        Err(message) => {
            warn!(bucket = %path_dir_bucket.display(), "{message}");
            EnumBucketState::Failed(message.clone())
        }
    };
    spec_bk_ctx
        .dict_buckets
        .insert(path_dir_bucket.to_path_buf(), enum_state);
    res_bucket
}

/// `Some(event)` when an existing destination stops this copy.
fn check_file_conflict(
    path_file_src: &Path,
    path_file_dst: &Path,
    rule_conflict: EnumBucketFileConflictStrategy,
) -> Option<EnumBucketEvent> {
    let failed = |kind: EnumBucketErrorKind, exception: String| {
        Some(EnumBucketEvent::Failed(SpecBucketError {
            path: path_file_src.to_path_buf(),
            kind,
            exception,
        }))
    };

    let Ok(meta_dst) = fs::symlink_metadata(path_file_dst) else {
        return None;
    };
    if meta_dst.is_dir() {
        return failed(
            EnumBucketErrorKind::Conflict,
            format!("Destination is a directory: {}", path_file_dst.display()),
        );
    }
    if is_same_file(path_file_src, path_file_dst) {
        return failed(
            EnumBucketErrorKind::Copy,
            format!(
                "Source and destination are the same file: {}",
                path_file_dst.display()
            ),
        );
    }

    match rule_conflict {
        EnumBucketFileConflictStrategy::Overwrite => None,
        EnumBucketFileConflictStrategy::Skip => Some(EnumBucketEvent::Skipped {
            path: path_file_src.to_path_buf(),
            reason: "destination exists".to_string(),
        }),
        EnumBucketFileConflictStrategy::Error => failed(
            EnumBucketErrorKind::Conflict,
            format!("Destination exists: {}", path_file_dst.display()),
        ),
    }
}
