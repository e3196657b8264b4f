//! Bucketing report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

use crate::spec::{EnumBucketEvent, SpecBucketError};

/// Aggregate counters and diagnostics for one `copy_into_buckets` run.
#[derive(Debug, Default, Clone)]
pub struct ReportBucket {
    /// Regular files (and file symlinks) seen within the depth limit.
    pub cnt_scanned: u64,
    /// Scanned files that passed include/exclude filters.
    pub cnt_matched: u64,
    /// Files copied into a bucket.
    pub cnt_copied: u64,
    /// Files planned in dry-run mode.
    pub cnt_planned: u64,
    /// Files skipped by policy.
    pub cnt_skipped: u64,
    /// Copied (or planned) file count per bucket name; `""` is the destination root.
    pub buckets: BTreeMap<String, u64>,
    /// Non-fatal warnings collected during traversal.
    pub warnings: Vec<String>,
    /// Per-file failures.
    pub errors: Vec<SpecBucketError>,
}

impl ReportBucket {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_matched".to_string(), self.cnt_matched);
        dict_counts.insert("cnt_copied".to_string(), self.cnt_copied);
        dict_counts.insert("cnt_planned".to_string(), self.cnt_planned);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_buckets".to_string(), self.buckets.len() as u64);
        dict_counts.insert("cnt_errors".to_string(), self.error_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} scanned={} matched={} copied={} planned={} skipped={} buckets={} errors={} warnings={}",
            dict_counts["cnt_scanned"],
            dict_counts["cnt_matched"],
            dict_counts["cnt_copied"],
            dict_counts["cnt_planned"],
            dict_counts["cnt_skipped"],
            dict_counts["cnt_buckets"],
            dict_counts["cnt_errors"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[BUCKET]"))
    }
}

/// Mutable accumulator for bucketing statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportBucketBuilder {
    report: ReportBucket,
}

impl ReportBucketBuilder {
    pub fn add_scanned(&mut self) {
        self.report.cnt_scanned += 1;
    }

    pub fn add_matched(&mut self) {
        self.report.cnt_matched += 1;
    }

    pub fn add_warning(&mut self, warning: String) {
        self.report.warnings.push(warning);
    }

    /// Fold one per-file outcome into the counters.
    pub fn record(&mut self, event: EnumBucketEvent) {
        match event {
            EnumBucketEvent::Copied(spec_copy) => {
                self.report.cnt_copied += 1;
                *self.report.buckets.entry(spec_copy.name_bucket).or_default() += 1;
            }
            EnumBucketEvent::Planned(spec_copy) => {
                self.report.cnt_planned += 1;
                *self.report.buckets.entry(spec_copy.name_bucket).or_default() += 1;
            }
            EnumBucketEvent::Skipped { .. } => self.report.cnt_skipped += 1,
            EnumBucketEvent::Failed(spec_error) => self.report.errors.push(spec_error),
        }
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportBucket {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{ReportBucket, ReportBucketBuilder};
    use crate::spec::{EnumBucketErrorKind, EnumBucketEvent, SpecBucketCopy, SpecBucketError};

    fn spec_copy(name_file: &str, name_bucket: &str) -> SpecBucketCopy {
        SpecBucketCopy {
            path_file_src: PathBuf::from("src").join(name_file),
            path_dir_bucket: PathBuf::from("dst").join(name_bucket),
            path_file_dst: PathBuf::from("dst").join(name_bucket).join(name_file),
            name_bucket: name_bucket.to_string(),
        }
    }

    #[test]
    fn report_bucket_to_dict_and_format() {
        let report = ReportBucket {
            cnt_scanned: 8,
            cnt_matched: 6,
            cnt_copied: 4,
            cnt_planned: 0,
            cnt_skipped: 1,
            warnings: vec!["w".to_string()],
            ..ReportBucket::default()
        };

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_scanned"], 8);
        assert_eq!(dict_counts["cnt_copied"], 4);
        assert_eq!(dict_counts["cnt_errors"], 0);
        assert_eq!(dict_counts["cnt_warnings"], 1);

        let txt = report.format("[BUCKET]");
        assert_eq!(
            txt,
            "[BUCKET] scanned=8 matched=6 copied=4 planned=0 skipped=1 buckets=0 errors=0 warnings=1"
        );
        assert_eq!(report.to_string(), txt);
    }

    #[test]
    fn builder_folds_events_per_bucket() {
        let mut builder = ReportBucketBuilder::default();
        builder.record(EnumBucketEvent::Copied(spec_copy("a.txt", "txt")));
        builder.record(EnumBucketEvent::Copied(spec_copy("b.txt", "txt")));
        builder.record(EnumBucketEvent::Copied(spec_copy("c.csv", "csv")));
        builder.record(EnumBucketEvent::Skipped {
            path: PathBuf::from("src/link"),
            reason: "symbolic link".to_string(),
        });
        builder.record(EnumBucketEvent::Failed(SpecBucketError {
            path: PathBuf::from("src/d.png"),
            kind: EnumBucketErrorKind::Copy,
            exception: "boom".to_string(),
        }));

        let report = builder.build();
        assert_eq!(report.cnt_copied, 3);
        assert_eq!(report.cnt_skipped, 1);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.buckets["txt"], 2);
        assert_eq!(report.buckets["csv"], 1);
        assert_eq!(report.buckets.len(), 2);
    }
}
