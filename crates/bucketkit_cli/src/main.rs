//! `bucketkit`: copy a directory tree into one folder per file extension.

mod args;
mod logging;

use std::process::ExitCode;

use bucketkit_io_fs::{BucketCopyError, EnumBucketEvent, ReportBucket, copy_into_buckets_with};
use clap::Parser;

use crate::args::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(report) => {
            if cli.summary {
                println!("{report}");
            }
            // Per-file failures were already printed; they do not change the exit code.
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ReportBucket, BucketCopyError> {
    let b_show_skipped = cli.verbose > 0;
    copy_into_buckets_with(&cli.source, &cli.destination, cli.to_options(), |event| {
        if should_print_event(event, b_show_skipped) {
            println!("{event}");
        }
    })
}

fn should_print_event(event: &EnumBucketEvent, b_show_skipped: bool) -> bool {
    b_show_skipped || !matches!(event, EnumBucketEvent::Skipped { .. })
}
