#![forbid(unsafe_code)]
//! # tweet_compare CLI
//!
//! Command-line interface for the `tweet_compare` crate. It loads two
//! archives, prints a summary of each author's vocabulary and the words that
//! set them apart, and exports the tables.
//!
//! ## Example
//! ```bash
//! cargo run --release -- --author david=data/david --author julia=data/julia.csv \
//!     --since 2016-01-01 --until 2017-01-01 --export-format csv
//! ```
//!
//! See `--help` for all available options.

use std::path::PathBuf;
use std::process;

use chrono::NaiveDate;
use clap::Parser;
use log::{error, warn};
use tweet_compare::{
    AnalysisOptions, Author, Bucket, DEFAULT_MIN_SUPPORT, ExportFormat, analyze_archives,
    parse_author_spec,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Archive to compare as NAME=PATH (a CSV file or a directory of CSV
    /// files). Give exactly two; the first one is the log-odds numerator.
    #[arg(long = "author", value_name = "NAME=PATH", value_parser = author_arg, required = true)]
    authors: Vec<(Author, PathBuf)>,

    /// Optional path to additional stopword file (.txt, one word per line)
    #[arg(long)]
    stopwords: Option<PathBuf>,

    /// Do not start from the built-in English stopword list
    #[arg(long, default_value_t = false)]
    no_default_stopwords: bool,

    /// Minimum combined count for a word to be ranked
    #[arg(long, default_value_t = DEFAULT_MIN_SUPPORT)]
    min_support: u64,

    /// Keep @mentions in the log-odds ranking
    #[arg(long, default_value_t = false)]
    keep_mentions: bool,

    /// Distinctive words listed per author in the summary
    #[arg(long, default_value_t = 15)]
    top: usize,

    /// Output format for export (txt, csv, tsv, json)
    #[arg(long, default_value = "txt")]
    export_format: ExportFormat,

    /// Directory the exports are written to
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Timeline bucket width (day, week, month)
    #[arg(long, default_value = "month")]
    bucket: Bucket,

    /// Only use posts on or after this date (YYYY-MM-DD)
    #[arg(long)]
    since: Option<NaiveDate>,

    /// Only use posts before this date (YYYY-MM-DD)
    #[arg(long)]
    until: Option<NaiveDate>,

    /// Drop posts that start with a standalone "RT" marker
    #[arg(long, default_value_t = false)]
    exclude_retweets: bool,
}

fn author_arg(s: &str) -> Result<(Author, PathBuf), String> {
    parse_author_spec(s).map_err(|e| e.to_string())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let opts = AnalysisOptions {
        export_format: cli.export_format,
        out_dir: cli.out_dir,
        default_stopwords: !cli.no_default_stopwords,
        min_support: cli.min_support,
        drop_mentions: !cli.keep_mentions,
        top_k: cli.top,
        bucket: cli.bucket,
        since: cli.since,
        until: cli.until,
        exclude_retweets: cli.exclude_retweets,
    };

    match analyze_archives(&cli.authors, cli.stopwords.as_deref(), &opts) {
        Ok(report) => {
            println!("{}", report.summary);
            if report.skipped_records > 0 {
                warn!("Skipped {} malformed archive rows", report.skipped_records);
            }
            for path in &report.written {
                println!("Wrote {}", path.display());
            }
        }
        Err(e) => {
            error!("Error: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
