//! # tweet_compare
//!
//! Comparative word statistics for two personal post archives.
//!
//! The pipeline runs in three steps:
//! 1. [`Tokenizer`] turns each post into lowercase words, `#hashtags` and
//!    `@mentions`, dropping links, entity escapes, `RT` markers, stop words and
//!    tokens without a letter.
//! 2. [`FrequencyTable`] counts every author's tokens.
//! 3. [`Ranker`] ranks the shared vocabulary by smoothed log-odds ratio.
//!
//! [`analyze_archives`] runs all of it from CSV archives on disk and writes
//! the tables in the chosen [`ExportFormat`].

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::info;

pub mod archive;
pub mod compare;
mod error;
pub mod export;
pub mod frequency;
pub mod timeline;
pub mod tokenize;

pub use archive::{Archive, Author, Corpus, Record, parse_author_spec};
pub use compare::{
    AuthorTokens, ComparisonEntry, ComparisonTable, DEFAULT_MIN_SUPPORT, Distinctive, Ranker,
    RankerConfig, SortOrder,
};
pub use error::{Error, Result};
pub use export::{ExportFormat, Exporter, csv_safe_cell, render_summary};
pub use frequency::{FrequencyEntry, FrequencyTable, PairedFrequency, paired};
pub use timeline::{Bucket, TimelineRow, timeline};
pub use tokenize::{StopWords, Token, TokenKind, TokenStream, Tokenizer};

/// Settings shared by the library entry points and the CLI.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub export_format: ExportFormat,
    pub out_dir: PathBuf,
    /// Start from the built-in English stop word list.
    pub default_stopwords: bool,
    pub min_support: u64,
    pub drop_mentions: bool,
    /// Distinctive and neutral words listed per section of the summary.
    pub top_k: usize,
    pub bucket: Bucket,
    /// Inclusive lower bound on the record date.
    pub since: Option<NaiveDate>,
    /// Exclusive upper bound on the record date.
    pub until: Option<NaiveDate>,
    pub exclude_retweets: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            export_format: ExportFormat::Txt,
            out_dir: PathBuf::from("."),
            default_stopwords: true,
            min_support: DEFAULT_MIN_SUPPORT,
            drop_mentions: true,
            top_k: 15,
            bucket: Bucket::Month,
            since: None,
            until: None,
            exclude_retweets: false,
        }
    }
}

impl AnalysisOptions {
    pub fn ranker_config(&self) -> RankerConfig {
        RankerConfig {
            min_support: self.min_support,
            drop_mentions: self.drop_mentions,
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    /// One table per author, in input order.
    pub frequency_tables: Vec<FrequencyTable>,
    pub comparison: ComparisonTable,
    /// Tokens used by both authors with each author's relative frequency.
    pub paired: Vec<PairedFrequency>,
    pub timeline: Vec<TimelineRow>,
    pub summary: String,
    /// Archive rows whose CSV structure was broken.
    pub skipped_records: usize,
    pub written: Vec<PathBuf>,
}

/// Builds the tokenizer described by `opts`, adding words from an optional
/// stop word file (one per line).
pub fn build_tokenizer(stopwords: Option<&Path>, opts: &AnalysisOptions) -> Result<Tokenizer> {
    let mut stop = if opts.default_stopwords {
        StopWords::english()
    } else {
        StopWords::empty()
    };
    if let Some(path) = stopwords {
        let added = stop.extend_from_file(path)?;
        info!("Added {} stop words from {}", added, path.display());
    }
    Ok(Tokenizer::new(stop))
}

/// Loads the archives, runs the full comparison and writes the results.
pub fn analyze_archives(
    sources: &[(Author, PathBuf)],
    stopwords: Option<&Path>,
    opts: &AnalysisOptions,
) -> Result<AnalysisReport> {
    let tokenizer = build_tokenizer(stopwords, opts)?;
    let corpus = Corpus::load(sources)?;
    analyze_corpus(&corpus, &tokenizer, opts)
}

/// Runs the comparison on an in-memory corpus of exactly two archives. The
/// first archive's author is the log-odds numerator.
pub fn analyze_corpus(
    corpus: &Corpus,
    tokenizer: &Tokenizer,
    opts: &AnalysisOptions,
) -> Result<AnalysisReport> {
    let corpus = corpus.filtered(opts.since, opts.until, opts.exclude_retweets);

    let streams: Vec<AuthorTokens> = corpus
        .archives
        .iter()
        .map(|a| {
            AuthorTokens::new(
                a.author.clone(),
                frequency::tokenize_records(tokenizer, &a.records),
            )
        })
        .collect();

    let comparison = Ranker::new(opts.ranker_config()).rank(&streams)?;

    let frequency_tables: Vec<FrequencyTable> = streams
        .iter()
        .map(|s| {
            FrequencyTable::from_counts(s.author.clone(), frequency::par_count_tokens(&s.tokens))
        })
        .collect();
    if frequency_tables.iter().all(FrequencyTable::is_empty) {
        return Err(Error::EmptyCorpus);
    }
    for t in &frequency_tables {
        info!("{}: {} tokens, {} distinct", t.author(), t.total(), t.len());
    }

    let paired = paired(&frequency_tables[0], &frequency_tables[1]);
    let timeline = timeline(&corpus, opts.bucket);
    let summary = render_summary(&frequency_tables, Some(&comparison), opts.top_k);

    let exporter = Exporter::new(opts.export_format, &opts.out_dir);
    let mut written = Vec::new();
    for t in &frequency_tables {
        written.extend(exporter.frequency(t)?);
    }
    written.extend(exporter.comparison(&comparison)?);
    written.extend(exporter.timeline(&timeline)?);
    if opts.export_format == ExportFormat::Txt {
        let stem = format!(
            "{}_vs_{}",
            export::file_stem(comparison.numerator().as_str()),
            export::file_stem(comparison.denominator().as_str())
        );
        written.push(exporter.summary(&stem, &summary)?);
    }

    Ok(AnalysisReport {
        frequency_tables,
        comparison,
        paired,
        timeline,
        summary,
        skipped_records: corpus.skipped(),
        written,
    })
}
