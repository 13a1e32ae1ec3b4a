//! Author-tagged post archives and their CSV loader.
//!
//! The loader understands the classic archive export (`tweets.csv`) and any
//! CSV with `timestamp` and `text` headers. Other columns are ignored.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::{debug, info, warn};
use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{Error, Result};

static RETWEET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^RT\b").expect("valid regex"));

/// Label identifying whose archive a record came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Author(String);

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Author(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single post. Never mutated after loading.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub author: Author,
    pub timestamp: Option<DateTime<Utc>>,
    pub text: String,
}

impl Record {
    pub fn new(author: Author, timestamp: Option<DateTime<Utc>>, text: impl Into<String>) -> Self {
        Self {
            author,
            timestamp,
            text: text.into(),
        }
    }

    /// True when the text opens with a standalone `RT` marker.
    pub fn is_retweet(&self) -> bool {
        RETWEET_RE.is_match(&self.text)
    }

    /// True when the record falls in the half-open window `[since, until)`.
    /// Without a window every record matches; with one, undated records don't.
    pub fn in_window(&self, since: Option<NaiveDate>, until: Option<NaiveDate>) -> bool {
        if since.is_none() && until.is_none() {
            return true;
        }
        let Some(ts) = self.timestamp else {
            return false;
        };
        let day = ts.date_naive();
        since.is_none_or(|s| day >= s) && until.is_none_or(|u| day < u)
    }
}

/// All records of one author.
#[derive(Debug, Clone)]
pub struct Archive {
    pub author: Author,
    pub records: Vec<Record>,
    /// Rows with broken CSV structure that were left out.
    pub skipped: usize,
}

impl Archive {
    pub fn new(author: Author, records: Vec<Record>) -> Self {
        Self {
            author,
            records,
            skipped: 0,
        }
    }

    /// Loads every CSV file at `path` (a file, or a directory searched
    /// recursively in sorted order).
    pub fn load(author: Author, path: &Path) -> Result<Self> {
        let files = collect_csv_files(path)?;
        let mut records = Vec::new();
        let mut skipped = 0;
        for file in &files {
            let (mut recs, bad) = read_records(&author, File::open(file)?)?;
            if bad > 0 {
                warn!("{}: skipped {} malformed rows", file.display(), bad);
            }
            records.append(&mut recs);
            skipped += bad;
        }
        info!(
            "Loaded {} records for '{}' from {} file(s)",
            records.len(),
            author,
            files.len()
        );
        Ok(Self {
            author,
            records,
            skipped,
        })
    }
}

/// The archives taking part in one run, in the order they were given.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub archives: Vec<Archive>,
}

impl Corpus {
    pub fn new(archives: Vec<Archive>) -> Result<Self> {
        let mut seen = HashSet::new();
        for a in &archives {
            if !seen.insert(a.author.clone()) {
                return Err(Error::DuplicateAuthor(a.author.to_string()));
            }
        }
        Ok(Self { archives })
    }

    /// Loads `(author, path)` pairs.
    pub fn load<P: AsRef<Path>>(sources: &[(Author, P)]) -> Result<Self> {
        let archives = sources
            .iter()
            .map(|(author, path)| Archive::load(author.clone(), path.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(archives)
    }

    pub fn skipped(&self) -> usize {
        self.archives.iter().map(|a| a.skipped).sum()
    }

    /// Keeps only records matching the date window and, if asked, drops
    /// retweets.
    pub fn filtered(
        &self,
        since: Option<NaiveDate>,
        until: Option<NaiveDate>,
        exclude_retweets: bool,
    ) -> Self {
        let archives = self
            .archives
            .iter()
            .map(|a| Archive {
                author: a.author.clone(),
                records: a
                    .records
                    .iter()
                    .filter(|r| r.in_window(since, until))
                    .filter(|r| !(exclude_retweets && r.is_retweet()))
                    .cloned()
                    .collect(),
                skipped: a.skipped,
            })
            .collect();
        Self { archives }
    }
}

/// Parses `NAME=PATH` as given on the command line.
pub fn parse_author_spec(spec: &str) -> Result<(Author, PathBuf)> {
    match spec.split_once('=') {
        Some((name, path)) if !name.trim().is_empty() && !path.trim().is_empty() => {
            Ok((Author::new(name.trim()), PathBuf::from(path.trim())))
        }
        _ => Err(Error::InvalidAuthorSpec(spec.to_string())),
    }
}

/// Collects `.csv` files below `path`, sorted by path.
pub fn collect_csv_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.exists() {
        return Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("archive path not found: {}", path.display()),
        )));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.extension()
                .and_then(|x| x.to_str())
                .is_some_and(|x| x.eq_ignore_ascii_case("csv"))
        })
        .collect();
    if files.is_empty() {
        return Err(Error::NoArchiveFiles(path.to_path_buf()));
    }
    files.sort();
    Ok(files)
}

/// Reads records from CSV data. Returns the decoded records plus the number
/// of rows that had to be skipped.
///
/// Columns are found by their `timestamp` and `text` headers. Cell bytes are
/// decoded lossily, so an invalid UTF-8 sequence only splits the text where
/// it occurs. A row is skipped only when the CSV structure itself is broken.
pub fn read_records<R: Read>(author: &Author, reader: R) -> Result<(Vec<Record>, usize)> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);
    let headers = rdr.byte_headers()?.clone();
    let column = |name: &[u8]| headers.iter().position(|h| h.trim_ascii() == name);
    let ts_col = column(b"timestamp");
    let text_col = column(b"text");
    if text_col.is_none() {
        debug!("no text column in headers {:?}", headers);
    }

    let mut records = Vec::new();
    let mut skipped = 0;
    for (i, row) in rdr.byte_records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                debug!("row {}: {}", i + 1, e);
                skipped += 1;
                continue;
            }
        };
        let cell = |col: Option<usize>| {
            col.and_then(|c| row.get(c))
                .map(String::from_utf8_lossy)
        };
        let raw_ts = cell(ts_col);
        let timestamp = raw_ts.as_deref().and_then(parse_timestamp);
        if timestamp.is_none() && raw_ts.is_some() {
            debug!("row {}: unparseable timestamp {:?}", i + 1, raw_ts);
        }
        let text = cell(text_col).map(|t| t.into_owned()).unwrap_or_default();
        records.push(Record::new(author.clone(), timestamp, text));
    }
    Ok((records, skipped))
}

/// Accepts `2016-01-05 21:34:22 +0000`, RFC 3339, or a naive
/// `2016-01-05 21:34:22` taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S %z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|n| n.and_utc())
}
