use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to callers of the comparison pipeline.
///
/// Problems confined to a single record (bad CSV row, missing text, odd
/// timestamp) are recovered where they happen and never show up here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("comparison needs exactly two authors, got {found}")]
    TooFewAuthors { found: usize },
    #[error("comparison supports exactly two authors, got {found}")]
    TooManyAuthors { found: usize },
    #[error("no record in the corpus produced a single token")]
    EmptyCorpus,
    #[error("invalid author spec '{0}', expected NAME=PATH")]
    InvalidAuthorSpec(String),
    #[error("author '{0}' was given more than once")]
    DuplicateAuthor(String),
    #[error("no CSV archive files found under {}", .0.display())]
    NoArchiveFiles(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
