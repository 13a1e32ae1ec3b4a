//! Post counts per author over time.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use serde::Serialize;

use crate::archive::{Author, Corpus};

/// Width of a timeline bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Bucket {
    Day,
    /// Weeks start on Monday.
    Week,
    #[default]
    Month,
}

impl Bucket {
    /// First day of the bucket containing `day`.
    pub fn start_of(self, day: NaiveDate) -> NaiveDate {
        match self {
            Bucket::Day => day,
            Bucket::Week => {
                day - chrono::Duration::days(i64::from(day.weekday().num_days_from_monday()))
            }
            Bucket::Month => day.with_day(1).unwrap_or(day),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineRow {
    pub author: Author,
    pub bucket_start: NaiveDate,
    pub count: u64,
}

/// Counts dated records per author and bucket, ordered by author and then
/// by bucket. Undated records are left out.
pub fn timeline(corpus: &Corpus, bucket: Bucket) -> Vec<TimelineRow> {
    let mut counts: BTreeMap<(Author, NaiveDate), u64> = BTreeMap::new();
    for archive in &corpus.archives {
        for record in &archive.records {
            if let Some(ts) = record.timestamp {
                let start = bucket.start_of(ts.date_naive());
                *counts.entry((archive.author.clone(), start)).or_insert(0) += 1;
            }
        }
    }
    counts
        .into_iter()
        .map(|((author, bucket_start), count)| TimelineRow {
            author,
            bucket_start,
            count,
        })
        .collect()
}
