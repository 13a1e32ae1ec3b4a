//! Writing result tables and the plain-text summary.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::Local;
use clap::ValueEnum;
use log::info;
use serde::Serialize;

use crate::compare::ComparisonTable;
use crate::error::Result;
use crate::frequency::FrequencyTable;
use crate::timeline::TimelineRow;

/// Number of rows per section in the summary word lists.
pub const SUMMARY_TOP: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Txt,
    Csv,
    Tsv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
            ExportFormat::Json => "json",
        }
    }

    fn delimiter(self) -> u8 {
        match self {
            ExportFormat::Tsv => b'\t',
            _ => b',',
        }
    }
}

/// Neutralizes spreadsheet formula injection: a cell starting with `=`, `+`,
/// `-`, `@`, tab or carriage return gets a leading `'`. Cells that already
/// start with `'` are returned unchanged.
pub fn csv_safe_cell(cell: String) -> String {
    match cell.chars().next() {
        Some('=' | '+' | '-' | '@' | '\t' | '\r') => format!("'{cell}"),
        _ => cell,
    }
}

/// Local time stamp used in output file names, e.g. `20160105_213422`.
pub fn file_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Keeps ASCII alphanumerics, `-` and `_` so labels are safe in file names.
pub fn file_stem(label: &str) -> String {
    let stem: String = label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() { "author".to_string() } else { stem }
}

/// Writes tables into one directory with a shared time stamp.
#[derive(Debug, Clone)]
pub struct Exporter {
    format: ExportFormat,
    out_dir: PathBuf,
    stamp: String,
}

impl Exporter {
    pub fn new(format: ExportFormat, out_dir: impl Into<PathBuf>) -> Self {
        Self::with_stamp(format, out_dir, file_stamp())
    }

    pub fn with_stamp(format: ExportFormat, out_dir: impl Into<PathBuf>, stamp: String) -> Self {
        Self {
            format,
            out_dir: out_dir.into(),
            stamp,
        }
    }

    pub fn format(&self) -> ExportFormat {
        self.format
    }

    fn path_for(&self, stem: &str, kind: &str, ext: &str) -> PathBuf {
        self.out_dir
            .join(format!("{}_{}_{}.{}", file_stem(stem), self.stamp, kind, ext))
    }

    /// Writes `<author>_<stamp>_wordfreq.<ext>`. Returns `None` for `Txt`.
    pub fn frequency(&self, table: &FrequencyTable) -> Result<Option<PathBuf>> {
        let rows = table.entries().iter().map(|e| {
            vec![
                csv_safe_cell(e.token.to_string()),
                e.count.to_string(),
                e.total.to_string(),
                e.freq.to_string(),
            ]
        });
        self.table(
            table.author().as_str(),
            "wordfreq",
            &["token", "count", "total", "freq"],
            rows,
            table.entries(),
        )
    }

    /// Writes `<a>_vs_<b>_<stamp>_logodds.<ext>`, rows by descending logratio.
    pub fn comparison(&self, table: &ComparisonTable) -> Result<Option<PathBuf>> {
        let a = table.numerator().as_str();
        let b = table.denominator().as_str();
        let headers = [
            "token".to_string(),
            format!("count_{a}"),
            format!("count_{b}"),
            format!("proportion_{a}"),
            format!("proportion_{b}"),
            "logratio".to_string(),
        ];
        let headers: Vec<&str> = headers.iter().map(String::as_str).collect();
        let rows = table.entries().iter().map(|e| {
            vec![
                csv_safe_cell(e.token.to_string()),
                e.count_a.to_string(),
                e.count_b.to_string(),
                e.proportion_a.to_string(),
                e.proportion_b.to_string(),
                e.logratio.to_string(),
            ]
        });
        self.table(
            &format!("{}_vs_{}", file_stem(a), file_stem(b)),
            "logodds",
            &headers,
            rows,
            table.entries(),
        )
    }

    /// Writes `combined_<stamp>_timeline.<ext>`.
    pub fn timeline(&self, rows: &[TimelineRow]) -> Result<Option<PathBuf>> {
        let cells = rows.iter().map(|r| {
            vec![
                csv_safe_cell(r.author.to_string()),
                r.bucket_start.format("%Y-%m-%d").to_string(),
                r.count.to_string(),
            ]
        });
        self.table(
            "combined",
            "timeline",
            &["author", "bucket_start", "count"],
            cells,
            rows,
        )
    }

    /// Writes `<stem>_<stamp>_summary.txt` regardless of the table format.
    pub fn summary(&self, stem: &str, summary: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.out_dir)?;
        let path = self.path_for(stem, "summary", "txt");
        let mut file = File::create(&path)?;
        file.write_all(summary.as_bytes())?;
        info!("Wrote {}", path.display());
        Ok(path)
    }

    fn table<R, I>(
        &self,
        stem: &str,
        kind: &str,
        headers: &[&str],
        cells: I,
        rows: &[R],
    ) -> Result<Option<PathBuf>>
    where
        R: Serialize,
        I: Iterator<Item = Vec<String>>,
    {
        if self.format == ExportFormat::Txt {
            return Ok(None);
        }
        fs::create_dir_all(&self.out_dir)?;
        let path = self.path_for(stem, kind, self.format.extension());
        match self.format {
            ExportFormat::Json => {
                let mut w = BufWriter::new(File::create(&path)?);
                serde_json::to_writer_pretty(&mut w, rows)?;
                w.flush()?;
            }
            _ => {
                let mut wtr = csv::WriterBuilder::new()
                    .delimiter(self.format.delimiter())
                    .from_path(&path)?;
                wtr.write_record(headers)?;
                for row in cells {
                    wtr.write_record(&row)?;
                }
                wtr.flush()?;
            }
        }
        info!("Wrote {}", path.display());
        Ok(Some(path))
    }
}

/// Human readable overview: per author the top words, then the most
/// distinctive words on each side and the most neutral shared words.
pub fn render_summary(
    tables: &[FrequencyTable],
    comparison: Option<&ComparisonTable>,
    top_k: usize,
) -> String {
    let mut out = String::new();
    for table in tables {
        out.push_str(&format!(
            "Author {}: {} tokens, {} distinct\n",
            table.author(),
            table.total(),
            table.len()
        ));
        out.push_str(&format!("Top {SUMMARY_TOP} words:\n"));
        for e in table.top(SUMMARY_TOP) {
            out.push_str(&format!("  {}\t{}\t{:.5}\n", e.token, e.count, e.freq));
        }
        out.push('\n');
    }
    if let Some(cmp) = comparison {
        let d = cmp.distinctive(top_k);
        for (author, rows) in [(cmp.numerator(), &d.numerator), (cmp.denominator(), &d.denominator)]
        {
            out.push_str(&format!("Top {top_k} words distinctive for {author}:\n"));
            for e in rows.iter() {
                out.push_str(&format!("  {}\t{:.3}\n", e.token, e.logratio));
            }
            out.push('\n');
        }
        out.push_str(&format!("Top {top_k} most neutral shared words:\n"));
        for e in cmp.most_neutral(top_k) {
            out.push_str(&format!("  {}\t{:.3}\n", e.token, e.logratio));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_safe_cell() {
        assert_eq!(csv_safe_cell("@friend".into()), "'@friend");
        assert_eq!(csv_safe_cell("=1+1".into()), "'=1+1");
        assert_eq!(csv_safe_cell("'@already".into()), "'@already");
        assert_eq!(csv_safe_cell("#tag".into()), "#tag");
        assert_eq!(csv_safe_cell(String::new()), "");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("david"), "david");
        assert_eq!(file_stem("Julia S."), "Julia_S_");
        assert_eq!(file_stem(""), "author");
    }

    #[test]
    fn test_summary_sections_in_order() {
        use crate::archive::Author;
        use crate::compare::{AuthorTokens, Ranker, RankerConfig};
        use crate::tokenize::Token;

        let toks = |words: &[(&str, usize)]| -> Vec<Token> {
            words
                .iter()
                .flat_map(|&(w, n)| std::iter::repeat_n(Token::new(w), n))
                .collect()
        };
        let a = AuthorTokens::new(Author::new("a"), toks(&[("data", 9), ("shared", 5)]));
        let b = AuthorTokens::new(Author::new("b"), toks(&[("knit", 9), ("shared", 5)]));
        let cmp = Ranker::new(RankerConfig::default()).rank(&[a.clone(), b.clone()]).unwrap();
        let tables = [
            FrequencyTable::from_tokens(a.author, a.tokens),
            FrequencyTable::from_tokens(b.author, b.tokens),
        ];
        let summary = render_summary(&tables, Some(&cmp), 3);

        let headings: Vec<&str> = summary
            .lines()
            .filter(|l| !l.is_empty() && !l.starts_with("  "))
            .collect();
        assert_eq!(
            headings,
            vec![
                "Author a: 14 tokens, 2 distinct",
                "Top 20 words:",
                "Author b: 14 tokens, 2 distinct",
                "Top 20 words:",
                "Top 3 words distinctive for a:",
                "Top 3 words distinctive for b:",
                "Top 3 most neutral shared words:",
            ]
        );
        assert!(summary.contains("  data\t9\t0.64286\n"));
        assert!(summary.contains("Top 3 most neutral shared words:\n  shared\t0.000\n"));
        assert!(summary.contains("Top 3 words distinctive for b:\n  knit\t-2.303\n"));
    }

    #[test]
    fn test_txt_format_writes_no_table() {
        let dir = tempfile::tempdir().unwrap();
        let ex = Exporter::with_stamp(ExportFormat::Txt, dir.path(), "20160101_000000".into());
        let table = FrequencyTable::from_tokens(
            crate::archive::Author::new("a"),
            vec![crate::tokenize::Token::new("x")],
        );
        assert_eq!(ex.frequency(&table).unwrap(), None);
        let p = ex.summary("a", "hello").unwrap();
        assert_eq!(
            p.file_name().unwrap().to_str().unwrap(),
            "a_20160101_000000_summary.txt"
        );
    }
}
