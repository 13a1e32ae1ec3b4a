//! Per-author word counts and relative frequencies.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::archive::{Author, Record};
use crate::tokenize::{Token, Tokenizer};

/// Counts each distinct token.
pub fn count_tokens<I>(tokens: I) -> HashMap<Token, u64>
where
    I: IntoIterator<Item = Token>,
{
    let mut counts: HashMap<Token, u64> = HashMap::new();
    for token in tokens {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

/// Map-reduce variant of [`count_tokens`]: each rayon worker counts its share
/// and the partial maps are summed.
pub fn par_count_tokens(tokens: &[Token]) -> HashMap<Token, u64> {
    tokens
        .par_iter()
        .fold(HashMap::new, |mut acc: HashMap<Token, u64>, t| {
            *acc.entry(t.clone()).or_insert(0) += 1;
            acc
        })
        .reduce(HashMap::new, merge_counts)
}

/// Adds the counts of `b` into `a`. Order of merging does not matter.
pub fn merge_counts(mut a: HashMap<Token, u64>, b: HashMap<Token, u64>) -> HashMap<Token, u64> {
    if a.len() < b.len() {
        return merge_counts(b, a);
    }
    for (token, n) in b {
        *a.entry(token).or_insert(0) += n;
    }
    a
}

/// Tokenizes records in parallel, keeping record order in the output.
pub fn tokenize_records(tokenizer: &Tokenizer, records: &[Record]) -> Vec<Token> {
    records
        .par_iter()
        .map(|r| tokenizer.tokens(&r.text))
        .collect::<Vec<Vec<Token>>>()
        .into_iter()
        .flatten()
        .collect()
}

/// One row of a [`FrequencyTable`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyEntry {
    pub token: Token,
    pub count: u64,
    pub total: u64,
    pub freq: f64,
}

/// Word frequencies for one author, sorted by count descending and then by
/// token ascending.
#[derive(Debug, Clone)]
pub struct FrequencyTable {
    author: Author,
    total: u64,
    entries: Vec<FrequencyEntry>,
}

impl FrequencyTable {
    pub fn from_counts(author: Author, counts: HashMap<Token, u64>) -> Self {
        let total: u64 = counts.values().sum();
        let mut entries: Vec<FrequencyEntry> = counts
            .into_iter()
            .filter(|(_, n)| *n > 0)
            .map(|(token, count)| FrequencyEntry {
                token,
                count,
                total,
                freq: count as f64 / total as f64,
            })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.token.cmp(&b.token)));
        Self {
            author,
            total,
            entries,
        }
    }

    pub fn from_tokens<I>(author: Author, tokens: I) -> Self
    where
        I: IntoIterator<Item = Token>,
    {
        Self::from_counts(author, count_tokens(tokens))
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    /// Number of tokens the author emitted.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn entries(&self) -> &[FrequencyEntry] {
        &self.entries
    }

    pub fn top(&self, n: usize) -> &[FrequencyEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn get(&self, token: &str) -> Option<&FrequencyEntry> {
        self.entries.iter().find(|e| e.token.as_str() == token)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A token used by both authors with its relative frequency for each.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairedFrequency {
    pub token: Token,
    pub freq_a: f64,
    pub freq_b: f64,
}

/// Inner join of two tables on the token, sorted by token.
pub fn paired(a: &FrequencyTable, b: &FrequencyTable) -> Vec<PairedFrequency> {
    let b_freqs: HashMap<&str, f64> = b
        .entries
        .iter()
        .map(|e| (e.token.as_str(), e.freq))
        .collect();
    let mut rows: Vec<PairedFrequency> = a
        .entries
        .iter()
        .filter_map(|e| {
            b_freqs.get(e.token.as_str()).map(|fb| PairedFrequency {
                token: e.token.clone(),
                freq_a: e.freq,
                freq_b: *fb,
            })
        })
        .collect();
    rows.sort_by(|x, y| x.token.cmp(&y.token));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenize::StopWords;

    fn toks(words: &[&str]) -> Vec<Token> {
        words.iter().map(|w| Token::new(*w)).collect()
    }

    #[test]
    fn test_count() {
        let counted = count_tokens(toks(&["one", "two", "two", "three", "three", "three"]));
        let mut expected = HashMap::new();
        expected.insert(Token::new("one"), 1_u64);
        expected.insert(Token::new("two"), 2_u64);
        expected.insert(Token::new("three"), 3_u64);
        assert_eq!(counted, expected);
    }

    #[test]
    fn test_parallel_count_matches_sequential() {
        let words: Vec<Token> = (0..5000)
            .map(|i| Token::new(format!("w{}", i % 37)))
            .collect();
        assert_eq!(par_count_tokens(&words), count_tokens(words.clone()));
    }

    #[test]
    fn test_table_sorted_with_tiebreak() {
        let t = FrequencyTable::from_tokens(
            Author::new("a"),
            toks(&["z", "z", "z", "b", "a", "c", "c", "b"]),
        );
        let order: Vec<(&str, u64)> = t
            .entries()
            .iter()
            .map(|e| (e.token.as_str(), e.count))
            .collect();
        assert_eq!(order, vec![("z", 3), ("b", 2), ("c", 2), ("a", 1)]);
        assert_eq!(t.total(), 8);
        assert!(t.entries().iter().all(|e| e.total == 8));
    }

    #[test]
    fn test_freqs_in_range_and_sum_to_one() {
        let t = FrequencyTable::from_tokens(
            Author::new("a"),
            toks(&["x", "y", "y", "z", "z", "z", "#tag", "@me", "y"]),
        );
        assert!(t.entries().iter().all(|e| e.freq > 0.0 && e.freq <= 1.0));
        let sum: f64 = t.entries().iter().map(|e| e.freq).sum();
        assert!((sum - 1.0).abs() < 1e-12);
        assert_eq!(t.get("y").map(|e| e.count), Some(3));
    }

    #[test]
    fn test_empty_author_yields_empty_table() {
        let t = FrequencyTable::from_tokens(Author::new("nobody"), Vec::new());
        assert!(t.is_empty());
        assert_eq!(t.total(), 0);
        assert!(t.top(10).is_empty());
    }

    #[test]
    fn test_parallel_counts_match_sequential() {
        let tokenizer = Tokenizer::new(StopWords::from_words(["the"]));
        let a = Author::new("a");
        let records: Vec<Record> = [
            "The cat sat on the mat",
            "RT @dog: the cat ran",
            "",
            "#cats rule",
        ]
        .iter()
        .map(|t| Record::new(a.clone(), None, *t))
        .collect();
        let seq = tokenize_records(&tokenizer, &records);
        assert_eq!(
            seq.iter().map(Token::as_str).collect::<Vec<_>>(),
            vec!["cat", "sat", "on", "mat", "@dog", "cat", "ran", "#cats", "rule"]
        );
        assert_eq!(par_count_tokens(&seq), count_tokens(seq));
    }

    #[test]
    fn test_paired_is_inner_join() {
        let a = FrequencyTable::from_tokens(Author::new("a"), toks(&["x", "x", "y"]));
        let b = FrequencyTable::from_tokens(Author::new("b"), toks(&["y", "z"]));
        let rows = paired(&a, &b);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].token.as_str(), "y");
        assert!((rows[0].freq_a - 1.0 / 3.0).abs() < 1e-12);
        assert!((rows[0].freq_b - 0.5).abs() < 1e-12);
    }
}
