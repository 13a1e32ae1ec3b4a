//! Log-odds comparison of two authors' word use.
//!
//! For every token the two authors used at least `min_support` times in
//! total, each author's count gets add-one smoothing and is normalized over
//! the retained vocabulary:
//!
//! ```text
//! p_author(w) = (n_author(w) + 1) / Σ_v (n_author(v) + 1)
//! logratio(w) = ln(p_first(w) / p_second(w))
//! ```
//!
//! The first author passed in is always the numerator, so a positive
//! `logratio` means the word leans towards that author.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use log::debug;
use serde::Serialize;

use crate::archive::Author;
use crate::error::{Error, Result};
use crate::frequency::count_tokens;
use crate::tokenize::Token;

/// Combined count a token needs across both authors to be ranked.
pub const DEFAULT_MIN_SUPPORT: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankerConfig {
    pub min_support: u64,
    /// Leave `@mentions` out before counting.
    pub drop_mentions: bool,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            min_support: DEFAULT_MIN_SUPPORT,
            drop_mentions: true,
        }
    }
}

/// The full token sequence of one author.
#[derive(Debug, Clone)]
pub struct AuthorTokens {
    pub author: Author,
    pub tokens: Vec<Token>,
}

impl AuthorTokens {
    pub fn new(author: Author, tokens: Vec<Token>) -> Self {
        Self { author, tokens }
    }
}

/// One ranked token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonEntry {
    pub token: Token,
    pub count_a: u64,
    pub count_b: u64,
    pub proportion_a: f64,
    pub proportion_b: f64,
    pub logratio: f64,
}

/// Orderings supported by [`ComparisonTable::sorted`]. Ties always fall back
/// to the token in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    LogratioDesc,
    LogratioAsc,
    AbsDesc,
    AbsAsc,
}

/// Most distinctive tokens on each side of the comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Distinctive<'a> {
    /// `logratio >= 0`, strongest first.
    pub numerator: Vec<&'a ComparisonEntry>,
    /// `logratio < 0`, strongest first.
    pub denominator: Vec<&'a ComparisonEntry>,
}

#[derive(Debug, Clone)]
pub struct ComparisonTable {
    numerator: Author,
    denominator: Author,
    entries: Vec<ComparisonEntry>,
}

impl ComparisonTable {
    /// Author whose proportions sit in the `_a` columns.
    pub fn numerator(&self) -> &Author {
        &self.numerator
    }

    pub fn denominator(&self) -> &Author {
        &self.denominator
    }

    /// Entries by descending `logratio`.
    pub fn entries(&self) -> &[ComparisonEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, token: &str) -> Option<&ComparisonEntry> {
        self.entries.iter().find(|e| e.token.as_str() == token)
    }

    pub fn sorted(&self, order: SortOrder) -> Vec<&ComparisonEntry> {
        let mut rows: Vec<&ComparisonEntry> = self.entries.iter().collect();
        rows.sort_by(|a, b| order_by(order, a, b));
        rows
    }

    /// Top `k` entries by absolute `logratio` within each sign bucket.
    pub fn distinctive(&self, k: usize) -> Distinctive<'_> {
        let (mut numerator, mut denominator): (Vec<_>, Vec<_>) =
            self.entries.iter().partition(|e| e.logratio >= 0.0);
        for side in [&mut numerator, &mut denominator] {
            side.sort_by(|a, b| order_by(SortOrder::AbsDesc, a, b));
            side.truncate(k);
        }
        Distinctive {
            numerator,
            denominator,
        }
    }

    /// The `k` tokens both authors use at the most similar rate.
    pub fn most_neutral(&self, k: usize) -> Vec<&ComparisonEntry> {
        let mut rows = self.sorted(SortOrder::AbsAsc);
        rows.truncate(k);
        rows
    }
}

fn order_by(order: SortOrder, a: &ComparisonEntry, b: &ComparisonEntry) -> Ordering {
    let primary = match order {
        SortOrder::LogratioDesc => b.logratio.total_cmp(&a.logratio),
        SortOrder::LogratioAsc => a.logratio.total_cmp(&b.logratio),
        SortOrder::AbsDesc => b.logratio.abs().total_cmp(&a.logratio.abs()),
        SortOrder::AbsAsc => a.logratio.abs().total_cmp(&b.logratio.abs()),
    };
    primary.then_with(|| a.token.cmp(&b.token))
}

/// Builds [`ComparisonTable`]s from raw token streams.
#[derive(Debug, Clone, Default)]
pub struct Ranker {
    config: RankerConfig,
}

impl Ranker {
    pub fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RankerConfig {
        &self.config
    }

    /// Compares exactly two authors; the first is the numerator.
    pub fn rank(&self, streams: &[AuthorTokens]) -> Result<ComparisonTable> {
        match streams {
            [a, b] => Ok(self.compare(a, b)),
            s if s.len() < 2 => Err(Error::TooFewAuthors { found: s.len() }),
            s => Err(Error::TooManyAuthors { found: s.len() }),
        }
    }

    pub fn compare(&self, a: &AuthorTokens, b: &AuthorTokens) -> ComparisonTable {
        let counts_a = self.count(&a.tokens);
        let counts_b = self.count(&b.tokens);

        // outer join: a token missing on one side counts as zero there
        let vocabulary: BTreeSet<&Token> = counts_a.keys().chain(counts_b.keys()).collect();
        let retained: Vec<(&Token, u64, u64)> = vocabulary
            .into_iter()
            .map(|t| {
                let na = counts_a.get(t).copied().unwrap_or(0);
                let nb = counts_b.get(t).copied().unwrap_or(0);
                (t, na, nb)
            })
            .filter(|(_, na, nb)| na + nb >= self.config.min_support)
            .collect();

        let pa = smoothed(retained.iter().map(|(_, na, _)| *na));
        let pb = smoothed(retained.iter().map(|(_, _, nb)| *nb));

        let mut entries: Vec<ComparisonEntry> = retained
            .iter()
            .zip(pa.iter().zip(pb.iter()))
            .map(|((token, na, nb), (pa, pb))| ComparisonEntry {
                token: (*token).clone(),
                count_a: *na,
                count_b: *nb,
                proportion_a: *pa,
                proportion_b: *pb,
                logratio: (pa / pb).ln(),
            })
            .collect();
        entries.sort_by(|x, y| order_by(SortOrder::LogratioDesc, x, y));

        debug!(
            "Ranked {} tokens for '{}' vs '{}' (min support {})",
            entries.len(),
            a.author,
            b.author,
            self.config.min_support
        );
        ComparisonTable {
            numerator: a.author.clone(),
            denominator: b.author.clone(),
            entries,
        }
    }

    fn count(&self, tokens: &[Token]) -> HashMap<Token, u64> {
        count_tokens(
            tokens
                .iter()
                .filter(|t| !(self.config.drop_mentions && t.is_mention()))
                .cloned(),
        )
    }
}

/// Add-one smoothing of a count column, normalized to sum to one.
pub fn smoothed<I>(counts: I) -> Vec<f64>
where
    I: IntoIterator<Item = u64>,
{
    let plus_one: Vec<f64> = counts.into_iter().map(|n| (n + 1) as f64).collect();
    let sum: f64 = plus_one.iter().sum();
    plus_one.into_iter().map(|c| c / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(author: &str, words: &[(&str, usize)]) -> AuthorTokens {
        let tokens = words
            .iter()
            .flat_map(|(w, n)| std::iter::repeat_n(Token::new(*w), *n))
            .collect();
        AuthorTokens::new(Author::new(author), tokens)
    }

    #[test]
    fn test_word_missing_for_one_author_gets_floor() {
        let david = stream("david", &[("bioinformatics", 8), ("data", 992)]);
        let julia = stream("julia", &[("data", 500), ("knitting", 10)]);
        let table = Ranker::default().rank(&[david, julia]).unwrap();

        let bio = table.get("bioinformatics").unwrap();
        assert_eq!((bio.count_a, bio.count_b), (8, 0));
        // sums over the retained vocabulary: 9+993+1 and 1+501+11
        assert!((bio.proportion_a - 9.0 / 1003.0).abs() < 1e-12);
        assert!((bio.proportion_b - 1.0 / 513.0).abs() < 1e-12);
        assert!(bio.logratio > 0.0);
        assert!(table.get("knitting").unwrap().logratio < 0.0);
    }

    #[test]
    fn test_combined_threshold() {
        let a = stream("a", &[("rare", 4), ("common", 10), ("split", 3)]);
        let b = stream("b", &[("common", 10), ("split", 2)]);
        let table = Ranker::default().compare(&a, &b);
        assert!(table.get("rare").is_none());
        // 3 + 2 meets the threshold only on the combined total
        assert!(table.get("split").is_some());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_proportions_sum_to_one() {
        let a = stream("a", &[("x", 7), ("y", 3), ("z", 12), ("w", 0)]);
        let b = stream("b", &[("x", 1), ("y", 9), ("z", 5), ("w", 6)]);
        let table = Ranker::default().compare(&a, &b);
        let sa: f64 = table.entries().iter().map(|e| e.proportion_a).sum();
        let sb: f64 = table.entries().iter().map(|e| e.proportion_b).sum();
        assert!((sa - 1.0).abs() < 1e-12);
        assert!((sb - 1.0).abs() < 1e-12);
        for e in table.entries() {
            assert!(e.proportion_a > 0.0 && e.proportion_a < 1.0);
            assert!(e.proportion_b > 0.0 && e.proportion_b < 1.0);
        }
    }

    #[test]
    fn test_mentions_removed_before_counting() {
        let a = stream("a", &[("@friend", 50), ("hello", 5), ("#tag", 6)]);
        let b = stream("b", &[("hello", 5)]);
        let table = Ranker::default().compare(&a, &b);
        assert!(table.get("@friend").is_none());
        assert!(table.get("#tag").is_some());

        let keep = Ranker::new(RankerConfig {
            drop_mentions: false,
            ..RankerConfig::default()
        });
        assert!(keep.compare(&a, &b).get("@friend").is_some());
    }

    #[test]
    fn test_swap_flips_sign() {
        let a = stream("a", &[("x", 7), ("y", 3), ("z", 12)]);
        let b = stream("b", &[("x", 1), ("y", 9), ("z", 5)]);
        let ranker = Ranker::default();
        let ab = ranker.compare(&a, &b);
        let ba = ranker.compare(&b, &a);
        assert_eq!(ab.numerator().as_str(), "a");
        assert_eq!(ba.numerator().as_str(), "b");
        for e in ab.entries() {
            let other = ba.get(e.token.as_str()).unwrap();
            assert!((e.logratio + other.logratio).abs() < 1e-12);
        }
        // deterministic on recomputation
        assert_eq!(ab.entries(), ranker.compare(&a, &b).entries());
    }

    #[test]
    fn test_orderings_and_buckets() {
        let a = stream("a", &[("aa", 20), ("ab", 8), ("even", 6), ("ba", 2)]);
        let b = stream("b", &[("aa", 1), ("ab", 4), ("even", 6), ("ba", 20)]);
        let table = Ranker::default().compare(&a, &b);

        let desc: Vec<&str> = table.entries().iter().map(|e| e.token.as_str()).collect();
        assert_eq!(desc, vec!["aa", "ab", "even", "ba"]);
        let asc: Vec<&str> = table
            .sorted(SortOrder::LogratioAsc)
            .iter()
            .map(|e| e.token.as_str())
            .collect();
        assert_eq!(asc, vec!["ba", "even", "ab", "aa"]);

        let d = table.distinctive(1);
        assert_eq!(d.numerator[0].token.as_str(), "aa");
        assert_eq!(d.denominator[0].token.as_str(), "ba");
        assert_eq!(table.most_neutral(1)[0].token.as_str(), "even");
    }

    #[test]
    fn test_author_count_preconditions() {
        let r = Ranker::default();
        assert!(matches!(r.rank(&[]), Err(Error::TooFewAuthors { found: 0 })));
        let one = stream("a", &[("x", 5)]);
        assert!(matches!(
            r.rank(std::slice::from_ref(&one)),
            Err(Error::TooFewAuthors { found: 1 })
        ));
        let three = [one.clone(), one.clone(), one];
        assert!(matches!(r.rank(&three), Err(Error::TooManyAuthors { found: 3 })));
    }

    #[test]
    fn test_nothing_meets_threshold() {
        let a = stream("a", &[("x", 1)]);
        let b = stream("b", &[("y", 2)]);
        let table = Ranker::default().compare(&a, &b);
        assert!(table.is_empty());
        assert!(table.distinctive(5).numerator.is_empty());
    }
}
