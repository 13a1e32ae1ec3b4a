//! Platform-aware tokenization of short posts.
//!
//! Text is cleaned of shortened links, `http://` fragments, the three HTML
//! entity escapes the archive export leaves behind and the `RT` retweet
//! marker. The cleaned text is then matched against a token pattern that keeps
//! `#hashtags`, `@mentions` and contractions (`don't`) in one piece while
//! splitting on every other punctuation character and whitespace.
//!
//! ```
//! use tweet_compare::{StopWords, Tokenizer};
//!
//! let tokenizer = Tokenizer::new(StopWords::from_words(["this", "out", "it"]));
//! let tokens: Vec<String> = tokenizer
//!     .tokenize("Check this out: https://t.co/abc123 RT @friend loved it!!")
//!     .iter()
//!     .map(|t| t.to_string())
//!     .collect();
//! assert_eq!(tokens, ["check", "@friend", "loved"]);
//! ```

use std::borrow::{Borrow, Cow};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::LazyLock;

use log::debug;
use regex::{Matches, Regex};
use serde::Serialize;
use stop_words::{LANGUAGE, get};

/// Substrings deleted from the raw text before matching. Removal is literal,
/// so neighbours of a removed fragment may fuse into one word.
static NOISE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://t\.co/[A-Za-z0-9]+|http://[A-Za-z0-9]+|&amp;|&lt;|&gt;|RT")
        .expect("valid regex")
});

/// One token: a run of letters, digits, `_`, `#` and `@`, where an apostrophe
/// only survives when a word character follows it.
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:[A-Za-z0-9_#@]|'[A-Za-z0-9_])+").expect("valid regex"));

/// Category of a token, read off its leading character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Word,
    Hashtag,
    Mention,
}

/// A normalized (lowercased) token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Wraps an already normalized string. No validation is done.
    pub fn new(s: impl Into<String>) -> Self {
        Token(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> TokenKind {
        match self.0.as_bytes().first() {
            Some(b'#') => TokenKind::Hashtag,
            Some(b'@') => TokenKind::Mention,
            _ => TokenKind::Word,
        }
    }

    pub fn is_mention(&self) -> bool {
        self.kind() == TokenKind::Mention
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A set of lowercase plain words removed from the token stream.
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    /// English list shipped with the `stop-words` crate.
    pub fn english() -> Self {
        let words: HashSet<String> = get(LANGUAGE::English)
            .iter()
            .map(|s| s.to_lowercase())
            .collect();
        debug!("Loaded {} default English stop words", words.len());
        Self { words }
    }

    /// No filtering at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut stop = Self::empty();
        stop.extend(words);
        stop
    }

    pub fn extend<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for w in words {
            let w = w.as_ref().trim();
            if !w.is_empty() {
                self.words.insert(w.to_lowercase());
            }
        }
    }

    /// Adds the words of a plain text file, one per line. Blank lines and
    /// lines starting with `#` are skipped.
    pub fn extend_from_file(&mut self, path: &Path) -> io::Result<usize> {
        let content = fs::read_to_string(path)?;
        let before = self.words.len();
        self.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#')),
        );
        Ok(self.words.len() - before)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Splits post text into tokens. Holds no mutable state, so one instance can
/// be shared across threads.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    stopwords: StopWords,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(StopWords::english())
    }
}

impl Tokenizer {
    pub fn new(stopwords: StopWords) -> Self {
        Self { stopwords }
    }

    pub fn stopwords(&self) -> &StopWords {
        &self.stopwords
    }

    /// Removes links, entity escapes and `RT` markers.
    pub fn clean<'a>(&self, text: &'a str) -> Cow<'a, str> {
        NOISE_RE.replace_all(text, "")
    }

    /// Returns a lazy token sequence over `text`. The stream can be iterated
    /// any number of times.
    pub fn tokenize(&self, text: &str) -> TokenStream<'_> {
        TokenStream {
            stopwords: &self.stopwords,
            cleaned: self.clean(text).into_owned(),
        }
    }

    /// Like [`Tokenizer::tokenize`] for raw bytes. Invalid UTF-8 sequences
    /// decode to U+FFFD, which the token pattern treats as a delimiter.
    pub fn tokenize_bytes(&self, raw: &[u8]) -> TokenStream<'_> {
        self.tokenize(&String::from_utf8_lossy(raw))
    }

    /// Collects the tokens of `text` eagerly.
    pub fn tokens(&self, text: &str) -> Vec<Token> {
        self.tokenize(text).iter().collect()
    }
}

/// Cleaned text of one post, ready to be iterated as tokens.
#[derive(Debug, Clone)]
pub struct TokenStream<'t> {
    stopwords: &'t StopWords,
    cleaned: String,
}

impl TokenStream<'_> {
    pub fn iter(&self) -> Tokens<'_> {
        Tokens {
            matches: TOKEN_RE.find_iter(&self.cleaned),
            stopwords: self.stopwords,
        }
    }

    /// Text after noise removal.
    pub fn cleaned(&self) -> &str {
        &self.cleaned
    }
}

impl<'a> IntoIterator for &'a TokenStream<'_> {
    type Item = Token;
    type IntoIter = Tokens<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator returned by [`TokenStream::iter`].
#[derive(Debug)]
pub struct Tokens<'a> {
    matches: Matches<'static, 'a>,
    stopwords: &'a StopWords,
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let m = self.matches.next()?;
            let token = Token(m.as_str().to_ascii_lowercase());
            // numbers, "#2016", "@123" and similar carry no letter
            if !token.0.bytes().any(|b| b.is_ascii_lowercase()) {
                continue;
            }
            if token.kind() == TokenKind::Word && self.stopwords.contains(token.as_str()) {
                continue;
            }
            return Some(token);
        }
    }
}
