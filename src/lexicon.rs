//! Pronunciation lexicon — word → ARPAbet lookup.
//!
//! [`CmuLexicon`] reads the CMU Pronouncing Dictionary text format:
//!
//! ```text
//! ;;; comment
//! HELLO  HH AH0 L OW1
//! READ  R EH1 D
//! READ(1)  R IY1 D
//! ```
//!
//! Keys are case-insensitive and variant suffixes such as `(1)` are
//! stripped; the first pronunciation listed for a word wins.

use std::{
    collections::HashMap,
    io::{BufRead, BufReader},
    path::Path,
};

use anyhow::{Context, Result};
use tracing::debug;

/// Word → ARPAbet source consulted by the G2P engine.
pub trait Lexicon: Send + Sync {
    /// ARPAbet pronunciation for `word`, if known.
    fn try_get(&self, word: &str) -> Option<String>;
}

/// Normalise a lexicon key: lower-case, `(n)` variant suffix removed.
pub fn normalize_key(word: &str) -> String {
    let word = word.trim();
    let base = match word.find('(') {
        Some(open) if word.ends_with(')') => &word[..open],
        _ => word,
    };
    base.to_lowercase()
}

/// In-memory CMU-style dictionary.
#[derive(Debug, Default, Clone)]
pub struct CmuLexicon {
    entries: HashMap<String, String>,
}

impl CmuLexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse dictionary text from any buffered reader.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut lexicon = Self::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("Cannot read lexicon line {}", lineno + 1))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with(";;;") {
                continue;
            }
            let Some((word, phones)) = line.split_once(char::is_whitespace) else {
                continue;
            };
            lexicon.insert(word, phones.trim());
        }
        debug!(entries = lexicon.len(), "lexicon parsed");
        Ok(lexicon)
    }

    /// Load a dictionary file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Cannot open lexicon: {}", path.display()))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("Cannot parse lexicon: {}", path.display()))
    }

    /// Add an entry unless the word already has a pronunciation.
    pub fn insert(&mut self, word: &str, arpabet: &str) {
        self.entries
            .entry(normalize_key(word))
            .or_insert_with(|| arpabet.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Lexicon for CmuLexicon {
    fn try_get(&self, word: &str) -> Option<String> {
        self.entries.get(&normalize_key(word)).cloned()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for CmuLexicon {
    fn from(entries: [(&str, &str); N]) -> Self {
        let mut lexicon = Self::new();
        for (word, arpabet) in entries {
            lexicon.insert(word, arpabet);
        }
        lexicon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = ";;; test dictionary\n\
                          HELLO  HH AH0 L OW1\n\
                          READ  R EH1 D\n\
                          READ(1)  R IY1 D\n\
                          \n\
                          WORLD  W ER1 L D\n";

    #[test]
    fn test_parse_and_lookup() {
        let lex = CmuLexicon::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(lex.len(), 3);
        assert_eq!(lex.try_get("hello").as_deref(), Some("HH AH0 L OW1"));
        assert_eq!(lex.try_get("World").as_deref(), Some("W ER1 L D"));
    }

    #[test]
    fn test_first_variant_wins() {
        let lex = CmuLexicon::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(lex.try_get("read").as_deref(), Some("R EH1 D"));
        assert_eq!(lex.try_get("READ(1)").as_deref(), Some("R EH1 D"));
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("READ(1)"), "read");
        assert_eq!(normalize_key(" Hello "), "hello");
        assert_eq!(normalize_key("(paren"), "(paren");
    }

    #[test]
    fn test_missing_word() {
        let lex = CmuLexicon::from_reader(SAMPLE.as_bytes()).unwrap();
        assert!(lex.try_get("zyzzyva").is_none());
    }
}
