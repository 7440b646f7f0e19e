//! Grapheme-to-phoneme engine — text → IPA phoneme string.
//!
//! Per whitespace token:
//! 1. trailing sentence punctuation is split off and re-attached literally;
//! 2. currency expressions (one or two tokens) are spelled out in words and
//!    converted recursively;
//! 3. hyphenated compounds are converted part by part and joined with a
//!    comma, which makes the acoustic model hesitate briefly;
//! 4. numbers (integers, grouped integers and decimals, ordinals,
//!    percentages, clock times) are verbalised and converted word by word;
//! 5. tokens mixing digits and letters (`5pm`, `3D`) are split into runs:
//!    digits are verbalised, short or upper-case letter runs are spelled out;
//! 6. anything else is resolved through the user override table, then the
//!    lexicon, then the spelling rules.

use std::{collections::HashMap, sync::Arc};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{trace, warn};

use crate::{
    arpabet::arpabet_to_ipa,
    currency::{match_currency, CurrencyMatch},
    lexicon::{normalize_key, Lexicon},
    numbers::{
        decimal_to_words, digits_to_words, integer_str_to_words, number_to_words,
        ordinal_to_words,
    },
    rules::rule_based_ipa,
};

/// Phonemes for a stand-alone `re` prefix ("re-enter"): the full "ree",
/// never the lexicon's unstressed reading.
const RE_PREFIX_ARPABET: &str = "R IY1";

/// Sentence punctuation kept after the word's phonemes.
const TRAILING_PUNCT: &[char] = &['.', ',', '!', '?', ';', ':', '…'];
/// Brackets and quotes stripped from token edges.
const WRAPPERS: &[char] = &[
    '"', '\'', '(', ')', '[', ']', '{', '}', '«', '»', '\u{201C}', '\u{201D}', '\u{2018}',
    '\u{2019}', '¿', '¡',
];
const HYPHENS: &[char] = &['-', '\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}'];

static RE_INTEGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<sign>[-−])?(?P<digits>[0-9]+)$").unwrap());
static RE_GROUPED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<sign>[-−])?(?P<digits>[0-9]{1,3}(?:,[0-9]{3})+(?:\.[0-9]+)?)$").unwrap()
});
static RE_DECIMAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-−]?[0-9]*\.[0-9]+$").unwrap());
static RE_ORDINAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?P<digits>[0-9]+)(?:st|nd|rd|th)$").unwrap());
static RE_PERCENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<sign>[-−])?(?P<number>[0-9]{1,3}(?:,[0-9]{3})+(?:\.[0-9]+)?|[0-9]*\.?[0-9]+)%$")
        .unwrap()
});
static RE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<hour>[0-9]{1,2}):(?P<minute>[0-5][0-9])(?P<suffix>[ap]\.?m\.?)?$").unwrap()
});

/// ARPAbet letter names, `a` to `z`.
const LETTER_NAMES: [&str; 26] = [
    "EY1", "B IY1", "S IY1", "D IY1", "IY1", "EH1 F", "JH IY1", "EY1 CH", "AY1", "JH EY1",
    "K EY1", "EH1 L", "EH1 M", "EH1 N", "OW1", "P IY1", "K Y UW1", "AA1 R", "EH1 S", "T IY1",
    "Y UW1", "V IY1", "D AH1 B AH0 L Y UW0", "EH1 K S", "W AY1", "Z IY1",
];

/// Letter runs up to this length inside a mixed token are spelled out.
const SPELLED_RUN_MAX: usize = 2;

/// Pronunciation sources handed to the engine at construction.
#[derive(Clone, Default)]
pub struct G2pConfig {
    /// User pronunciations (word → ARPAbet); consulted before the lexicon.
    pub overrides: HashMap<String, String>,
    pub lexicon: Option<Arc<dyn Lexicon>>,
}

/// Text → IPA converter.
#[derive(Clone, Default)]
pub struct G2pEngine {
    overrides: HashMap<String, String>,
    lexicon: Option<Arc<dyn Lexicon>>,
}

impl std::fmt::Debug for G2pEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("G2pEngine")
            .field("overrides", &self.overrides.len())
            .field("lexicon", &self.lexicon.is_some())
            .finish()
    }
}

/// Split `token` into (core, trailing sentence punctuation), dropping
/// wrapping quotes and brackets on either side.
fn split_punctuation(token: &str) -> (&str, String) {
    let token = token.trim_start_matches(WRAPPERS);
    let core = token.trim_end_matches(|c| TRAILING_PUNCT.contains(&c) || WRAPPERS.contains(&c));
    let trailing = token[core.len()..]
        .chars()
        .filter(|c| TRAILING_PUNCT.contains(c))
        .collect();
    (core, trailing)
}

impl G2pEngine {
    pub fn new(config: G2pConfig) -> Self {
        let mut engine = Self {
            overrides: HashMap::new(),
            lexicon: config.lexicon,
        };
        engine.set_overrides(config.overrides);
        engine
    }

    /// Replace the user override table.
    pub fn set_overrides(&mut self, overrides: HashMap<String, String>) {
        self.overrides = overrides
            .into_iter()
            .map(|(word, arpabet)| (normalize_key(&word), arpabet))
            .collect();
    }

    /// Convert a whole text to IPA, one space between words.
    pub fn convert(&self, text: &str) -> String {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let mut words = Vec::with_capacity(tokens.len());

        let mut i = 0;
        while i < tokens.len() {
            if let Some(&next) = tokens.get(i + 1) {
                let (next_core, trailing) = split_punctuation(next);
                if let Some(m) = match_currency(&[tokens[i], next_core]) {
                    if m.consumed == 2 {
                        words.push(self.currency_ipa(&m) + &trailing);
                        i += 2;
                        continue;
                    }
                }
            }
            words.push(self.convert_token(tokens[i]));
            i += 1;
        }

        words.retain(|w| !w.is_empty());
        words.join(" ")
    }

    fn convert_token(&self, token: &str) -> String {
        let (core, trailing) = split_punctuation(token);
        if core.is_empty() {
            return trailing;
        }
        self.convert_word(core) + &trailing
    }

    /// Convert one punctuation-free token.
    fn convert_word(&self, word: &str) -> String {
        if let Some(m) = match_currency(&[word]) {
            return self.currency_ipa(&m);
        }

        let parts: Vec<&str> = word.split(HYPHENS).filter(|p| !p.is_empty()).collect();
        if parts.len() > 1 {
            return self.compound_ipa(&parts);
        }

        if let Some(caps) = RE_TIME.captures(word) {
            let mut ipa = self.words_ipa(&clock_words(&caps["hour"], &caps["minute"]));
            if let Some(suffix) = caps.name("suffix") {
                ipa.push(' ');
                ipa.push_str(&letters_ipa(suffix.as_str()));
            }
            return ipa;
        }

        if let Some(words) = number_words(word) {
            return self.words_ipa(&words);
        }

        if word.chars().any(|c| c.is_ascii_digit()) {
            return self
                .known_word(word)
                .unwrap_or_else(|| self.mixed_ipa(word));
        }

        self.lookup_word(word)
    }

    /// Digit runs are verbalised, short or upper-case letter runs spelled,
    /// other letter runs looked up; anything else separates runs.
    fn mixed_ipa(&self, word: &str) -> String {
        runs(word)
            .into_iter()
            .map(|run| {
                if run.starts_with(|c: char| c.is_ascii_digit()) {
                    self.words_ipa(&integer_str_to_words(run))
                } else if run.chars().count() <= SPELLED_RUN_MAX
                    || run.chars().all(char::is_uppercase)
                {
                    letters_ipa(run)
                } else {
                    self.lookup_word(run)
                }
            })
            .filter(|ipa| !ipa.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn compound_ipa(&self, parts: &[&str]) -> String {
        parts
            .iter()
            .enumerate()
            .map(|(idx, part)| {
                if idx + 1 < parts.len() && part.eq_ignore_ascii_case("re") {
                    arpabet_to_ipa(RE_PREFIX_ARPABET)
                } else {
                    self.convert_word(part)
                }
            })
            .filter(|ipa| !ipa.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn currency_ipa(&self, m: &CurrencyMatch) -> String {
        let words = match m.to_words() {
            Ok(words) => words,
            Err(err) => {
                warn!(%err, "currency amount read literally");
                m.literal_words()
            }
        };
        self.convert(&words)
    }

    fn words_ipa(&self, words: &str) -> String {
        words
            .split_whitespace()
            .map(|w| self.lookup_word(w))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Override table, then lexicon.
    fn known_word(&self, word: &str) -> Option<String> {
        if let Some(arpabet) = self.overrides.get(&normalize_key(word)) {
            trace!(word, "pronunciation override");
            return Some(arpabet_to_ipa(arpabet));
        }
        self.lexicon
            .as_ref()
            .and_then(|lex| lex.try_get(word))
            .map(|arpabet| arpabet_to_ipa(&arpabet))
    }

    /// Override table → lexicon → spelling rules.
    fn lookup_word(&self, word: &str) -> String {
        self.known_word(word).unwrap_or_else(|| {
            trace!(word, "spelling-rule fallback");
            rule_based_ipa(word)
        })
    }
}

/// Split `word` into maximal runs of ASCII digits and of letters.
fn runs(word: &str) -> Vec<&str> {
    #[derive(PartialEq, Clone, Copy)]
    enum Class {
        Digit,
        Letter,
        Other,
    }
    let class = |c: char| {
        if c.is_ascii_digit() {
            Class::Digit
        } else if c.is_alphabetic() {
            Class::Letter
        } else {
            Class::Other
        }
    };

    let mut out = Vec::new();
    let mut start: Option<(usize, Class)> = None;
    for (i, c) in word.char_indices() {
        let k = class(c);
        match start {
            Some((_, current)) if current == k => {}
            Some((from, current)) => {
                if current != Class::Other {
                    out.push(&word[from..i]);
                }
                start = Some((i, k));
            }
            None => start = Some((i, k)),
        }
    }
    if let Some((from, current)) = start {
        if current != Class::Other {
            out.push(&word[from..]);
        }
    }
    out
}

/// Spell letters by name ("pm" → "pˈi ˈɛm").  Letters outside `a`–`z` go
/// through the spelling rules.
fn letters_ipa(letters: &str) -> String {
    letters
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'a'..='z' => arpabet_to_ipa(LETTER_NAMES[(c as u8 - b'a') as usize]),
            other => rule_based_ipa(&other.to_string()),
        })
        .filter(|ipa| !ipa.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read a clock time: "10:30" → "ten thirty", "9:05" → "nine oh five",
/// "7:00" → "seven o'clock".
fn clock_words(hour: &str, minute: &str) -> String {
    let hour = integer_str_to_words(hour);
    match minute.parse::<u64>() {
        Ok(0) => format!("{} o'clock", hour),
        Ok(m) if m < 10 => format!("{} oh {}", hour, number_to_words(m)),
        Ok(m) => format!("{} {}", hour, number_to_words(m)),
        Err(_) => format!("{} {}", hour, digits_to_words(minute)),
    }
}

/// Verbalise a numeric token, or `None` if it is not a number.
fn number_words(word: &str) -> Option<String> {
    let signed = |negative: bool, words: String| {
        if negative {
            format!("negative {}", words)
        } else {
            words
        }
    };

    if let Some(caps) = RE_INTEGER.captures(word) {
        let words = integer_str_to_words(&caps["digits"]);
        return Some(signed(caps.name("sign").is_some(), words));
    }
    if let Some(caps) = RE_GROUPED.captures(word) {
        let words = decimal_to_words(&caps["digits"].replace(',', ""));
        return Some(signed(caps.name("sign").is_some(), words));
    }
    if RE_DECIMAL.is_match(word) {
        return Some(decimal_to_words(&word.replace('−', "-")));
    }
    if let Some(caps) = RE_ORDINAL.captures(word) {
        return caps["digits"].parse::<u64>().ok().map(ordinal_to_words);
    }
    if let Some(caps) = RE_PERCENT.captures(word) {
        let words = decimal_to_words(&caps["number"].replace(',', ""));
        return Some(signed(caps.name("sign").is_some(), format!("{} percent", words)));
    }
    None
}
