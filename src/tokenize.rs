//! Phoneme tokeniser — text → model input ids.
//!
//! Runs the G2P engine, maps every IPA character independently through a
//! fixed vocabulary, and wraps the sequence in the boundary token on both
//! ends.
//!
//! The vocabulary is the Kokoro/StyleTTS2 symbol list:
//!   `[pad] + punctuation + letters + ipa_letters`
//!
//! Characters outside the vocabulary are dropped silently.  An id that the
//! model's embedding table cannot hold is a hard error: it means the voice
//! model and this vocabulary disagree.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::{
    error::{Result, TtsError},
    g2p::G2pEngine,
};

// ─────────────────────────────────────────────────────────────────────────────
// Vocabulary definition: char ordering is the model's id ordering
// ─────────────────────────────────────────────────────────────────────────────

/// Boundary (BOS/EOS) symbol.
const PAD: char = '$';

/// Characters: ; : , . ! ? ¡ ¿ — … " « » " "  (space at end)
const PUNCTUATION: &str = ";:,.!?¡¿—…\u{201C}«»\u{201D}\" ";

const LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// The combining character ̩ (U+0329) and curly quotes are individual entries.
const IPA_LETTERS: &str =
    "ɑɐɒæɓʙβɔɕçɗɖðʤəɘɚɛɜɝɞɟʄɡɠɢʛɦɧħɥʜɨɪʝɭɬɫɮʟɱɯɰŋɳɲɴøɵɸθœɶʘɹɺɾɻʀʁɽʂʃʈʧʉʊʋⱱʌɣɤʍχʎʏʑʐʒʔʡʕʢǀǁǂǃˈˌːˑʼʴʰʱʲʷˠˤ˞↓↑→↗↘\u{2019}\u{0329}\u{2018}ᵻ";

static VOCAB: Lazy<HashMap<char, i64>> = Lazy::new(|| {
    std::iter::once(PAD)
        .chain(PUNCTUATION.chars())
        .chain(LETTERS.chars())
        .chain(IPA_LETTERS.chars())
        .enumerate()
        .map(|(i, c)| (c, i as i64))
        .collect()
});

/// Number of symbols in the built-in vocabulary.
pub fn vocab_len() -> usize {
    VOCAB.len()
}

/// Map a character to its vocabulary index, `None` for unknowns.
pub fn char_to_id(c: char) -> Option<i64> {
    VOCAB.get(&c).copied()
}

/// Map an IPA string to ids, without boundary tokens.
pub fn ipa_to_ids(ipa: &str) -> Vec<i64> {
    ipa.chars().filter_map(char_to_id).collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokenizer
// ─────────────────────────────────────────────────────────────────────────────

/// G2P + vocabulary lookup with a model-specific vocabulary size.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    g2p: G2pEngine,
    vocab_size: usize,
    boundary_id: i64,
}

impl Tokenizer {
    /// Tokeniser whose vocabulary size is the built-in table's.
    pub fn new(g2p: G2pEngine) -> Self {
        Self::with_vocab_size(g2p, vocab_len())
    }

    /// Tokeniser for a model whose embedding table holds `vocab_size` ids.
    pub fn with_vocab_size(g2p: G2pEngine, vocab_size: usize) -> Self {
        Self {
            g2p,
            vocab_size,
            boundary_id: char_to_id(PAD).unwrap_or(0),
        }
    }

    pub fn g2p(&self) -> &G2pEngine {
        &self.g2p
    }

    pub fn g2p_mut(&mut self) -> &mut G2pEngine {
        &mut self.g2p
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Text → `[boundary, ids…, boundary]`.
    pub fn process(&self, text: &str) -> Result<Vec<i64>> {
        let ipa = self.g2p.convert(text);
        self.ipa_to_model_ids(&ipa)
    }

    /// IPA → `[boundary, ids…, boundary]`, checked against the model's
    /// vocabulary size.
    pub fn ipa_to_model_ids(&self, ipa: &str) -> Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(ipa.len() + 2);
        ids.push(self.boundary_id);
        ids.extend(ipa_to_ids(ipa));
        ids.push(self.boundary_id);

        if let Some(&id) = ids.iter().find(|&&id| id < 0 || id as usize >= self.vocab_size) {
            return Err(TtsError::VocabularyMismatch {
                id,
                vocab_size: self.vocab_size,
            });
        }
        Ok(ids)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
