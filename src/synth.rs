//! Per-segment synthesis: text → token ids → style vector → model → samples.
//!
//! [`Synthesizer`] owns everything one inference call needs and keeps each
//! request inside the model's token budget by chunking on word, then
//! character, boundaries.  Pause cues and SSML are handled one level up, in
//! [`crate::orchestrator`], through the [`SegmentSynthesizer`] trait.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::{
    dsp::{concatenate, generate_silence, peak},
    error::{Result, TtsError},
    style::StyleStore,
    timing::SynthesisTimingOptions,
    tokenize::Tokenizer,
};

/// Inputs beyond this many ids (boundaries included) are chunked.
pub const DEFAULT_TOKEN_LIMIT: usize = 500;

/// Model output whose peak stays below this is treated as no output.
pub const NEAR_SILENCE_PEAK: f32 = 1e-3;

/// Characters that already end an utterance.
const TERMINAL_PUNCTUATION: &[char] = &['.', '!', '?', '…', ',', ';', ':'];

/// The acoustic model: `(ids, style, speed) → waveform`.
pub trait InferenceBackend: Send + Sync {
    fn infer(&self, token_ids: &[i64], style: &[f32], speed: f32) -> anyhow::Result<Vec<f32>>;
}

/// Text of one segment → samples, with style and voice already decided.
pub trait SegmentSynthesizer {
    /// `style_row` is blended over the token-count row with weight `blend`;
    /// `None` uses the token-count row alone.
    fn synthesize(
        &self,
        text: &str,
        voice: &str,
        speed: f32,
        style_row: Option<i64>,
        blend: f32,
    ) -> Result<Vec<f32>>;
}

/// One token-limited piece of a long input.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenChunk {
    pub text: String,
    pub ids: Vec<i64>,
}

/// Append `.` unless the text already ends in punctuation.
pub fn ensure_terminal_punctuation(text: &str) -> String {
    let text = text.trim();
    match text.chars().last() {
        None => String::new(),
        Some(c) if TERMINAL_PUNCTUATION.contains(&c) => text.to_string(),
        Some(_) => format!("{}.", text),
    }
}

/// Tokeniser + style store + model, plus voice metadata.
pub struct Synthesizer {
    tokenizer: Tokenizer,
    styles: StyleStore,
    backend: Box<dyn InferenceBackend>,
    voice_aliases: HashMap<String, String>,
    speed_priors: HashMap<String, f32>,
    token_limit: usize,
    timing: SynthesisTimingOptions,
}

impl std::fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synthesizer")
            .field("tokenizer", &self.tokenizer)
            .field("voices", &self.styles.voices())
            .field("token_limit", &self.token_limit)
            .finish_non_exhaustive()
    }
}

impl Synthesizer {
    pub fn new(
        tokenizer: Tokenizer,
        styles: StyleStore,
        backend: Box<dyn InferenceBackend>,
    ) -> Self {
        Self {
            tokenizer,
            styles,
            backend,
            voice_aliases: HashMap::new(),
            speed_priors: HashMap::new(),
            token_limit: DEFAULT_TOKEN_LIMIT,
            timing: SynthesisTimingOptions::default(),
        }
    }

    pub fn with_voice_aliases(mut self, aliases: HashMap<String, String>) -> Self {
        self.voice_aliases = aliases;
        self
    }

    pub fn with_speed_priors(mut self, priors: HashMap<String, f32>) -> Self {
        self.speed_priors = priors;
        self
    }

    pub fn with_token_limit(mut self, limit: usize) -> Self {
        self.token_limit = limit;
        self
    }

    pub fn with_timing(mut self, timing: SynthesisTimingOptions) -> Self {
        self.timing = timing;
        self
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn tokenizer_mut(&mut self) -> &mut Tokenizer {
        &mut self.tokenizer
    }

    pub fn styles(&self) -> &StyleStore {
        &self.styles
    }

    pub fn timing(&self) -> &SynthesisTimingOptions {
        &self.timing
    }

    pub fn set_timing(&mut self, timing: SynthesisTimingOptions) {
        self.timing = timing;
    }

    pub fn token_limit(&self) -> usize {
        self.token_limit
    }

    /// Alias → archive key; unknown names pass through unchanged.
    pub fn resolve_voice<'a>(&'a self, voice: &'a str) -> &'a str {
        self.voice_aliases.get(voice).map(String::as_str).unwrap_or(voice)
    }

    fn speed_prior(&self, voice_key: &str) -> f32 {
        self.speed_priors.get(voice_key).copied().unwrap_or(1.0)
    }

    /// Run the model on prepared ids.  Near-silent output comes back empty.
    pub fn infer_ids(
        &self,
        ids: &[i64],
        voice: &str,
        speed: f32,
        style_row: Option<i64>,
        blend: f32,
    ) -> Result<Vec<f32>> {
        let voice_key = self.resolve_voice(voice);
        let speed = speed * self.speed_prior(voice_key);
        let base_row = self.styles.row_for_token_count(ids.len());
        let style = match style_row {
            Some(row) if blend > 0.0 => self.styles.load_blended(voice_key, row, blend, base_row)?,
            _ => self.styles.load_row(voice_key, base_row)?,
        };

        trace!(voice = voice_key, tokens = ids.len(), speed, ?style_row, blend, "inference");
        let audio = self.backend.infer(ids, &style, speed)?;
        if peak(&audio) < NEAR_SILENCE_PEAK {
            debug!(voice = voice_key, tokens = ids.len(), "discarding near-silent model output");
            return Ok(Vec::new());
        }
        Ok(audio)
    }

    fn fits(&self, text: &str) -> Result<Option<Vec<i64>>> {
        let ids = self.tokenizer.process(text)?;
        Ok((ids.len() <= self.token_limit).then_some(ids))
    }

    /// Split `text` greedily into pieces that each tokenise within the limit.
    ///
    /// Words are packed first; a word too long on its own is packed
    /// character by character.  A single character over the limit is an
    /// error.
    pub fn chunk(&self, text: &str) -> Result<Vec<TokenChunk>> {
        let mut chunks = Vec::new();
        let mut current: Option<TokenChunk> = None;

        for word in text.split_whitespace() {
            let candidate = match &current {
                Some(chunk) => format!("{} {}", chunk.text, word),
                None => word.to_string(),
            };
            if let Some(ids) = self.fits(&candidate)? {
                current = Some(TokenChunk { text: candidate, ids });
                continue;
            }
            chunks.extend(current.take());

            if let Some(ids) = self.fits(word)? {
                current = Some(TokenChunk {
                    text: word.to_string(),
                    ids,
                });
                continue;
            }

            for c in word.chars() {
                let candidate = match &current {
                    Some(chunk) => format!("{}{}", chunk.text, c),
                    None => c.to_string(),
                };
                if let Some(ids) = self.fits(&candidate)? {
                    current = Some(TokenChunk { text: candidate, ids });
                    continue;
                }
                chunks.extend(current.take());

                let unit = c.to_string();
                let ids = self.tokenizer.process(&unit)?;
                if ids.len() > self.token_limit {
                    return Err(TtsError::TokenLimitExceeded {
                        unit,
                        tokens: ids.len(),
                        limit: self.token_limit,
                    });
                }
                current = Some(TokenChunk { text: unit, ids });
            }
        }
        chunks.extend(current);
        Ok(chunks)
    }
}

impl SegmentSynthesizer for Synthesizer {
    fn synthesize(
        &self,
        text: &str,
        voice: &str,
        speed: f32,
        style_row: Option<i64>,
        blend: f32,
    ) -> Result<Vec<f32>> {
        let text = ensure_terminal_punctuation(text);
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let ids = self.tokenizer.process(&text)?;
        if ids.len() <= self.token_limit {
            return self.infer_ids(&ids, voice, speed, style_row, blend);
        }

        let chunks = self.chunk(&text)?;
        debug!(
            tokens = ids.len(),
            limit = self.token_limit,
            chunks = chunks.len(),
            "input over token limit, chunking"
        );

        let mut parts: Vec<Vec<f32>> = Vec::with_capacity(chunks.len() * 2);
        for chunk in &chunks {
            let audio = self.infer_ids(&chunk.ids, voice, speed, style_row, blend)?;
            if audio.is_empty() {
                continue;
            }
            if !parts.is_empty() {
                parts.push(generate_silence(self.timing.chunk_join_pause));
            }
            parts.push(audio);
        }
        Ok(concatenate(parts))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{g2p::G2pEngine, style::StyleMatrix};

    /// Emits 10 samples per token and records every call.
    #[derive(Default, Clone)]
    struct Recorder {
        calls: Arc<Mutex<Vec<(Vec<i64>, Vec<f32>, f32)>>>,
    }

    impl InferenceBackend for Recorder {
        fn infer(&self, ids: &[i64], style: &[f32], speed: f32) -> anyhow::Result<Vec<f32>> {
            self.calls.lock().unwrap().push((ids.to_vec(), style.to_vec(), speed));
            Ok(vec![0.5; ids.len() * 10])
        }
    }

    struct Silent;

    impl InferenceBackend for Silent {
        fn infer(&self, ids: &[i64], _: &[f32], _: f32) -> anyhow::Result<Vec<f32>> {
            Ok(vec![1e-4; ids.len()])
        }
    }

    fn styles() -> StyleStore {
        let data = (0..8).flat_map(|i| [i as f32, -(i as f32)]).collect();
        StyleStore::from_matrices([("af_luna", StyleMatrix::new(8, 2, data).unwrap())])
    }

    fn synth(backend: Box<dyn InferenceBackend>) -> Synthesizer {
        Synthesizer::new(Tokenizer::new(G2pEngine::default()), styles(), backend)
    }

    #[test]
    fn test_ensure_terminal_punctuation() {
        assert_eq!(ensure_terminal_punctuation(" hi "), "hi.");
        assert_eq!(ensure_terminal_punctuation("hi?"), "hi?");
        assert_eq!(ensure_terminal_punctuation("   "), "");
    }

    #[test]
    fn test_direct_uses_token_count_row_and_aliases() {
        let rec = Recorder::default();
        let s = synth(Box::new(rec.clone()))
            .with_voice_aliases(HashMap::from([("Luna".to_string(), "af_luna".to_string())]))
            .with_speed_priors(HashMap::from([("af_luna".to_string(), 0.8)]));

        let audio = s.synthesize("cat", "Luna", 1.5, None, 0.0).unwrap();
        let calls = rec.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (ids, style, speed) = &calls[0];
        // "cat." → k ˈ æ t . plus boundaries
        assert_eq!(ids.len(), 7);
        assert_eq!(audio.len(), 70);
        // row max(1, 6) = 6
        assert_eq!(style, &vec![6.0, -6.0]);
        assert!((speed - 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_emotion_row_is_blended() {
        let rec = Recorder::default();
        let s = synth(Box::new(rec.clone()));
        s.synthesize("cat", "af_luna", 1.0, Some(2), 0.5).unwrap();
        let calls = rec.calls.lock().unwrap();
        // base 6, target 2, halfway
        assert_eq!(calls[0].1, vec![4.0, -4.0]);
    }

    #[test]
    fn test_unknown_voice_fails() {
        let s = synth(Box::new(Recorder::default()));
        assert!(matches!(
            s.synthesize("cat", "nobody", 1.0, None, 0.0),
            Err(TtsError::UnknownVoice { .. })
        ));
    }

    #[test]
    fn test_near_silent_output_is_empty() {
        let s = synth(Box::new(Silent));
        assert!(s.synthesize("cat", "af_luna", 1.0, None, 0.0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_text_skips_model() {
        let rec = Recorder::default();
        let s = synth(Box::new(rec.clone()));
        assert!(s.synthesize("  ", "af_luna", 1.0, None, 0.0).unwrap().is_empty());
        assert!(rec.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_chunks_respect_limit() {
        let s = synth(Box::new(Recorder::default())).with_token_limit(20);
        let text = "cat ".repeat(30);
        let chunks = s.chunk(&text).unwrap();
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.ids.len() <= 20);
            assert_eq!(s.tokenizer().process(&chunk.text).unwrap(), chunk.ids);
        }
        let words: usize = chunks.iter().map(|c| c.text.split_whitespace().count()).sum();
        assert_eq!(words, 30);
    }

    #[test]
    fn test_long_word_split_by_characters() {
        let s = synth(Box::new(Recorder::default())).with_token_limit(6);
        let chunks = s.chunk("abcdefghij").unwrap();
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.ids.len() <= 6));
        let rejoined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(rejoined, "abcdefghij");
    }

    #[test]
    fn test_limit_too_small_for_one_character() {
        let s = synth(Box::new(Recorder::default())).with_token_limit(2);
        match s.chunk("cat") {
            Err(TtsError::TokenLimitExceeded { unit, limit, .. }) => {
                assert_eq!(unit, "c");
                assert_eq!(limit, 2);
            }
            other => panic!("expected TokenLimitExceeded, got {:?}", other),
        }
    }
}
