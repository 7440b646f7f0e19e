//! # voxsmith
//!
//! Text and SSML to speech for Kokoro-style ONNX voice models
//! (`(token ids, style vector, speed) → 24 kHz waveform`).
//!
//! ## Quick start
//!
//! ```no_run
//! use voxsmith::{Speaker, SpeakerConfig};
//!
//! let config = SpeakerConfig::load(std::path::Path::new("speaker.json")).unwrap();
//! let speaker = Speaker::from_config(&config).unwrap();
//!
//! // Plain text: punctuation drives the pauses.
//! let audio = speaker.say("Hello, world. How are you?").unwrap();
//!
//! // SSML: voices, prosody, emphasis, breaks and emotions.
//! speaker
//!     .say_to_file(
//!         r#"<speak><voice name="Luna"><emotion name="happy" intensity="strong">Hi!</emotion></voice></speak>"#,
//!         std::path::Path::new("hi.wav"),
//!     )
//!     .unwrap();
//! # let _ = audio;
//! ```
//!
//! ## Pipeline
//! 1. **Segmentation** — SSML → segments with inherited prosody and emotion
//!    ([`ssml`]); plain text is split at pause cues ([`pauses`]).
//! 2. **Emotion** — label + intensity → volume, pitch, speed and a style
//!    row blend ([`emotion`]).
//! 3. **G2P** — overrides → lexicon → spelling rules, with numbers and
//!    currency spelled out ([`g2p`]).
//! 4. **Tokenisation** — IPA characters → model ids, boundary-wrapped
//!    ([`tokenize`]); long inputs are chunked to the token limit ([`synth`]).
//! 5. **Inference** — any [`InferenceBackend`]; [`OnnxBackend`] runs ONNX
//!    Runtime.
//! 6. **Post-processing** — pitch, volume, saturation, limiting, inflection,
//!    trimming and fades ([`dsp`]).

pub mod arpabet;
pub mod config;
pub mod currency;
pub mod dsp;
pub mod emotion;
pub mod error;
pub mod g2p;
pub mod lexicon;
pub mod model;
pub mod npz;
pub mod numbers;
pub mod orchestrator;
pub mod pauses;
pub mod rules;
pub mod speaker;
pub mod ssml;
pub mod style;
pub mod synth;
pub mod timing;
pub mod tokenize;
pub mod wav;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use config::SpeakerConfig;
pub use dsp::SAMPLE_RATE;
pub use error::{Result, TtsError};
pub use g2p::{G2pConfig, G2pEngine};
pub use lexicon::{CmuLexicon, Lexicon};
pub use model::OnnxBackend;
pub use speaker::Speaker;
pub use ssml::SpeechSegment;
pub use style::{StyleMatrix, StyleStore};
pub use synth::{InferenceBackend, SegmentSynthesizer, Synthesizer};
pub use timing::SynthesisTimingOptions;
pub use tokenize::Tokenizer;
pub use wav::write_wav;
