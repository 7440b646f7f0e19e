//! Error taxonomy for the synthesis pipeline.
//!
//! Structural and configuration failures are fatal and surface here.
//! Degenerate input (empty text, near-silent model output) is never an
//! error: those paths return an empty waveform instead.

use thiserror::Error;

/// Errors produced while turning text or SSML into a waveform.
#[derive(Debug, Error)]
pub enum TtsError {
    /// The SSML markup is not well-formed XML.
    #[error("malformed SSML: {0}")]
    Ssml(#[from] roxmltree::Error),

    /// A phoneme mapped to an id the model's embedding table cannot hold.
    #[error("token id {id} is outside the model vocabulary (size {vocab_size})")]
    VocabularyMismatch { id: i64, vocab_size: usize },

    /// A unit of text that cannot be split further still exceeds the
    /// model's input limit.
    #[error("{unit:?} needs {tokens} tokens, above the model limit of {limit}")]
    TokenLimitExceeded {
        unit: String,
        tokens: usize,
        limit: usize,
    },

    /// The style store has no matrix for this voice.
    #[error("voice '{voice}' not found. Available: {available:?}")]
    UnknownVoice {
        voice: String,
        available: Vec<String>,
    },

    /// The inference backend failed.
    #[error("inference failed: {0:#}")]
    Inference(#[from] anyhow::Error),
}

/// Result type for the synthesis pipeline.
pub type Result<T> = std::result::Result<T, TtsError>;
