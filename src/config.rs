//! Speaker configuration file (JSON).
//!
//! ```json
//! {
//!   "model_path": "kokoro.onnx",
//!   "voices_path": "voices.npz",
//!   "voice_aliases": { "Luna": "af_luna" },
//!   "pronunciation_overrides": { "kokoro": "K OW1 K ER0 OW0" },
//!   "timing": { "comma_pause": 200 }
//! }
//! ```
//!
//! Relative paths are resolved against the config file's directory.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    g2p::G2pConfig,
    lexicon::{CmuLexicon, Lexicon},
    synth::DEFAULT_TOKEN_LIMIT,
    timing::SynthesisTimingOptions,
};

fn default_voice() -> String {
    "af_heart".to_string()
}

fn unity() -> f32 {
    1.0
}

fn default_token_limit() -> usize {
    DEFAULT_TOKEN_LIMIT
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakerConfig {
    pub model_path: PathBuf,
    pub voices_path: PathBuf,

    /// Friendly name → archive key.
    #[serde(default)]
    pub voice_aliases: HashMap<String, String>,

    /// Per-voice speed multipliers, keyed by archive key.
    #[serde(default)]
    pub speed_priors: HashMap<String, f32>,

    /// Word → ARPAbet, consulted before the lexicon.
    #[serde(default)]
    pub pronunciation_overrides: HashMap<String, String>,

    /// CMU-format pronunciation dictionary.
    #[serde(default)]
    pub lexicon_path: Option<PathBuf>,

    #[serde(default = "default_voice")]
    pub default_voice: String,

    #[serde(default = "unity")]
    pub speed: f32,

    /// Global scale on every emotion's intensity.
    #[serde(default = "unity")]
    pub expressiveness: f32,

    #[serde(default = "default_token_limit")]
    pub token_limit: usize,

    /// Size of the model's embedding table; the built-in vocabulary's when absent.
    #[serde(default)]
    pub vocab_size: Option<usize>,

    #[serde(default)]
    pub style_row_offset: i64,

    #[serde(default)]
    pub timing: SynthesisTimingOptions,
}

impl SpeakerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse speaker config")
    }

    /// Read a config file, resolving its relative paths.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config: {}", path.display()))?;
        let mut config = Self::from_json(&text)
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.model_path);
        resolve(&mut self.voices_path);
        if let Some(lexicon) = self.lexicon_path.as_mut() {
            resolve(lexicon);
        }
    }

    /// Pronunciation sources for the G2P engine; reads the lexicon file.
    pub fn g2p_config(&self) -> Result<G2pConfig> {
        let lexicon = match &self.lexicon_path {
            Some(path) => Some(Arc::new(CmuLexicon::load(path)?) as Arc<dyn Lexicon>),
            None => None,
        };
        Ok(G2pConfig {
            overrides: self.pronunciation_overrides.clone(),
            lexicon,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_minimal_config_defaults() {
        let config =
            SpeakerConfig::from_json(r#"{"model_path": "m.onnx", "voices_path": "v.npz"}"#).unwrap();
        assert_eq!(config.default_voice, "af_heart");
        assert_eq!(config.speed, 1.0);
        assert_eq!(config.token_limit, DEFAULT_TOKEN_LIMIT);
        assert_eq!(config.vocab_size, None);
        assert_eq!(config.timing, SynthesisTimingOptions::default());
    }

    #[test]
    fn test_full_config() {
        let config = SpeakerConfig::from_json(
            r#"{
                "model_path": "m.onnx",
                "voices_path": "v.npz",
                "voice_aliases": {"Luna": "af_luna"},
                "speed_priors": {"af_luna": 0.9},
                "pronunciation_overrides": {"gif": "JH IH1 F"},
                "expressiveness": 1.5,
                "token_limit": 256,
                "style_row_offset": -1,
                "timing": {"comma_pause": 100}
            }"#,
        )
        .unwrap();
        assert_eq!(config.voice_aliases["Luna"], "af_luna");
        assert_eq!(config.token_limit, 256);
        assert_eq!(config.style_row_offset, -1);
        assert_eq!(config.timing.comma_pause, Duration::from_millis(100));
        assert_eq!(config.g2p_config().unwrap().overrides["gif"], "JH IH1 F");
    }

    #[test]
    fn test_missing_model_path_is_error() {
        assert!(SpeakerConfig::from_json(r#"{"voices_path": "v.npz"}"#).is_err());
    }

    #[test]
    fn test_relative_paths_resolved() {
        let dir = std::env::temp_dir().join(format!("voxsmith-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("speaker.json");
        std::fs::write(
            &path,
            r#"{"model_path": "m.onnx", "voices_path": "/abs/v.npz", "lexicon_path": "dict.txt"}"#,
        )
        .unwrap();

        let config = SpeakerConfig::load(&path).unwrap();
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(config.model_path, dir.join("m.onnx"));
        assert_eq!(config.voices_path, PathBuf::from("/abs/v.npz"));
        assert_eq!(config.lexicon_path, Some(dir.join("dict.txt")));
    }
}
