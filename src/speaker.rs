//! [`Speaker`] — the public entry point: text or SSML in, finished waveform out.

use std::{collections::HashMap, path::Path};

use tracing::info;

use crate::{
    config::SpeakerConfig,
    dsp::process_audio,
    error::Result,
    g2p::G2pEngine,
    model::OnnxBackend,
    orchestrator::{render_segments, RenderSettings},
    ssml,
    style::StyleStore,
    synth::{InferenceBackend, Synthesizer},
    timing::SynthesisTimingOptions,
    tokenize::Tokenizer,
    wav::write_wav,
};

/// A voice model plus the speaker-level settings applied to every request.
///
/// Requests borrow the speaker immutably and every setter needs `&mut self`,
/// so a request always sees one consistent configuration.
#[derive(Debug)]
pub struct Speaker {
    synth: Synthesizer,
    voice: String,
    speed: f32,
    expressiveness: f32,
}

impl Speaker {
    pub fn new(synth: Synthesizer, voice: impl Into<String>) -> Self {
        Self {
            synth,
            voice: voice.into(),
            speed: 1.0,
            expressiveness: 1.0,
        }
    }

    /// Load the ONNX model, voice archive and lexicon named by `config`.
    pub fn from_config(config: &SpeakerConfig) -> anyhow::Result<Self> {
        let backend = OnnxBackend::load(&config.model_path)?;
        Self::from_config_with_backend(config, Box::new(backend))
    }

    /// As [`Speaker::from_config`], with a caller-supplied model.
    pub fn from_config_with_backend(
        config: &SpeakerConfig,
        backend: Box<dyn InferenceBackend>,
    ) -> anyhow::Result<Self> {
        let styles =
            StyleStore::load(&config.voices_path)?.with_row_offset(config.style_row_offset);
        let g2p = G2pEngine::new(config.g2p_config()?);
        let tokenizer = match config.vocab_size {
            Some(size) => Tokenizer::with_vocab_size(g2p, size),
            None => Tokenizer::new(g2p),
        };
        let synth = Synthesizer::new(tokenizer, styles, backend)
            .with_voice_aliases(config.voice_aliases.clone())
            .with_speed_priors(config.speed_priors.clone())
            .with_token_limit(config.token_limit)
            .with_timing(config.timing.clone());

        info!(
            voices = synth.styles().voices().len(),
            default_voice = %config.default_voice,
            "speaker ready"
        );
        Ok(Self::new(synth, config.default_voice.clone())
            .with_speed(config.speed)
            .with_expressiveness(config.expressiveness))
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_expressiveness(mut self, expressiveness: f32) -> Self {
        self.expressiveness = expressiveness;
        self
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    /// Voices available in the loaded archive.
    pub fn voices(&self) -> Vec<String> {
        self.synth.styles().voices()
    }

    pub fn timing(&self) -> &SynthesisTimingOptions {
        self.synth.timing()
    }

    pub fn synthesizer(&self) -> &Synthesizer {
        &self.synth
    }

    pub fn set_voice(&mut self, voice: impl Into<String>) {
        self.voice = voice.into();
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn set_expressiveness(&mut self, expressiveness: f32) {
        self.expressiveness = expressiveness;
    }

    pub fn set_timing(&mut self, timing: SynthesisTimingOptions) {
        self.synth.set_timing(timing);
    }

    /// Replace the word → ARPAbet override table.
    pub fn set_pronunciation_overrides(&mut self, overrides: HashMap<String, String>) {
        self.synth.tokenizer_mut().g2p_mut().set_overrides(overrides);
    }

    /// Synthesize text or SSML into one finished waveform at
    /// [`crate::SAMPLE_RATE`].  Empty input gives an empty waveform.
    pub fn say(&self, input: &str) -> Result<Vec<f32>> {
        let segments = ssml::parse(input)?;
        let timing = self.synth.timing();
        let settings = RenderSettings {
            default_voice: &self.voice,
            speed: self.speed,
            expressiveness: self.expressiveness,
            timing,
        };
        let audio = render_segments(&self.synth, &segments, &settings)?;
        let audio = process_audio(audio, timing.trailing_pause);
        info!(segments = segments.len(), samples = audio.len(), "synthesized");
        Ok(audio)
    }

    /// [`Speaker::say`], written to a WAV file.
    pub fn say_to_file(&self, input: &str, path: &Path) -> anyhow::Result<()> {
        let audio = self.say(input)?;
        write_wav(&audio, path)
    }
}
