//! Pause and inflection timing.
//!
//! Every duration is stored as a [`Duration`] and (de)serialised as whole
//! milliseconds, so a config file reads `"comma_pause": 250`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Named durations and flags for every pause the pipeline inserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisTimingOptions {
    #[serde(with = "millis")]
    pub comma_pause: Duration,
    #[serde(with = "millis")]
    pub period_pause: Duration,
    #[serde(with = "millis")]
    pub question_pause: Duration,
    #[serde(with = "millis")]
    pub exclamation_pause: Duration,
    #[serde(with = "millis")]
    pub semicolon_pause: Duration,
    #[serde(with = "millis")]
    pub colon_pause: Duration,
    #[serde(with = "millis")]
    pub ellipsis_pause: Duration,
    #[serde(with = "millis")]
    pub em_dash_pause: Duration,
    #[serde(with = "millis")]
    pub newline_pause: Duration,

    /// Ceiling for consecutive pauses merged across empty segments.
    #[serde(with = "millis")]
    pub max_aggregated_pause: Duration,
    /// Silence between token-limit chunks of one sentence.
    #[serde(with = "millis")]
    pub chunk_join_pause: Duration,
    /// Silence appended to the finished utterance.
    #[serde(with = "millis")]
    pub trailing_pause: Duration,

    /// Reshape the audio tail after `?` and `!`.
    pub inflection_enabled: bool,
    /// Length of the reshaped tail.
    #[serde(with = "millis")]
    pub inflection_window: Duration,
    pub question_rise_semitones: f32,
    pub exclamation_rise_semitones: f32,
    /// Gain reached at the very end of an exclamation tail.
    pub exclamation_end_gain: f32,
    /// Samples quieter than this are not part of the spoken tail.
    pub inflection_activity_threshold: f32,
}

impl Default for SynthesisTimingOptions {
    fn default() -> Self {
        Self {
            comma_pause: Duration::from_millis(250),
            period_pause: Duration::from_millis(450),
            question_pause: Duration::from_millis(500),
            exclamation_pause: Duration::from_millis(450),
            semicolon_pause: Duration::from_millis(350),
            colon_pause: Duration::from_millis(300),
            ellipsis_pause: Duration::from_millis(600),
            em_dash_pause: Duration::from_millis(300),
            newline_pause: Duration::from_millis(500),
            max_aggregated_pause: Duration::from_millis(1500),
            chunk_join_pause: Duration::from_millis(120),
            trailing_pause: Duration::from_millis(250),
            inflection_enabled: true,
            inflection_window: Duration::from_millis(220),
            question_rise_semitones: 1.5,
            exclamation_rise_semitones: 0.7,
            exclamation_end_gain: 1.12,
            inflection_activity_threshold: 0.02,
        }
    }
}

/// `base × clamp(repeats, 1, 4)`.
pub fn scaled_pause(base: Duration, repeats: usize) -> Duration {
    base * repeats.clamp(1, 4) as u32
}
