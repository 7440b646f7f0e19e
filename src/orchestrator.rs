//! Utterance assembly: pause-cue splitting and SSML segment rendering.
//!
//! Both paths sit on top of a [`SegmentSynthesizer`], so they can be driven
//! by a fake synthesizer in tests.

use std::time::Duration;

use tracing::{debug, trace};

use crate::{
    dsp::{
        apply_peak_limiter, apply_pitch_shift, apply_soft_clip, apply_tail_inflection,
        apply_volume, concatenate, generate_silence, SEGMENT_PEAK,
    },
    emotion::{resolve, ResolvedEmotion},
    error::Result,
    pauses::{contains_pause_cue, split, InflectionIntent},
    ssml::SpeechSegment,
    synth::SegmentSynthesizer,
    timing::SynthesisTimingOptions,
};

/// Saturation drive for emotions that tend to distort.
const DISTORTION_DRIVE: f32 = 1.5;

/// Voice, speed and style shared by every piece of one text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Delivery<'a> {
    pub voice: &'a str,
    pub speed: f32,
    pub style_row: Option<i64>,
    pub blend: f32,
}

impl<'a> Delivery<'a> {
    pub fn plain(voice: &'a str, speed: f32) -> Self {
        Self {
            voice,
            speed,
            style_row: None,
            blend: 0.0,
        }
    }
}

/// Synthesize one text, splitting it at pause cues first.
///
/// Pieces are synthesized with the same delivery.  Pauses go only between
/// spoken pieces; pauses of empty pieces accumulate into the next gap, up
/// to `max_aggregated_pause`.
pub fn synthesize_text<S>(
    synth: &S,
    text: &str,
    delivery: Delivery<'_>,
    timing: &SynthesisTimingOptions,
) -> Result<Vec<f32>>
where
    S: SegmentSynthesizer + ?Sized,
{
    let Delivery {
        voice,
        speed,
        style_row,
        blend,
    } = delivery;

    if !contains_pause_cue(text) {
        return synth.synthesize(text, voice, speed, style_row, blend);
    }

    let pieces = split(text, timing);
    trace!(pieces = pieces.len(), "split at pause cues");

    let mut parts: Vec<Vec<f32>> = Vec::with_capacity(pieces.len() * 2);
    let mut pending = Duration::ZERO;
    for piece in &pieces {
        if !piece.text.trim().is_empty() {
            let mut audio = synth.synthesize(&piece.text, voice, speed, style_row, blend)?;
            if !audio.is_empty() {
                if !parts.is_empty() && !pending.is_zero() {
                    parts.push(generate_silence(pending.min(timing.max_aggregated_pause)));
                }
                pending = Duration::ZERO;
                if matches!(
                    piece.intent,
                    InflectionIntent::Question | InflectionIntent::Exclamation
                ) {
                    apply_tail_inflection(&mut audio, piece.intent, timing);
                }
                parts.push(audio);
            }
        }
        pending += piece.pause_after;
    }
    Ok(concatenate(parts))
}

/// Speaker-level settings applied to every SSML segment.
#[derive(Debug, Clone, Copy)]
pub struct RenderSettings<'a> {
    pub default_voice: &'a str,
    pub speed: f32,
    pub expressiveness: f32,
    pub timing: &'a SynthesisTimingOptions,
}

/// Shape one segment's audio: pitch, volume, saturation, ceiling.
fn shape_segment(audio: Vec<f32>, segment: &SpeechSegment, emotion: &ResolvedEmotion) -> Vec<f32> {
    let semitones = segment.pitch_shift_semitones + emotion.pitch_semitones;
    let mut audio = apply_pitch_shift(&audio, semitones);

    let volume = (segment.volume_mult * emotion.volume_mult).clamp(0.0, emotion.volume_cap());
    apply_volume(&mut audio, volume);
    if emotion.distortion_prone {
        apply_soft_clip(&mut audio, DISTORTION_DRIVE);
    }
    apply_peak_limiter(&mut audio, SEGMENT_PEAK);
    audio
}

/// Render SSML segments in order into one buffer.
pub fn render_segments<S>(
    synth: &S,
    segments: &[SpeechSegment],
    settings: &RenderSettings<'_>,
) -> Result<Vec<f32>>
where
    S: SegmentSynthesizer + ?Sized,
{
    let mut parts: Vec<Vec<f32>> = Vec::with_capacity(segments.len());
    for segment in segments {
        if !segment.break_before.is_zero() {
            parts.push(generate_silence(segment.break_before));
        }
        if segment.text.trim().is_empty() {
            continue;
        }

        let emotion = resolve(
            segment.emotion_label.as_deref(),
            segment.emotion_intensity,
            settings.expressiveness,
        );
        let delivery = Delivery {
            voice: segment.voice_override.as_deref().unwrap_or(settings.default_voice),
            speed: settings.speed * segment.speed_mult * emotion.speed_mult,
            style_row: emotion.style_row,
            blend: emotion.style_blend,
        };
        debug!(
            voice = delivery.voice,
            speed = delivery.speed,
            emotion = emotion.emotion.unwrap_or("neutral"),
            "rendering segment"
        );

        let audio = synthesize_text(synth, &segment.text, delivery, settings.timing)?;
        if audio.is_empty() {
            continue;
        }
        parts.push(shape_segment(audio, segment, &emotion));
    }
    Ok(concatenate(parts))
}

#[cfg(test)]
mod tests {
    use std::{f32::consts::PI, sync::Mutex};

    use super::*;
    use crate::{
        dsp::{samples_for, SAMPLE_RATE},
        ssml::parse,
    };

    /// 100 samples per character at 0.5; records every request.
    #[derive(Default)]
    struct Fake {
        calls: Mutex<Vec<(String, String, f32, Option<i64>, f32)>>,
    }

    impl SegmentSynthesizer for Fake {
        fn synthesize(
            &self,
            text: &str,
            voice: &str,
            speed: f32,
            style_row: Option<i64>,
            blend: f32,
        ) -> Result<Vec<f32>> {
            let text = text.trim();
            self.calls
                .lock()
                .unwrap()
                .push((text.to_string(), voice.to_string(), speed, style_row, blend));
            Ok(vec![0.5; text.chars().count() * 100])
        }
    }

    fn calls(fake: &Fake) -> Vec<String> {
        fake.calls.lock().unwrap().iter().map(|c| c.0.clone()).collect()
    }

    #[test]
    fn test_no_cue_goes_straight_through() {
        let fake = Fake::default();
        let t = SynthesisTimingOptions::default();
        let audio = synthesize_text(&fake, "hi there", Delivery::plain("v", 1.0), &t).unwrap();
        assert_eq!(audio.len(), 800);
        assert_eq!(calls(&fake), vec!["hi there"]);
    }

    #[test]
    fn test_pauses_between_spoken_pieces() {
        let fake = Fake::default();
        let t = SynthesisTimingOptions {
            inflection_enabled: false,
            ..SynthesisTimingOptions::default()
        };
        let audio = synthesize_text(&fake, "Hello, world. How are you?", Delivery::plain("v", 1.0), &t)
            .unwrap();
        assert_eq!(calls(&fake), vec!["Hello", "world.", "How are you?"]);
        let speech = (5 + 6 + 12) * 100;
        let gaps = samples_for(t.comma_pause) + samples_for(t.period_pause);
        // trailing question pause is dropped
        assert_eq!(audio.len(), speech + gaps);
    }

    /// One second of a 220 Hz tone per request, whatever the text.
    struct Tone;

    impl SegmentSynthesizer for Tone {
        fn synthesize(&self, _: &str, _: &str, _: f32, _: Option<i64>, _: f32) -> Result<Vec<f32>> {
            Ok(tone())
        }
    }

    fn tone() -> Vec<f32> {
        (0..SAMPLE_RATE as usize)
            .map(|i| 0.3 * (2.0 * PI * 220.0 * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    #[test]
    fn test_question_and_exclamation_tails_inflected() {
        let t = SynthesisTimingOptions::default();
        assert!(t.inflection_enabled);
        let raw = tone();
        let n = raw.len();
        let window = samples_for(t.inflection_window);

        for text in ["Really? Fine.", "Wow! Fine."] {
            let audio = synthesize_text(&Tone, text, Delivery::plain("v", 1.0), &t).unwrap();
            assert!(audio.len() >= 2 * n);

            let (first, last) = (&audio[..n], &audio[audio.len() - n..]);
            // the window ends at the last sample above the activity threshold,
            // a few samples before the buffer end
            let head = n - window - 100;
            assert_eq!(&first[..head], &raw[..head], "{}", text);
            let bent = first[n - window..]
                .iter()
                .zip(&raw[n - window..])
                .filter(|(a, b)| (*a - *b).abs() > 1e-3)
                .count();
            assert!(bent > window / 4, "{}: tail untouched", text);

            // the statement piece is left alone
            assert_eq!(last, &raw[..], "{}", text);
        }
    }

    #[test]
    fn test_inflection_disabled_leaves_tails() {
        let t = SynthesisTimingOptions {
            inflection_enabled: false,
            ..SynthesisTimingOptions::default()
        };
        let raw = tone();
        let audio = synthesize_text(&Tone, "Really? Fine.", Delivery::plain("v", 1.0), &t).unwrap();
        assert_eq!(&audio[..raw.len()], &raw[..]);
    }

    #[test]
    fn test_empty_pieces_aggregate_and_cap() {
        let fake = Fake::default();
        let t = SynthesisTimingOptions {
            max_aggregated_pause: Duration::from_millis(700),
            ..SynthesisTimingOptions::default()
        };
        // comma 250 + semicolon 350 + colon 300 = 900, capped to 700
        let audio = synthesize_text(&fake, "a,;:b", Delivery::plain("v", 1.0), &t).unwrap();
        assert_eq!(audio.len(), 200 + samples_for(Duration::from_millis(700)));
    }

    #[test]
    fn test_leading_pause_dropped() {
        let fake = Fake::default();
        let t = SynthesisTimingOptions::default();
        let audio = synthesize_text(&fake, "...go", Delivery::plain("v", 1.0), &t).unwrap();
        assert_eq!(audio.len(), 200);
    }

    #[test]
    fn test_ssml_segments_carry_voice_and_emotion() {
        let fake = Fake::default();
        let t = SynthesisTimingOptions::default();
        let segments = parse(
            r#"<speak>plain<break time="100ms"/><voice name="Luna"><emotion name="happy" intensity="strong">Hi</emotion></voice></speak>"#,
        )
        .unwrap();
        let settings = RenderSettings {
            default_voice: "default",
            speed: 1.0,
            expressiveness: 1.0,
            timing: &t,
        };
        let audio = render_segments(&fake, &segments, &settings).unwrap();

        let recorded = fake.calls.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].1, "default");
        assert_eq!(recorded[0].3, None);
        assert_eq!(recorded[1].1, "Luna");
        assert!(recorded[1].2 > 1.0);
        assert!(recorded[1].3.is_some());
        assert!(recorded[1].4 > 0.0);

        assert_eq!(audio.len(), 500 + samples_for(Duration::from_millis(100)) + 200);
        assert!(audio.iter().all(|s| s.abs() <= SEGMENT_PEAK + 1e-6));
    }

    #[test]
    fn test_distortion_prone_volume_capped() {
        let segment = SpeechSegment {
            text: "x".into(),
            volume_mult: 1.5,
            ..SpeechSegment::default()
        };
        let angry = resolve(Some("angry"), 1.0, 1.0);
        let shaped = shape_segment(vec![0.5; 10], &segment, &angry);
        // 0.5 × 1.08 then saturated
        let expected = (0.5f32 * 1.08 * DISTORTION_DRIVE).atan() / DISTORTION_DRIVE.atan();
        assert!((shaped[0] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_silent_volume() {
        let segment = SpeechSegment {
            text: "x".into(),
            volume_mult: 0.0,
            ..SpeechSegment::default()
        };
        let shaped = shape_segment(vec![0.5; 10], &segment, &ResolvedEmotion::NEUTRAL);
        assert!(shaped.iter().all(|&s| s == 0.0));
    }
}
