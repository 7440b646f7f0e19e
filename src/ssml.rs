//! SSML segmenter — markup → ordered list of [`SpeechSegment`]s.
//!
//! Supported tags: `speak`, `break`, `prosody`, `emphasis`, `voice`,
//! `say-as`, `emotion` and `express-as`.  Any other element is walked
//! through transparently.  Input that does not start with `<` is treated
//! as plain text and becomes one default segment.
//!
//! The walk threads a [`ProsodyState`] down the tree by value: an element
//! derives its children's state from its own, and every text node is
//! stamped with the state in force at that point in the tree.

use std::time::Duration;

use roxmltree::{Document, Node};
use tracing::debug;

use crate::error::Result;

/// Pause for a `<break>` whose `time` cannot be parsed.
const DEFAULT_BREAK: Duration = Duration::from_millis(500);

/// Emphasis is applied when a segment is emitted, never carried.
const EMPHASIS_SPEED: f32 = 0.85;
const EMPHASIS_VOLUME: f32 = 1.3;

const MAX_EMOTION_INTENSITY: f32 = 1.6;

/// One span of text (or one pause) with the prosody it is spoken with.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechSegment {
    pub text: String,
    pub speed_mult: f32,
    pub volume_mult: f32,
    pub pitch_shift_semitones: f32,
    pub voice_override: Option<String>,
    pub break_before: Duration,
    pub emphasis: bool,
    pub emotion_label: Option<String>,
    pub emotion_intensity: f32,
}

impl Default for SpeechSegment {
    fn default() -> Self {
        Self {
            text: String::new(),
            speed_mult: 1.0,
            volume_mult: 1.0,
            pitch_shift_semitones: 0.0,
            voice_override: None,
            break_before: Duration::ZERO,
            emphasis: false,
            emotion_label: None,
            emotion_intensity: 1.0,
        }
    }
}

impl SpeechSegment {
    /// A pure silence marker: no text, only a pause.
    pub fn is_break(&self) -> bool {
        self.text.trim().is_empty() && self.break_before > Duration::ZERO
    }
}

/// State inherited from enclosing elements.
#[derive(Debug, Clone, PartialEq)]
struct ProsodyState {
    speed: f32,
    volume: f32,
    pitch: f32,
    voice: Option<String>,
    emphasis: bool,
    emotion: Option<String>,
    emotion_intensity: f32,
}

impl Default for ProsodyState {
    fn default() -> Self {
        Self {
            speed: 1.0,
            volume: 1.0,
            pitch: 0.0,
            voice: None,
            emphasis: false,
            emotion: None,
            emotion_intensity: 1.0,
        }
    }
}

impl ProsodyState {
    fn segment(&self, text: String) -> SpeechSegment {
        let (speed_mult, volume_mult) = if self.emphasis {
            (self.speed * EMPHASIS_SPEED, self.volume * EMPHASIS_VOLUME)
        } else {
            (self.speed, self.volume)
        };
        SpeechSegment {
            text,
            speed_mult,
            volume_mult,
            pitch_shift_semitones: self.pitch,
            voice_override: self.voice.clone(),
            break_before: Duration::ZERO,
            emphasis: self.emphasis,
            emotion_label: self.emotion.clone(),
            emotion_intensity: self.emotion_intensity,
        }
    }
}

/// The fixed tag set, with the attributes each element reads.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SsmlElement<'a> {
    Speak,
    Break {
        time: Option<&'a str>,
        strength: Option<&'a str>,
    },
    Prosody {
        rate: Option<&'a str>,
        volume: Option<&'a str>,
        pitch: Option<&'a str>,
    },
    Emphasis,
    Voice {
        name: Option<&'a str>,
    },
    SayAs {
        interpret_as: Option<&'a str>,
    },
    Emotion {
        label: Option<&'a str>,
        intensity: Option<&'a str>,
    },
    Unknown,
}

fn first_attribute<'a>(node: Node<'a, '_>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| node.attribute(*name))
        .map(str::trim)
        .find(|value| !value.is_empty())
}

impl<'a> SsmlElement<'a> {
    fn classify(node: Node<'a, '_>) -> Self {
        match node.tag_name().name().to_ascii_lowercase().as_str() {
            "speak" => Self::Speak,
            "break" => Self::Break {
                time: node.attribute("time"),
                strength: node.attribute("strength"),
            },
            "prosody" => Self::Prosody {
                rate: node.attribute("rate"),
                volume: node.attribute("volume"),
                pitch: node.attribute("pitch"),
            },
            "emphasis" => Self::Emphasis,
            "voice" => Self::Voice {
                name: first_attribute(node, &["name"]),
            },
            "say-as" => Self::SayAs {
                interpret_as: node.attribute("interpret-as"),
            },
            "emotion" | "express-as" => Self::Emotion {
                label: first_attribute(node, &["name", "emotion", "style", "type"]),
                intensity: first_attribute(node, &["intensity", "level", "styledegree"]),
            },
            _ => Self::Unknown,
        }
    }
}

/// Parse SSML (or plain text) into speech segments.
///
/// Malformed markup is an error; nothing is emitted for it.
pub fn parse(input: &str) -> Result<Vec<SpeechSegment>> {
    let trimmed = input.trim();
    if !trimmed.starts_with('<') {
        return Ok(vec![SpeechSegment {
            text: trimmed.to_string(),
            ..SpeechSegment::default()
        }]);
    }

    let wrapped;
    let markup = if trimmed.contains("<speak") {
        trimmed
    } else {
        wrapped = format!("<speak>{}</speak>", trimmed);
        &wrapped
    };

    let doc = Document::parse(markup)?;
    let mut segments = Vec::new();
    walk(doc.root_element(), ProsodyState::default(), &mut segments);
    debug!(segments = segments.len(), "parsed SSML");
    Ok(segments)
}

fn walk(node: Node<'_, '_>, state: ProsodyState, out: &mut Vec<SpeechSegment>) {
    if node.is_text() {
        if let Some(text) = node.text().map(collapse_whitespace) {
            if !text.is_empty() {
                out.push(state.segment(text));
            }
        }
        return;
    }
    if !node.is_element() {
        return;
    }

    let mut state = state;
    match SsmlElement::classify(node) {
        SsmlElement::Speak | SsmlElement::Unknown => {}
        SsmlElement::Break { time, strength } => {
            let pause = break_duration(time, strength);
            if !pause.is_zero() {
                out.push(SpeechSegment {
                    break_before: pause,
                    ..state.segment(String::new())
                });
            }
            return;
        }
        SsmlElement::Prosody { rate, volume, pitch } => {
            if let Some(speed) = rate.and_then(|r| apply_rate(state.speed, r)) {
                state.speed = speed;
            }
            if let Some(vol) = volume.and_then(|v| apply_volume(state.volume, v)) {
                state.volume = vol;
            }
            if let Some(pitch) = pitch.and_then(|p| apply_pitch(state.pitch, p)) {
                state.pitch = pitch;
            }
        }
        SsmlElement::Emphasis => state.emphasis = true,
        SsmlElement::Voice { name } => {
            if let Some(name) = name {
                state.voice = Some(name.to_string());
            }
        }
        SsmlElement::SayAs { interpret_as } => {
            let raw: String = node
                .descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect();
            let text = match interpret_as.map(str::trim) {
                Some(kind) if kind.eq_ignore_ascii_case("spell-out") => spell_out(&raw),
                _ => collapse_whitespace(&raw),
            };
            if !text.is_empty() {
                out.push(state.segment(text));
            }
            return;
        }
        SsmlElement::Emotion { label, intensity } => {
            if let Some(label) = label {
                state.emotion = Some(label.to_string());
            }
            if let Some(intensity) = intensity {
                state.emotion_intensity = parse_emotion_intensity(intensity, state.emotion_intensity);
            }
        }
    }

    for child in node.children() {
        walk(child, state.clone(), out);
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `"ABC"` → `"A, B, C"`.
fn spell_out(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(String::from)
        .collect::<Vec<_>>()
        .join(", ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Attribute values
// ─────────────────────────────────────────────────────────────────────────────

fn break_duration(time: Option<&str>, strength: Option<&str>) -> Duration {
    if let Some(time) = time {
        return parse_break_time(time).unwrap_or(DEFAULT_BREAK);
    }
    let ms = match strength.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("none") => 0,
        Some("x-weak") => 100,
        Some("weak") => 250,
        Some("strong") => 750,
        Some("x-strong") => 1000,
        _ => return DEFAULT_BREAK,
    };
    Duration::from_millis(ms)
}

/// `"250ms"` or `"1.5s"`.
fn parse_break_time(value: &str) -> Option<Duration> {
    let value = value.trim().to_ascii_lowercase();
    let (number, millis_per_unit) = if let Some(n) = value.strip_suffix("ms") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix('s') {
        (n, 1000.0)
    } else {
        return None;
    };
    let number: f64 = number.trim().parse().ok()?;
    (number.is_finite() && number >= 0.0)
        .then(|| Duration::from_secs_f64(number * millis_per_unit / 1000.0))
}

/// `"120%"` → `1.2`; `"+20%"` → `1.2`; `"-20%"` → `0.8`.
fn parse_percent_factor(value: &str) -> Option<f32> {
    let number = value.trim().strip_suffix('%')?.trim();
    let signed = number.starts_with(['+', '-']);
    let n: f32 = number.parse().ok()?;
    if !n.is_finite() {
        return None;
    }
    Some(if signed { 1.0 + n / 100.0 } else { n / 100.0 })
}

fn apply_rate(current: f32, value: &str) -> Option<f32> {
    let factor = match value.trim().to_ascii_lowercase().as_str() {
        "x-slow" => 0.6,
        "slow" => 0.8,
        "medium" | "default" => 1.0,
        "fast" => 1.25,
        "x-fast" => 1.5,
        other => parse_percent_factor(other)?,
    };
    let speed = current * factor;
    (speed > 0.0).then_some(speed)
}

fn apply_volume(current: f32, value: &str) -> Option<f32> {
    let factor = match value.trim().to_ascii_lowercase().as_str() {
        "silent" => 0.0,
        "x-soft" => 0.5,
        "soft" => 0.75,
        "medium" | "default" => 1.0,
        "loud" => 1.25,
        "x-loud" => 1.5,
        other => parse_percent_factor(other)?,
    };
    Some((current * factor).max(0.0))
}

fn apply_pitch(current: f32, value: &str) -> Option<f32> {
    let value = value.trim().to_ascii_lowercase();
    let offset = match value.as_str() {
        "x-low" => -4.0,
        "low" => -2.0,
        "medium" | "default" => 0.0,
        "high" => 2.0,
        "x-high" => 4.0,
        other => {
            if let Some(st) = other.strip_suffix("st") {
                st.trim().parse::<f32>().ok().filter(|s| s.is_finite())?
            } else {
                let ratio = parse_percent_factor(other)?;
                if ratio <= 0.0 {
                    return None;
                }
                12.0 * ratio.log2()
            }
        }
    };
    Some(current + offset)
}

/// Apply an intensity attribute to the current intensity.
///
/// Keywords and numbers scale the current value; `none` silences the
/// emotion.  Unparsable values leave it unchanged.  The result is clamped to
/// `[0, 1.6]`.
pub fn parse_emotion_intensity(value: &str, current: f32) -> f32 {
    let value = value.trim().to_ascii_lowercase();
    let next = match value.as_str() {
        "none" => 0.0,
        "x-weak" => current * 0.6,
        "weak" => current * 0.8,
        "medium" | "normal" | "moderate" => current,
        "strong" => current * 1.25,
        "x-strong" => current * 1.5,
        other => {
            let factor = parse_percent_factor(other)
                .or_else(|| other.parse::<f32>().ok().filter(|f| f.is_finite()));
            match factor {
                Some(f) => current * f,
                None => current,
            }
        }
    };
    next.clamp(0.0, MAX_EMOTION_INTENSITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TtsError;

    fn spoken(segments: &[SpeechSegment]) -> Vec<&SpeechSegment> {
        segments.iter().filter(|s| !s.is_break()).collect()
    }

    #[test]
    fn test_plain_text_fallback() {
        let segs = parse("  Hello there.  ").unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].text, "Hello there.");
        assert_eq!(segs[0].speed_mult, 1.0);
        assert_eq!(segs[0].voice_override, None);
    }

    #[test]
    fn test_voice_emotion_scenario() {
        let segs = parse(
            r#"<speak><voice name="Luna"><emotion name="happy" intensity="strong">Hi</emotion></voice></speak>"#,
        )
        .unwrap();
        let spoken = spoken(&segs);
        assert_eq!(spoken.len(), 1);
        assert_eq!(spoken[0].text, "Hi");
        assert_eq!(spoken[0].voice_override.as_deref(), Some("Luna"));
        assert_eq!(spoken[0].emotion_label.as_deref(), Some("happy"));
        assert!(spoken[0].emotion_intensity > 1.0);
    }

    #[test]
    fn test_missing_speak_is_wrapped() {
        let segs = parse(r#"<prosody rate="slow">Hi</prosody> there"#).unwrap();
        assert_eq!(segs.len(), 2);
        assert!((segs[0].speed_mult - 0.8).abs() < 1e-6);
        assert_eq!(segs[1].text, "there");
        assert_eq!(segs[1].speed_mult, 1.0);
    }

    #[test]
    fn test_malformed_markup_is_error() {
        assert!(matches!(parse("<speak><prosody>oops</speak>"), Err(TtsError::Ssml(_))));
    }

    #[test]
    fn test_break_times() {
        let segs = parse(r#"<speak>a<break time="250ms"/>b<break time="1.5s"/>c<break time="soon"/></speak>"#)
            .unwrap();
        let breaks: Vec<Duration> = segs.iter().filter(|s| s.is_break()).map(|s| s.break_before).collect();
        assert_eq!(
            breaks,
            vec![Duration::from_millis(250), Duration::from_millis(1500), DEFAULT_BREAK]
        );
    }

    #[test]
    fn test_break_strength() {
        let segs = parse(r#"<speak><break strength="x-strong"/><break strength="none"/></speak>"#).unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].break_before, Duration::from_millis(1000));
    }

    #[test]
    fn test_nested_prosody_compounds() {
        let segs = parse(
            r#"<speak><prosody rate="50%" pitch="+2st"><prosody rate="x-fast" pitch="high">x</prosody></prosody></speak>"#,
        )
        .unwrap();
        assert!((segs[0].speed_mult - 0.75).abs() < 1e-6);
        assert!((segs[0].pitch_shift_semitones - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_prosody_signed_percent_and_unknown() {
        let segs = parse(r#"<speak><prosody volume="-20%" rate="zippy">x</prosody></speak>"#).unwrap();
        assert!((segs[0].volume_mult - 0.8).abs() < 1e-6);
        assert_eq!(segs[0].speed_mult, 1.0);
    }

    #[test]
    fn test_pitch_percent_is_semitones() {
        let segs = parse(r#"<speak><prosody pitch="200%">x</prosody></speak>"#).unwrap();
        assert!((segs[0].pitch_shift_semitones - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_emphasis_applied_at_emission_only() {
        let segs = parse(r#"<speak><emphasis>loud <prosody rate="fast">quick</prosody></emphasis></speak>"#)
            .unwrap();
        assert!((segs[0].speed_mult - 0.85).abs() < 1e-6);
        assert!((segs[0].volume_mult - 1.3).abs() < 1e-6);
        // 1.25 × 0.85, emphasis not compounded twice
        assert!((segs[1].speed_mult - 1.0625).abs() < 1e-6);
        assert!(segs[1].emphasis);
    }

    #[test]
    fn test_later_siblings_do_not_leak_back() {
        let segs = parse(r#"<speak>first<prosody rate="slow">second</prosody>third</speak>"#).unwrap();
        let speeds: Vec<f32> = segs.iter().map(|s| s.speed_mult).collect();
        assert_eq!(speeds, vec![1.0, 0.8, 1.0]);
    }

    #[test]
    fn test_say_as_spell_out() {
        let segs = parse(r#"<speak><say-as interpret-as="spell-out">ABC</say-as></speak>"#).unwrap();
        assert_eq!(segs[0].text, "A, B, C");

        let segs = parse(r#"<speak><say-as interpret-as="date">ABC</say-as></speak>"#).unwrap();
        assert_eq!(segs[0].text, "ABC");
    }

    #[test]
    fn test_express_as_attributes() {
        let segs = parse(r#"<speak><express-as style=" sad " styledegree="50%">x</express-as></speak>"#)
            .unwrap();
        assert_eq!(segs[0].emotion_label.as_deref(), Some("sad"));
        assert!((segs[0].emotion_intensity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_elements_are_transparent() {
        let segs = parse(r#"<speak><p><s>Hello</s></p><mark name="m"/></speak>"#).unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].text, "Hello");
    }

    #[test]
    fn test_parse_emotion_intensity() {
        assert_eq!(parse_emotion_intensity("none", 1.0), 0.0);
        assert!((parse_emotion_intensity("x-weak", 1.0) - 0.6).abs() < 1e-6);
        assert!((parse_emotion_intensity("x-strong", 1.5) - 1.6).abs() < 1e-6);
        assert!((parse_emotion_intensity("2", 0.5) - 1.0).abs() < 1e-6);
        assert!((parse_emotion_intensity("+10%", 1.0) - 1.1).abs() < 1e-6);
        assert_eq!(parse_emotion_intensity("???", 0.7), 0.7);
        assert_eq!(parse_emotion_intensity("-5", 1.0), 0.0);
    }

    #[test]
    fn test_whitespace_only_text_skipped() {
        let segs = parse("<speak>\n  <voice name=\"a\">\n  hi\n  there </voice>\n</speak>").unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].text, "hi there");
    }
}
