//! Emotion label + intensity → prosody modifiers and style-row selection.
//!
//! Each canonical emotion has a profile of full-intensity deltas (volume,
//! pitch, speed) and an ordered list of style-matrix rows, one per intensity
//! bucket.  Unknown or absent labels resolve to neutral.

/// Full-intensity prosody deltas for one emotion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionProfile {
    pub volume_scale: f32,
    pub pitch_semitones: f32,
    pub speed_scale: f32,
}

const NEUTRAL: EmotionProfile = EmotionProfile {
    volume_scale: 1.0,
    pitch_semitones: 0.0,
    speed_scale: 1.0,
};

struct EmotionEntry {
    name: &'static str,
    profile: EmotionProfile,
    /// Style rows for increasing intensity.
    style_rows: &'static [i64],
    distortion_prone: bool,
}

const fn entry(
    name: &'static str,
    (volume_scale, pitch_semitones, speed_scale): (f32, f32, f32),
    style_rows: &'static [i64],
    distortion_prone: bool,
) -> EmotionEntry {
    EmotionEntry {
        name,
        profile: EmotionProfile {
            volume_scale,
            pitch_semitones,
            speed_scale,
        },
        style_rows,
        distortion_prone,
    }
}

static EMOTIONS: &[EmotionEntry] = &[
    entry("neutral", (1.0, 0.0, 1.0), &[], false),
    entry("happy", (1.06, 0.6, 1.06), &[64, 120, 200], false),
    entry("sad", (0.88, -0.6, 0.88), &[24, 72, 150], false),
    entry("angry", (1.12, 0.3, 1.08), &[96, 160, 240], true),
    entry("excited", (1.12, 0.75, 1.12), &[110, 190, 280], true),
    entry("fearful", (0.95, 0.5, 1.1), &[40, 100, 170], true),
    entry("calm", (0.92, -0.2, 0.92), &[16, 48], false),
    entry("surprised", (1.08, 0.75, 1.04), &[80, 140, 220], false),
    entry("disgusted", (0.98, -0.3, 0.95), &[56, 130], false),
];

const ALIASES: &[(&str, &str)] = &[
    ("joyful", "happy"),
    ("cheerful", "happy"),
    ("glad", "happy"),
    ("friendly", "happy"),
    ("furious", "angry"),
    ("mad", "angry"),
    ("annoyed", "angry"),
    ("unhappy", "sad"),
    ("sorrowful", "sad"),
    ("depressed", "sad"),
    ("afraid", "fearful"),
    ("scared", "fearful"),
    ("terrified", "fearful"),
    ("fear", "fearful"),
    ("enthusiastic", "excited"),
    ("thrilled", "excited"),
    ("relaxed", "calm"),
    ("gentle", "calm"),
    ("serene", "calm"),
    ("astonished", "surprised"),
    ("amazed", "surprised"),
    ("shocked", "surprised"),
    ("disgust", "disgusted"),
    ("default", "neutral"),
    ("normal", "neutral"),
];

fn lookup(label: &str) -> Option<&'static EmotionEntry> {
    let key = label.trim().to_lowercase();
    let canonical = ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(key.as_str());
    EMOTIONS.iter().find(|e| e.name == canonical)
}

/// Outcome of [`resolve`], applied by the orchestrator to one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedEmotion {
    pub emotion: Option<&'static str>,
    pub distortion_prone: bool,
    pub volume_mult: f32,
    pub pitch_semitones: f32,
    pub speed_mult: f32,
    pub style_row: Option<i64>,
    pub style_blend: f32,
}

impl ResolvedEmotion {
    pub const NEUTRAL: Self = Self {
        emotion: None,
        distortion_prone: false,
        volume_mult: 1.0,
        pitch_semitones: 0.0,
        speed_mult: 1.0,
        style_row: None,
        style_blend: 0.0,
    };

    /// Highest volume multiplier a segment may reach under this emotion.
    pub fn volume_cap(&self) -> f32 {
        if self.distortion_prone {
            1.08
        } else {
            1.2
        }
    }
}

/// Resolve a segment's emotion against the speaker's global expressiveness.
pub fn resolve(label: Option<&str>, intensity: f32, expressiveness: f32) -> ResolvedEmotion {
    let Some(entry) = label.and_then(lookup) else {
        return ResolvedEmotion::NEUTRAL;
    };
    if entry.style_rows.is_empty() && entry.profile == NEUTRAL {
        return ResolvedEmotion {
            emotion: Some(entry.name),
            ..ResolvedEmotion::NEUTRAL
        };
    }

    let effective = (intensity * expressiveness.max(0.0)).clamp(0.0, 2.5);
    let i = effective.clamp(0.0, 2.0);
    if i == 0.0 {
        return ResolvedEmotion {
            emotion: Some(entry.name),
            ..ResolvedEmotion::NEUTRAL
        };
    }

    let p = entry.profile;
    let rows = entry.style_rows;
    let style_row = (!rows.is_empty()).then(|| {
        let mut bucket = if i < 0.9 {
            0
        } else if i < 1.25 {
            1
        } else {
            rows.len() - 1
        };
        bucket = bucket.min(rows.len() - 1);
        if entry.distortion_prone && rows.len() > 1 {
            bucket = bucket.min(rows.len() - 2);
        }
        rows[bucket]
    });

    let mut style_blend = (0.22 + i * 0.20).clamp(0.22, 0.62);
    if entry.distortion_prone {
        style_blend = style_blend.min(0.36);
    }

    ResolvedEmotion {
        emotion: Some(entry.name),
        distortion_prone: entry.distortion_prone,
        volume_mult: 1.0 + (p.volume_scale - 1.0) * i,
        pitch_semitones: (p.pitch_semitones * i).clamp(-0.75, 0.75),
        speed_mult: 1.0 + (p.speed_scale - 1.0) * i,
        style_row,
        style_blend,
    }
}
