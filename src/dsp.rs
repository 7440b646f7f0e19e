//! Waveform post-processing.
//!
//! Stateless functions over mono `f32` buffers at [`SAMPLE_RATE`].  Stages
//! that only rescale work in place; stages that change length (pitch shift,
//! silence, concatenation) return a new buffer.

use std::{f32::consts::PI, time::Duration};

use crate::{pauses::InflectionIntent, timing::SynthesisTimingOptions};

/// Output sample rate of the voice model.
pub const SAMPLE_RATE: u32 = 24_000;

/// Ceiling applied to every rendered segment.
pub const SEGMENT_PEAK: f32 = 0.92;
/// Peak of the finished utterance.
pub const UTTERANCE_PEAK: f32 = 0.95;

const FADE_IN: Duration = Duration::from_millis(10);
const FADE_OUT: Duration = Duration::from_millis(150);

/// Trim analysis block length, and blocks kept after the last active one.
const TRIM_BLOCK: Duration = Duration::from_millis(20);
const TRIM_MARGIN_BLOCKS: usize = 3;
const TRIM_RELATIVE_RMS: f32 = 0.02;

/// Overlap-add window (40 ms), hopped at 50 %.
const OLA_WINDOW: usize = 960;
const OLA_HOP: usize = OLA_WINDOW / 2;

/// Number of samples spanning `duration`.
pub fn samples_for(duration: Duration) -> usize {
    (duration.as_secs_f64() * SAMPLE_RATE as f64).round() as usize
}

pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

/// Multiply by `gain` and hard-clip to `[-1, 1]`.
pub fn apply_volume(samples: &mut [f32], gain: f32) {
    if (gain - 1.0).abs() <= 0.001 {
        return;
    }
    for s in samples.iter_mut() {
        *s = (*s * gain).clamp(-1.0, 1.0);
    }
}

/// `atan(x·drive) / atan(drive)` saturation.
pub fn apply_soft_clip(samples: &mut [f32], drive: f32) {
    if drive <= 1.0 {
        return;
    }
    let norm = drive.atan();
    for s in samples.iter_mut() {
        *s = (*s * drive).atan() / norm;
    }
}

/// Scale the whole buffer down so its peak is at most `max_abs`.
pub fn apply_peak_limiter(samples: &mut [f32], max_abs: f32) {
    let p = peak(samples);
    if p > max_abs && p > 0.0 {
        let gain = max_abs / p;
        samples.iter_mut().for_each(|s| *s *= gain);
    }
}

/// Scale the whole buffer so its peak equals `target`.
pub fn normalize_peak(samples: &mut [f32], target: f32) {
    let p = peak(samples);
    if p > 0.0 {
        let gain = target / p;
        samples.iter_mut().for_each(|s| *s *= gain);
    }
}

/// Read `samples` at a fractional step, linearly interpolating.
fn resample(samples: &[f32], step: f32) -> Vec<f32> {
    let len = (samples.len() as f32 / step).floor() as usize;
    (0..len)
        .map(|i| {
            let pos = i as f32 * step;
            let i0 = pos.floor() as usize;
            let frac = pos - i0 as f32;
            let a = samples[i0.min(samples.len() - 1)];
            let b = samples[(i0 + 1).min(samples.len() - 1)];
            a + (b - a) * frac
        })
        .collect()
}

fn hann(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / len as f32).cos()))
        .collect()
}

/// Overlap-add time stretch of `input` to exactly `out_len` samples.
fn ola_stretch(input: &[f32], out_len: usize) -> Vec<f32> {
    let window = hann(OLA_WINDOW);
    let analysis_hop = OLA_HOP as f32 * input.len() as f32 / out_len as f32;

    let mut output = vec![0.0f32; out_len];
    let mut weight = vec![0.0f32; out_len];

    let mut frame = 0usize;
    while frame * OLA_HOP < out_len {
        let src = (frame as f32 * analysis_hop).round() as usize;
        let dst = frame * OLA_HOP;
        for (j, &w) in window.iter().enumerate() {
            let (Some(&x), Some(out)) = (input.get(src + j), output.get_mut(dst + j)) else {
                continue;
            };
            *out += x * w;
            weight[dst + j] += w;
        }
        frame += 1;
    }

    for (s, w) in output.iter_mut().zip(&weight) {
        if *w > 1e-3 {
            *s /= w;
        }
    }
    output
}

/// Shift pitch by `semitones` keeping the duration.
///
/// Resamples by `2^(semitones/12)` then overlap-adds the result back to the
/// input length.  Buffers shorter than one window are returned as is.
pub fn apply_pitch_shift(samples: &[f32], semitones: f32) -> Vec<f32> {
    if semitones.abs() < 0.01 || !semitones.is_finite() || samples.len() < OLA_WINDOW {
        return samples.to_vec();
    }
    let ratio = 2f32.powf(semitones / 12.0);
    let shifted = resample(samples, ratio);
    if shifted.is_empty() {
        return samples.to_vec();
    }
    ola_stretch(&shifted, samples.len())
}

pub fn generate_silence(duration: Duration) -> Vec<f32> {
    vec![0.0; samples_for(duration)]
}

pub fn concatenate<I, S>(parts: I) -> Vec<f32>
where
    I: IntoIterator<Item = S>,
    S: AsRef<[f32]>,
{
    let mut out = Vec::new();
    for part in parts {
        out.extend_from_slice(part.as_ref());
    }
    out
}

/// Cut trailing near-silence, keeping a short margin after the last block
/// whose RMS exceeds 2 % of the loudest block's.
pub fn trim_trailing_silence(samples: &mut Vec<f32>) {
    let block = samples_for(TRIM_BLOCK).max(1);
    let rms: Vec<f32> = samples
        .chunks(block)
        .map(|c| (c.iter().map(|s| s * s).sum::<f32>() / c.len() as f32).sqrt())
        .collect();
    let peak_rms = rms.iter().copied().fold(0.0f32, f32::max);
    let threshold = peak_rms * TRIM_RELATIVE_RMS;

    match rms.iter().rposition(|&r| r > threshold) {
        Some(last) => {
            let keep = ((last + 1 + TRIM_MARGIN_BLOCKS) * block).min(samples.len());
            samples.truncate(keep);
        }
        None => samples.clear(),
    }
}

pub fn apply_fade_in(samples: &mut [f32], duration: Duration) {
    let n = samples_for(duration).min(samples.len());
    for (i, s) in samples[..n].iter_mut().enumerate() {
        *s *= i as f32 / n as f32;
    }
}

pub fn apply_fade_out(samples: &mut [f32], duration: Duration) {
    let n = samples_for(duration).min(samples.len());
    let start = samples.len() - n;
    for (i, s) in samples[start..].iter_mut().enumerate() {
        *s *= (n - 1 - i) as f32 / n as f32;
    }
}

/// Finish an utterance: trim, pad, normalise, fade.
pub fn process_audio(mut samples: Vec<f32>, trailing_pause: Duration) -> Vec<f32> {
    trim_trailing_silence(&mut samples);
    if samples.is_empty() {
        return samples;
    }
    samples.extend(generate_silence(trailing_pause));
    normalize_peak(&mut samples, UTTERANCE_PEAK);
    apply_fade_in(&mut samples, FADE_IN);
    apply_fade_out(&mut samples, FADE_OUT);
    samples
}

/// Bend the spoken tail of a segment up for `?` and `!`.
///
/// The tail window ends at the last sample above the activity threshold.
/// It is pitch-shifted (and, for exclamations, ramped in gain), then
/// cross-faded over the original so the bend grows toward the end.
pub fn apply_tail_inflection(
    samples: &mut [f32],
    intent: InflectionIntent,
    timing: &SynthesisTimingOptions,
) {
    if !timing.inflection_enabled {
        return;
    }
    let (semitones, end_gain) = match intent {
        InflectionIntent::Question => (timing.question_rise_semitones, 1.0),
        InflectionIntent::Exclamation => {
            (timing.exclamation_rise_semitones, timing.exclamation_end_gain)
        }
        InflectionIntent::None | InflectionIntent::Statement => return,
    };

    let threshold = timing.inflection_activity_threshold;
    let Some(end) = samples.iter().rposition(|s| s.abs() > threshold) else {
        return;
    };
    let window = samples_for(timing.inflection_window).min(end + 1);
    if window < 2 {
        return;
    }
    let start = end + 1 - window;

    let tail = &mut samples[start..=end];
    let shifted = apply_pitch_shift(tail, semitones);
    let denom = (window - 1) as f32;
    for (j, (orig, bent)) in tail.iter_mut().zip(shifted).enumerate() {
        let t = j as f32 / denom;
        let gain = 1.0 + (end_gain - 1.0) * t;
        *orig = *orig * (1.0 - t) + bent * gain * t;
    }
    apply_peak_limiter(samples, SEGMENT_PEAK);
}

#[cfg(test)]
mod tests {
    use rustfft::{num_complex::Complex, FftPlanner};

    use super::*;

    fn tone(freq: f32, seconds: f32, amp: f32) -> Vec<f32> {
        let n = (seconds * SAMPLE_RATE as f32) as usize;
        (0..n)
            .map(|i| amp * (2.0 * PI * freq * i as f32 / SAMPLE_RATE as f32).sin())
            .collect()
    }

    fn dominant_frequency(samples: &[f32]) -> f32 {
        let n = samples.len();
        let mut buf: Vec<Complex<f32>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
        FftPlanner::<f32>::new().plan_fft_forward(n).process(&mut buf);
        let (bin, _) = buf[1..n / 2]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
            .unwrap();
        (bin + 1) as f32 * SAMPLE_RATE as f32 / n as f32
    }

    #[test]
    fn test_volume() {
        let mut s = vec![0.5, -0.8];
        apply_volume(&mut s, 1.0005);
        assert_eq!(s, vec![0.5, -0.8]);
        apply_volume(&mut s, 2.0);
        assert_eq!(s, vec![1.0, -1.0]);
    }

    #[test]
    fn test_soft_clip() {
        let mut s = vec![0.3, -0.3];
        apply_soft_clip(&mut s, 1.0);
        assert_eq!(s, vec![0.3, -0.3]);

        let mut s = vec![1.0, 0.5, 0.0, -1.0];
        apply_soft_clip(&mut s, 1.5);
        assert!((s[0] - 1.0).abs() < 1e-6);
        assert!((s[3] + 1.0).abs() < 1e-6);
        assert!(s[1] > 0.5 && s[1] < 1.0);
        assert_eq!(s[2], 0.0);
    }

    #[test]
    fn test_peak_limiter_idempotent() {
        let mut once = vec![0.1, -1.4, 0.7];
        apply_peak_limiter(&mut once, SEGMENT_PEAK);
        assert!((peak(&once) - SEGMENT_PEAK).abs() < 1e-6);
        let mut twice = once.clone();
        apply_peak_limiter(&mut twice, SEGMENT_PEAK);
        assert_eq!(once, twice);

        let mut quiet = vec![0.2, -0.1];
        apply_peak_limiter(&mut quiet, SEGMENT_PEAK);
        assert_eq!(quiet, vec![0.2, -0.1]);
    }

    #[test]
    fn test_pitch_shift_octave_doubles_frequency() {
        let input = tone(220.0, 1.0, 0.5);
        let output = apply_pitch_shift(&input, 12.0);
        assert_eq!(output.len(), input.len());
        let ratio = dominant_frequency(&output) / dominant_frequency(&input);
        assert!((1.8..=2.2).contains(&ratio), "ratio {}", ratio);
    }

    #[test]
    fn test_pitch_shift_noop() {
        let input = tone(220.0, 0.1, 0.5);
        assert_eq!(apply_pitch_shift(&input, 0.005), input);
        let short = vec![0.1; 100];
        assert_eq!(apply_pitch_shift(&short, 3.0), short);
    }

    #[test]
    fn test_silence_and_concat() {
        let silence = generate_silence(Duration::from_millis(250));
        assert_eq!(silence.len(), 6000);
        let joined = concatenate([vec![1.0; 3], silence, vec![2.0; 2]]);
        assert_eq!(joined.len(), 6005);
        assert_eq!(joined[6004], 2.0);
    }

    #[test]
    fn test_trim_keeps_margin() {
        let block = samples_for(TRIM_BLOCK);
        let mut s = tone(200.0, 0.2, 0.5);
        let voiced = s.len();
        s.extend(vec![0.0; block * 20]);
        trim_trailing_silence(&mut s);
        assert_eq!(s.len(), voiced + TRIM_MARGIN_BLOCKS * block);

        let mut silent = vec![0.0; 1000];
        trim_trailing_silence(&mut silent);
        assert!(silent.is_empty());
    }

    #[test]
    fn test_process_audio() {
        let out = process_audio(tone(200.0, 0.5, 0.3), Duration::from_millis(250));
        assert!(out.len() >= 12_000 + 6_000);
        assert!((peak(&out) - UTTERANCE_PEAK).abs() < 0.01);
        assert_eq!(out[0], 0.0);
        assert_eq!(*out.last().unwrap(), 0.0);
        assert!(process_audio(Vec::new(), Duration::from_millis(250)).is_empty());
    }

    #[test]
    fn test_tail_inflection_touches_only_the_tail() {
        let timing = SynthesisTimingOptions::default();
        let original = tone(180.0, 0.6, 0.5);
        let mut bent = original.clone();
        apply_tail_inflection(&mut bent, InflectionIntent::Question, &timing);

        let window = samples_for(timing.inflection_window);
        let head = original.len() - window;
        let scale = SEGMENT_PEAK / peak(&original).max(SEGMENT_PEAK);
        for i in (0..head).step_by(97) {
            assert!((bent[i] - original[i] * scale).abs() < 1e-4);
        }
        assert!(bent[head..].iter().zip(&original[head..]).any(|(a, b)| (a - b).abs() > 1e-3));
        assert!(peak(&bent) <= SEGMENT_PEAK + 1e-6);
    }

    #[test]
    fn test_tail_inflection_disabled_or_statement() {
        let mut timing = SynthesisTimingOptions::default();
        let original = tone(180.0, 0.3, 0.5);

        let mut s = original.clone();
        apply_tail_inflection(&mut s, InflectionIntent::Statement, &timing);
        assert_eq!(s, original);

        timing.inflection_enabled = false;
        apply_tail_inflection(&mut s, InflectionIntent::Exclamation, &timing);
        assert_eq!(s, original);
    }
}
