//! Punctuation-driven pause segmentation for plain text.
//!
//! A single left-to-right scan splits text at pause cues.  Each segment
//! carries the pause that follows it and, for sentence-final punctuation,
//! the inflection the audio tail should get.  Terminal `.`, `?` and `!` stay
//! in the segment text (the acoustic model uses them); commas, semicolons,
//! colons, dashes, ellipses and line breaks are consumed.

use std::time::Duration;

use crate::timing::{scaled_pause, SynthesisTimingOptions};

/// How the end of a segment should sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InflectionIntent {
    #[default]
    None,
    Statement,
    Question,
    Exclamation,
}

/// One span of plain text and the pause after it.
#[derive(Debug, Clone, PartialEq)]
pub struct PauseSegment {
    pub text: String,
    pub pause_after: Duration,
    pub intent: InflectionIntent,
}

/// Fast check: does `text` contain anything [`split`] would act on?
pub fn contains_pause_cue(text: &str) -> bool {
    text.contains("...")
        || text.chars().any(|c| {
            matches!(
                c,
                '\r' | '\n' | '…' | '—' | ',' | ';' | ':' | '.' | '?' | '!'
            )
        })
}

/// Letter, digit or hyphen: a dot between two of these is not a sentence end.
fn is_joiner(c: char) -> bool {
    c.is_alphanumeric() || c == '-'
}

struct Scanner<'a> {
    chars: Vec<char>,
    timing: &'a SynthesisTimingOptions,
    segments: Vec<PauseSegment>,
    buffer: String,
}

impl<'a> Scanner<'a> {
    fn run_len(&self, at: usize, c: char) -> usize {
        self.chars[at..].iter().take_while(|&&x| x == c).count()
    }

    fn prev(&self, at: usize) -> Option<char> {
        at.checked_sub(1).map(|j| self.chars[j])
    }

    fn next(&self, at: usize) -> Option<char> {
        self.chars.get(at + 1).copied()
    }

    fn between(&self, at: usize, pred: fn(char) -> bool) -> bool {
        matches!((self.prev(at), self.next(at)), (Some(p), Some(n)) if pred(p) && pred(n))
    }

    fn flush(&mut self, pause_after: Duration, intent: InflectionIntent) {
        self.segments.push(PauseSegment {
            text: std::mem::take(&mut self.buffer),
            pause_after,
            intent,
        });
    }

    /// Handle the character at `i`, returning how many characters were used.
    fn step(&mut self, i: usize) -> usize {
        let t = self.timing;
        let c = self.chars[i];
        match c {
            '—' => {
                let run = self.run_len(i, '—');
                self.flush(scaled_pause(t.em_dash_pause, run), InflectionIntent::None);
                run
            }
            '.' => {
                let run = self.run_len(i, '.');
                if run >= 3 {
                    self.buffer.push_str(&".".repeat(run % 3));
                    self.flush(scaled_pause(t.ellipsis_pause, run / 3), InflectionIntent::None);
                    run
                } else if self.between(i, |c| c.is_ascii_digit()) || self.between(i, is_joiner) {
                    self.buffer.push('.');
                    1
                } else {
                    self.buffer.push('.');
                    self.flush(t.period_pause, InflectionIntent::Statement);
                    1
                }
            }
            '…' => {
                let run = self.run_len(i, '…');
                self.flush(scaled_pause(t.ellipsis_pause, run), InflectionIntent::None);
                run
            }
            '?' | '!' => {
                let run = self.run_len(i, c);
                self.buffer.extend(std::iter::repeat(c).take(run));
                let (base, intent) = if c == '?' {
                    (t.question_pause, InflectionIntent::Question)
                } else {
                    (t.exclamation_pause, InflectionIntent::Exclamation)
                };
                self.flush(scaled_pause(base, run), intent);
                run
            }
            ',' if !self.between(i, |c| c.is_ascii_digit()) => {
                self.flush(t.comma_pause, InflectionIntent::None);
                1
            }
            ';' => {
                self.flush(t.semicolon_pause, InflectionIntent::None);
                1
            }
            ':' if !self.between(i, |c| c.is_ascii_digit()) && !self.is_url_scheme(i) => {
                self.flush(t.colon_pause, InflectionIntent::None);
                1
            }
            '\r' | '\n' => {
                let mut j = i;
                let mut breaks = 0;
                while j < self.chars.len() && matches!(self.chars[j], '\r' | '\n') {
                    j += if self.chars[j] == '\r' && self.chars.get(j + 1) == Some(&'\n') {
                        2
                    } else {
                        1
                    };
                    breaks += 1;
                }
                self.flush(scaled_pause(t.newline_pause, breaks), InflectionIntent::None);
                j - i
            }
            other => {
                self.buffer.push(other);
                1
            }
        }
    }

    /// `scheme://`: a colon after a letter, followed by two slashes.
    fn is_url_scheme(&self, at: usize) -> bool {
        self.prev(at).is_some_and(char::is_alphabetic)
            && self.chars.get(at + 1) == Some(&'/')
            && self.chars.get(at + 2) == Some(&'/')
    }
}

/// Split `text` at pause cues.
///
/// The list always ends with a final segment holding whatever followed the
/// last cue (possibly empty) and no pause.
pub fn split(text: &str, timing: &SynthesisTimingOptions) -> Vec<PauseSegment> {
    let mut scanner = Scanner {
        chars: text.chars().collect(),
        timing,
        segments: Vec::new(),
        buffer: String::new(),
    };

    let mut i = 0;
    while i < scanner.chars.len() {
        i += scanner.step(i);
    }
    scanner.flush(Duration::ZERO, InflectionIntent::None);
    scanner.segments
}
