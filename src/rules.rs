//! Rule-based grapheme-to-phoneme fallback for out-of-vocabulary words.
//!
//! Greedy left-to-right scan: at each position the longest matching
//! grapheme pattern from [`GRAPHEME_RULES`] wins, after a handful of
//! positional rules (word-initial `kn`/`gn`, silent `gh`).  Single letters
//! fall through to context rules: soft `c`/`g` before `e`/`i`/`y`, `y` as
//! consonant or vowel by position, a silent trailing `e` that lengthens the
//! vowel before it, and doubled consonants collapsed to one.

/// Multi-letter spelling patterns, matched longest first.
const GRAPHEME_RULES: &[(&str, &str)] = &[
    // four letters
    ("tion", "ʃən"),
    ("sion", "ʒən"),
    ("ough", "ɔ"),
    ("ight", "aɪt"),
    ("eigh", "eɪ"),
    // three letters
    ("tch", "ʧ"),
    ("dge", "ʤ"),
    ("igh", "aɪ"),
    ("sch", "sk"),
    ("air", "ɛɹ"),
    ("ear", "ɪɹ"),
    // consonant digraphs
    ("th", "θ"),
    ("sh", "ʃ"),
    ("ch", "ʧ"),
    ("ck", "k"),
    ("ph", "f"),
    ("wh", "w"),
    ("wr", "ɹ"),
    ("ng", "ŋ"),
    ("qu", "kw"),
    // vowel digraphs
    ("ee", "i"),
    ("ea", "i"),
    ("ai", "eɪ"),
    ("ay", "eɪ"),
    ("ei", "eɪ"),
    ("ey", "eɪ"),
    ("oa", "oʊ"),
    ("oo", "u"),
    ("ou", "aʊ"),
    ("ow", "oʊ"),
    ("oi", "ɔɪ"),
    ("oy", "ɔɪ"),
    ("ue", "u"),
    ("ew", "u"),
    ("au", "ɔ"),
    ("aw", "ɔ"),
    ("ie", "i"),
    // r-controlled vowels
    ("ar", "ɑɹ"),
    ("er", "ɚ"),
    ("ir", "ɝ"),
    ("or", "ɔɹ"),
    ("ur", "ɝ"),
];

const MAX_PATTERN: usize = 4;

const IPA_VOWELS: &str = "ɑæʌɔaɛɝeɪiouʊəɚ";

fn is_vowel_letter(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn is_consonant_letter(c: char) -> bool {
    c.is_ascii_lowercase() && !is_vowel_letter(c)
}

fn lookup_pattern(pattern: &str) -> Option<&'static str> {
    GRAPHEME_RULES
        .iter()
        .find(|(g, _)| *g == pattern)
        .map(|(_, ipa)| *ipa)
}

fn long_vowel(c: char) -> &'static str {
    match c {
        'a' => "eɪ",
        'e' => "i",
        'i' => "aɪ",
        'o' => "oʊ",
        _ => "u",
    }
}

fn short_vowel(c: char) -> &'static str {
    match c {
        'a' => "æ",
        'e' => "ɛ",
        'i' => "ɪ",
        'o' => "ɑ",
        _ => "ʌ",
    }
}

/// Spell out `word` phonetically using English spelling rules.
///
/// Non-letters are ignored.  A primary stress mark is placed before the
/// first vowel.
pub fn rule_based_ipa(word: &str) -> String {
    let chars: Vec<char> = word
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase())
        .collect();
    let n = chars.len();

    // Silent trailing `e` after a consonant; a single vowel right before
    // that consonant becomes long ("make", "time", "phone").
    let silent_e = n > 2
        && chars[n - 1] == 'e'
        && is_consonant_letter(chars[n - 2])
        && chars[..n - 2].iter().any(|&c| is_vowel_letter(c));
    let end = if silent_e { n - 1 } else { n };
    let long_at = (silent_e
        && n >= 3
        && is_vowel_letter(chars[n - 3])
        && (n < 4 || !is_vowel_letter(chars[n - 4])))
    .then(|| n - 3);

    let mut out = String::new();
    let mut i = 0;
    'scan: while i < end {
        let c = chars[i];
        let next = chars.get(i + 1).copied().filter(|_| i + 1 < end);

        if i > 0 && is_consonant_letter(c) && chars[i - 1] == c {
            i += 1;
            continue;
        }
        if i == 0 && matches!(c, 'k' | 'g') && next == Some('n') {
            out.push('n');
            i += 2;
            continue;
        }
        if i > 0 && c == 'g' && next == Some('h') && is_vowel_letter(chars[i - 1]) {
            i += 2;
            continue;
        }

        if Some(i) != long_at {
            for len in (2..=MAX_PATTERN.min(end - i)).rev() {
                let pattern: String = chars[i..i + len].iter().collect();
                if let Some(ipa) = lookup_pattern(&pattern) {
                    out.push_str(ipa);
                    i += len;
                    continue 'scan;
                }
            }
        }

        match c {
            v if is_vowel_letter(v) => {
                if Some(i) == long_at {
                    out.push_str(long_vowel(v));
                } else {
                    out.push_str(short_vowel(v));
                }
            }
            'y' => {
                if i == 0 {
                    out.push('j');
                } else if i == end - 1 {
                    out.push_str(if n <= 3 { "aɪ" } else { "i" });
                } else {
                    out.push('ɪ');
                }
            }
            'c' => {
                if next.is_some_and(|nc| "eiy".contains(nc)) {
                    out.push('s');
                } else {
                    out.push('k');
                }
            }
            'g' => {
                if next.is_some_and(|nc| "eiy".contains(nc)) {
                    out.push('ʤ');
                } else {
                    out.push('ɡ');
                }
            }
            'j' => out.push('ʤ'),
            'q' => out.push('k'),
            'r' => out.push('ɹ'),
            'x' => out.push_str("ks"),
            other => out.push(other),
        }
        i += 1;
    }

    if let Some(pos) = out.find(|c: char| IPA_VOWELS.contains(c)) {
        out.insert(pos, 'ˈ');
    }
    out
}
