//! ARPAbet → IPA conversion with stress marks and vowel reduction.
//!
//! Input is a space-separated ARPAbet pronunciation as found in the CMU
//! dictionary (`HH AH0 L OW1`).  Stress digits are stripped; `1` emits `ˈ`
//! and `2` emits `ˌ` before the vowel, and unstressed (`0`) vowels take a
//! reduced form where the table has one.

/// Full-quality IPA for every ARPAbet phone.
fn phone_to_ipa(phone: &str) -> Option<&'static str> {
    Some(match phone {
        "AA" => "ɑ",
        "AE" => "æ",
        "AH" => "ʌ",
        "AO" => "ɔ",
        "AW" => "aʊ",
        "AY" => "aɪ",
        "B" => "b",
        "CH" => "ʧ",
        "D" => "d",
        "DH" => "ð",
        "EH" => "ɛ",
        "ER" => "ɝ",
        "EY" => "eɪ",
        "F" => "f",
        "G" => "ɡ",
        "HH" => "h",
        "IH" => "ɪ",
        "IY" => "i",
        "JH" => "ʤ",
        "K" => "k",
        "L" => "l",
        "M" => "m",
        "N" => "n",
        "NG" => "ŋ",
        "OW" => "oʊ",
        "OY" => "ɔɪ",
        "P" => "p",
        "R" => "ɹ",
        "S" => "s",
        "SH" => "ʃ",
        "T" => "t",
        "TH" => "θ",
        "UH" => "ʊ",
        "UW" => "u",
        "V" => "v",
        "W" => "w",
        "Y" => "j",
        "Z" => "z",
        "ZH" => "ʒ",
        _ => return None,
    })
}

/// Reduced variants for unstressed vowels.
fn reduced_vowel(phone: &str) -> Option<&'static str> {
    Some(match phone {
        "AH" | "AA" | "AE" | "AO" => "ə",
        "EH" => "ɪ",
        "ER" => "ɚ",
        "UW" => "ʊ",
        _ => return None,
    })
}

/// Convert one ARPAbet pronunciation to an IPA string.
///
/// Unknown phones are dropped.
pub fn arpabet_to_ipa(arpabet: &str) -> String {
    let mut out = String::new();
    for raw in arpabet.split_whitespace() {
        let phone = raw.trim_end_matches(|c: char| c.is_ascii_digit());
        let stress = raw[phone.len()..].chars().next();
        let phone = phone.to_ascii_uppercase();

        let ipa = match stress {
            Some('0') => reduced_vowel(&phone).or_else(|| phone_to_ipa(&phone)),
            _ => phone_to_ipa(&phone),
        };
        let Some(ipa) = ipa else {
            continue;
        };

        match stress {
            Some('1') => out.push('ˈ'),
            Some('2') => out.push('ˌ'),
            _ => {}
        }
        out.push_str(ipa);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hello() {
        assert_eq!(arpabet_to_ipa("HH AH0 L OW1"), "həlˈoʊ");
    }

    #[test]
    fn test_secondary_stress() {
        // "understand"
        assert_eq!(
            arpabet_to_ipa("AH2 N D ER0 S T AE1 N D"),
            "ˌʌndɚstˈænd"
        );
    }

    #[test]
    fn test_unreduced_unstressed_vowel() {
        // IY has no reduced form, so the full vowel is kept.
        assert_eq!(arpabet_to_ipa("HH AE1 P IY0"), "hˈæpi");
    }

    #[test]
    fn test_unknown_phone_dropped() {
        assert_eq!(arpabet_to_ipa("K QQ AE1 T"), "kˈæt");
        assert_eq!(arpabet_to_ipa(""), "");
    }

    #[test]
    fn test_lowercase_input() {
        assert_eq!(arpabet_to_ipa("r iy1"), "ɹˈi");
    }
}
