//! Number verbalisation — integers, decimals and ordinals → English words.
//!
//! Words are separated by single spaces ("thirty four", not "thirty-four")
//! so the G2P engine can look every word up in the lexicon on its own.

const ONES: &[&str] = &[
    "", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
    "ten", "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen",
    "seventeen", "eighteen", "nineteen",
];
const TENS: &[&str] = &[
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];
const SCALE: &[&str] = &[
    "", "thousand", "million", "billion", "trillion", "quadrillion", "quintillion",
];

const DIGITS: &[&str] = &[
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];

fn three_digits_to_words(n: u64, parts: &mut Vec<&'static str>) {
    let hundreds = (n / 100) as usize;
    let remainder = (n % 100) as usize;
    if hundreds > 0 {
        parts.push(ONES[hundreds]);
        parts.push("hundred");
    }
    if remainder >= 20 {
        parts.push(TENS[remainder / 10]);
        if remainder % 10 > 0 {
            parts.push(ONES[remainder % 10]);
        }
    } else if remainder > 0 {
        parts.push(ONES[remainder]);
    }
}

/// Convert a non-negative integer to English words.
///
/// `u64::MAX` is a little over eighteen quintillion, so every value fits the
/// scale table.
pub fn number_to_words(n: u64) -> String {
    if n == 0 {
        return "zero".to_string();
    }
    let mut groups = Vec::new();
    let mut remaining = n;
    while remaining > 0 {
        groups.push(remaining % 1000);
        remaining /= 1000;
    }
    let mut parts = Vec::new();
    for (scale, &group) in groups.iter().enumerate().rev() {
        if group == 0 {
            continue;
        }
        three_digits_to_words(group, &mut parts);
        if !SCALE[scale].is_empty() {
            parts.push(SCALE[scale]);
        }
    }
    parts.join(" ")
}

/// Read a run of ASCII digits one by one ("0042" → "zero zero four two").
pub fn digits_to_words(s: &str) -> String {
    s.chars()
        .filter_map(|c| c.to_digit(10).map(|d| DIGITS[d as usize]))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Verbalise a digit string of any length.
///
/// Strings too long for `u64` are read digit by digit rather than rejected.
pub fn integer_str_to_words(digits: &str) -> String {
    match digits.parse::<u64>() {
        Ok(n) => number_to_words(n),
        Err(_) => digits_to_words(digits),
    }
}

/// Convert a decimal string such as `"3.14"` or `"-0.5"` to words, reading
/// the fractional digits individually.
pub fn decimal_to_words(value: &str) -> String {
    let (negative, value) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };

    let words = match value.split_once('.') {
        Some((int_part, frac_part)) => {
            let int_words = if int_part.is_empty() {
                "zero".to_string()
            } else {
                integer_str_to_words(int_part)
            };
            if frac_part.is_empty() {
                int_words
            } else {
                format!("{} point {}", int_words, digits_to_words(frac_part))
            }
        }
        None => integer_str_to_words(value),
    };

    if negative {
        format!("negative {}", words)
    } else {
        words
    }
}

/// Convert an integer to its ordinal form ("twenty one" → "twenty first").
pub fn ordinal_to_words(n: u64) -> String {
    const EXCEPTIONS: &[(&str, &str)] = &[
        ("one", "first"),
        ("two", "second"),
        ("three", "third"),
        ("five", "fifth"),
        ("eight", "eighth"),
        ("nine", "ninth"),
        ("twelve", "twelfth"),
    ];

    let words = number_to_words(n);
    let (prefix, last) = match words.rsplit_once(' ') {
        Some((prefix, last)) => (Some(prefix), last),
        None => (None, words.as_str()),
    };

    let last_ord = EXCEPTIONS
        .iter()
        .find(|(base, _)| *base == last)
        .map(|(_, ord)| (*ord).to_string())
        .unwrap_or_else(|| {
            if let Some(stem) = last.strip_suffix('y') {
                format!("{}ieth", stem)
            } else {
                format!("{}th", last)
            }
        });

    match prefix {
        Some(prefix) => format!("{} {}", prefix, last_ord),
        None => last_ord,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_to_words() {
        assert_eq!(number_to_words(0), "zero");
        assert_eq!(number_to_words(7), "seven");
        assert_eq!(number_to_words(13), "thirteen");
        assert_eq!(number_to_words(40), "forty");
        assert_eq!(number_to_words(1234), "one thousand two hundred thirty four");
        assert_eq!(number_to_words(1200), "one thousand two hundred");
        assert_eq!(number_to_words(1_000_000), "one million");
        assert_eq!(number_to_words(2_000_017), "two million seventeen");
    }

    #[test]
    fn test_quintillions() {
        assert_eq!(number_to_words(3_000_000_000_000_000_000), "three quintillion");
        assert!(number_to_words(u64::MAX).starts_with("eighteen quintillion"));
    }

    #[test]
    fn test_decimal_to_words() {
        assert_eq!(decimal_to_words("3.14"), "three point one four");
        assert_eq!(decimal_to_words("-0.5"), "negative zero point five");
        assert_eq!(decimal_to_words(".5"), "zero point five");
        assert_eq!(decimal_to_words("12"), "twelve");
    }

    #[test]
    fn test_overlong_digit_string() {
        let s = "123456789012345678901234";
        assert!(integer_str_to_words(s).starts_with("one two three"));
    }

    #[test]
    fn test_ordinals() {
        assert_eq!(ordinal_to_words(1), "first");
        assert_eq!(ordinal_to_words(4), "fourth");
        assert_eq!(ordinal_to_words(12), "twelfth");
        assert_eq!(ordinal_to_words(20), "twentieth");
        assert_eq!(ordinal_to_words(21), "twenty first");
        assert_eq!(ordinal_to_words(103), "one hundred third");
    }
}
