//! Currency expressions → spoken words.
//!
//! Recognises a currency symbol or ISO code next to an amount, either inside
//! one whitespace token (`$1,234.50`, `100USD`, `-€5`) or across two tokens
//! (`USD 100`, `100 EUR`).  Grouping and decimal separators are accepted in
//! both the dot-decimal (`1,234.50`) and comma-decimal (`1.234,50`)
//! conventions; see [`parse_amount`] for the disambiguation rules.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::numbers::{decimal_to_words, integer_str_to_words, number_to_words};

// ─────────────────────────────────────────────────────────────────────────────
// Currency table
// ─────────────────────────────────────────────────────────────────────────────

/// Static description of one currency.
#[derive(Debug)]
pub struct Currency {
    pub code: &'static str,
    pub symbols: &'static [&'static str],
    pub major: (&'static str, &'static str),
    /// `None` for currencies without a minor unit (yen, won).
    pub minor: Option<(&'static str, &'static str)>,
    pub minor_digits: usize,
}

static CURRENCIES: &[Currency] = &[
    Currency {
        code: "USD",
        symbols: &["$", "US$"],
        major: ("dollar", "dollars"),
        minor: Some(("cent", "cents")),
        minor_digits: 2,
    },
    Currency {
        code: "CAD",
        symbols: &["C$", "CA$"],
        major: ("canadian dollar", "canadian dollars"),
        minor: Some(("cent", "cents")),
        minor_digits: 2,
    },
    Currency {
        code: "AUD",
        symbols: &["A$", "AU$"],
        major: ("australian dollar", "australian dollars"),
        minor: Some(("cent", "cents")),
        minor_digits: 2,
    },
    Currency {
        code: "EUR",
        symbols: &["€"],
        major: ("euro", "euros"),
        minor: Some(("cent", "cents")),
        minor_digits: 2,
    },
    Currency {
        code: "GBP",
        symbols: &["£"],
        major: ("pound", "pounds"),
        minor: Some(("penny", "pence")),
        minor_digits: 2,
    },
    Currency {
        code: "JPY",
        symbols: &["¥", "円"],
        major: ("yen", "yen"),
        minor: None,
        minor_digits: 0,
    },
    Currency {
        code: "KRW",
        symbols: &["₩"],
        major: ("won", "won"),
        minor: None,
        minor_digits: 0,
    },
    Currency {
        code: "CNY",
        symbols: &["CN¥", "元"],
        major: ("yuan", "yuan"),
        minor: Some(("fen", "fen")),
        minor_digits: 2,
    },
    Currency {
        code: "INR",
        symbols: &["₹"],
        major: ("rupee", "rupees"),
        minor: Some(("paisa", "paise")),
        minor_digits: 2,
    },
    Currency {
        code: "RUB",
        symbols: &["₽"],
        major: ("ruble", "rubles"),
        minor: Some(("kopek", "kopeks")),
        minor_digits: 2,
    },
    Currency {
        code: "BRL",
        symbols: &["R$"],
        major: ("real", "reais"),
        minor: Some(("centavo", "centavos")),
        minor_digits: 2,
    },
    Currency {
        code: "CHF",
        symbols: &[],
        major: ("franc", "francs"),
        minor: Some(("centime", "centimes")),
        minor_digits: 2,
    },
];

/// Look up a currency by symbol or (upper-case) ISO code.
pub fn lookup_currency(marker: &str) -> Option<&'static Currency> {
    CURRENCIES
        .iter()
        .find(|c| c.code == marker || c.symbols.contains(&marker))
}

// ─────────────────────────────────────────────────────────────────────────────
// Amount parsing
// ─────────────────────────────────────────────────────────────────────────────

/// An amount with its separators resolved: plain digit strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    pub integer: String,
    pub fraction: Option<String>,
}

impl Amount {
    /// Dot-decimal rendering without grouping (`"1234.5"`).
    pub fn to_plain(&self) -> String {
        match &self.fraction {
            Some(f) => format!("{}.{}", self.integer, f),
            None => self.integer.clone(),
        }
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Resolve grouping/decimal separators in an amount such as `1,234.50`,
/// `1.234,50`, `1 234` or `12,5`.
///
/// * both `,` and `.` present: the one occurring last is the decimal mark;
/// * one kind present more than once: it is the grouping mark;
/// * one kind present once: exactly three digits after it means grouping
///   (unless the integer part is `0`), anything else means decimal.
///
/// Returns `None` when the digit groups are malformed.  The single-separator
/// rule misreads three-decimal amounts such as `1.234` meaning "one point two
/// three four"; that is a known limitation of the heuristic.
pub fn parse_amount(s: &str) -> Option<Amount> {
    let commas = s.matches(',').count();
    let dots = s.matches('.').count();

    let (group_sep, dec_sep) = match (commas, dots) {
        (0, 0) => (None, None),
        (c, d) if c > 0 && d > 0 => {
            let last_comma = s.rfind(',')?;
            let last_dot = s.rfind('.')?;
            if last_dot > last_comma {
                (Some(','), Some('.'))
            } else {
                (Some('.'), Some(','))
            }
        }
        (c, d) => {
            let sep = if c > 0 { ',' } else { '.' };
            if c + d > 1 {
                (Some(sep), None)
            } else {
                let (before, after) = s.split_once(sep)?;
                if after.len() == 3 && before != "0" && !before.is_empty() {
                    (Some(sep), None)
                } else {
                    (None, Some(sep))
                }
            }
        }
    };

    let (int_part, fraction) = match dec_sep {
        Some(sep) => {
            let (int_part, frac) = s.split_once(sep)?;
            if frac.contains(sep) || !all_digits(frac) {
                return None;
            }
            (int_part, Some(frac.to_string()))
        }
        None => (s, None),
    };

    let integer = match group_sep {
        Some(sep) => {
            let mut groups = int_part.split(sep);
            let first = groups.next()?;
            if !all_digits(first) || first.len() > 3 {
                return None;
            }
            let mut integer = first.to_string();
            for group in groups {
                if group.len() != 3 || !all_digits(group) {
                    return None;
                }
                integer.push_str(group);
            }
            integer
        }
        None if int_part.is_empty() && fraction.is_some() => "0".to_string(),
        None => {
            if !all_digits(int_part) {
                return None;
            }
            int_part.to_string()
        }
    };

    Some(Amount { integer, fraction })
}

// ─────────────────────────────────────────────────────────────────────────────
// Token matching
// ─────────────────────────────────────────────────────────────────────────────

const AMOUNT: &str = r"(?P<amount>\d(?:[\d.,]*\d)?|[.,]\d+)";
const SCALE: &str = r"(?P<scale>[KMBT])?";

static RE_ONE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?P<sign>[-−])?(?P<pre>[^\d\s.,+−-]+)?(?P<sign2>[-−])?{AMOUNT}{SCALE}(?P<post>[^\d\s.,]+)?$"
    ))
    .unwrap()
});

static RE_AMOUNT_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^(?P<sign>[-−])?{AMOUNT}{SCALE}$")).unwrap());

fn scale_word(s: &str) -> &'static str {
    match s {
        "K" => "thousand",
        "M" => "million",
        "B" => "billion",
        "T" => "trillion",
        _ => "",
    }
}

/// A currency expression recognised in one or two tokens.
#[derive(Debug, Clone)]
pub struct CurrencyMatch {
    pub currency: &'static Currency,
    pub negative: bool,
    /// The amount as written, separators included.
    pub amount: String,
    pub scale: Option<&'static str>,
    /// Number of input tokens the expression spans (1 or 2).
    pub consumed: usize,
}

/// Why a recognised currency expression could not be verbalised exactly.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CurrencyError {
    #[error("{code} has no minor unit, cannot express {amount:?}")]
    MinorUnitsNotSupported { code: &'static str, amount: String },

    #[error("{code} amount {amount:?} has more than {digits} minor digits")]
    TooManyMinorDigits {
        code: &'static str,
        amount: String,
        digits: usize,
    },

    #[error("malformed amount {0:?}")]
    MalformedAmount(String),
}

/// Try to match a currency expression at the start of `tokens`.
///
/// `tokens[0]` is matched as a one-token expression first; failing that,
/// `tokens[0..2]` is tried as a marker + amount or amount + marker pair.
pub fn match_currency(tokens: &[&str]) -> Option<CurrencyMatch> {
    let first = *tokens.first()?;

    if let Some(caps) = RE_ONE_TOKEN.captures(first) {
        let marker = match (caps.name("pre"), caps.name("post")) {
            (Some(pre), None) => pre.as_str(),
            (None, Some(post)) => post.as_str(),
            _ => return match_pair(tokens),
        };
        if let Some(currency) = lookup_currency(marker) {
            let negative = caps.name("sign").is_some() || caps.name("sign2").is_some();
            return Some(CurrencyMatch {
                currency,
                negative,
                amount: caps["amount"].to_string(),
                scale: caps.name("scale").map(|m| scale_word(m.as_str())),
                consumed: 1,
            });
        }
    }
    match_pair(tokens)
}

fn match_pair(tokens: &[&str]) -> Option<CurrencyMatch> {
    let (first, second) = match tokens {
        [first, second, ..] => (*first, *second),
        _ => return None,
    };

    let (currency, caps) = if let Some(currency) = lookup_currency(first) {
        (currency, RE_AMOUNT_ONLY.captures(second)?)
    } else {
        (lookup_currency(second)?, RE_AMOUNT_ONLY.captures(first)?)
    };

    Some(CurrencyMatch {
        currency,
        negative: caps.name("sign").is_some(),
        amount: caps["amount"].to_string(),
        scale: caps.name("scale").map(|m| scale_word(m.as_str())),
        consumed: 2,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Verbalisation
// ─────────────────────────────────────────────────────────────────────────────

fn unit(pair: (&'static str, &'static str), one: bool) -> &'static str {
    if one {
        pair.0
    } else {
        pair.1
    }
}

impl CurrencyMatch {
    /// Spell the amount out exactly, e.g. "one thousand two hundred thirty
    /// four dollars and fifty cents".
    pub fn to_words(&self) -> Result<String, CurrencyError> {
        let cur = self.currency;
        let amount = parse_amount(&self.amount)
            .ok_or_else(|| CurrencyError::MalformedAmount(self.amount.clone()))?;

        let body = if let Some(scale) = self.scale {
            format!("{} {} {}", decimal_to_words(&amount.to_plain()), scale, cur.major.1)
        } else {
            self.exact_words(&amount)?
        };

        Ok(if self.negative {
            format!("negative {}", body)
        } else {
            body
        })
    }

    fn exact_words(&self, amount: &Amount) -> Result<String, CurrencyError> {
        let cur = self.currency;
        let fraction = amount.fraction.as_deref().unwrap_or("");

        let minor_value = if fraction.is_empty() {
            0
        } else {
            if cur.minor.is_none() || cur.minor_digits == 0 {
                return Err(CurrencyError::MinorUnitsNotSupported {
                    code: cur.code,
                    amount: self.amount.clone(),
                });
            }
            if fraction.len() > cur.minor_digits {
                return Err(CurrencyError::TooManyMinorDigits {
                    code: cur.code,
                    amount: self.amount.clone(),
                    digits: cur.minor_digits,
                });
            }
            let padded = format!("{:0<width$}", fraction, width = cur.minor_digits);
            padded
                .parse::<u64>()
                .map_err(|_| CurrencyError::MalformedAmount(self.amount.clone()))?
        };

        let major_is_zero = amount.integer.bytes().all(|b| b == b'0');
        let major_is_one = amount.integer.trim_start_matches('0') == "1";

        let mut parts = Vec::new();
        if !major_is_zero || minor_value == 0 {
            parts.push(format!(
                "{} {}",
                integer_str_to_words(&amount.integer),
                unit(cur.major, major_is_one)
            ));
        }
        if let (Some(minor), true) = (cur.minor, minor_value > 0) {
            parts.push(format!(
                "{} {}",
                number_to_words(minor_value),
                unit(minor, minor_value == 1)
            ));
        }
        Ok(parts.join(" and "))
    }

    /// Literal reading used when [`to_words`](Self::to_words) refuses the
    /// amount: the number as written, then the currency name.
    pub fn literal_words(&self) -> String {
        let plain = parse_amount(&self.amount)
            .map(|a| a.to_plain())
            .unwrap_or_else(|| self.amount.replace(',', ""));
        let sign = if self.negative { "negative " } else { "" };
        format!("{}{} {}", sign, decimal_to_words(&plain), self.currency.major.1)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn words(tokens: &[&str]) -> String {
        match_currency(tokens).expect("no currency match").to_words().unwrap()
    }

    #[test]
    fn test_dollars_and_cents() {
        assert_eq!(
            words(&["$1,234.50"]),
            "one thousand two hundred thirty four dollars and fifty cents"
        );
        assert_eq!(words(&["$1"]), "one dollar");
        assert_eq!(words(&["$0.01"]), "one cent");
        assert_eq!(words(&["$4.5"]), "four dollars and fifty cents");
    }

    #[test]
    fn test_comma_decimal_convention() {
        assert_eq!(
            words(&["€1.234,50"]),
            "one thousand two hundred thirty four euros and fifty cents"
        );
        assert_eq!(words(&["12,5€"]), "twelve euros and fifty cents");
    }

    #[test]
    fn test_two_token_forms() {
        let m = match_currency(&["USD", "100"]).unwrap();
        assert_eq!(m.consumed, 2);
        assert_eq!(m.to_words().unwrap(), "one hundred dollars");

        let m = match_currency(&["20", "GBP"]).unwrap();
        assert_eq!(m.consumed, 2);
        assert_eq!(m.to_words().unwrap(), "twenty pounds");
    }

    #[test]
    fn test_negative() {
        assert_eq!(words(&["-$5"]), "negative five dollars");
        assert_eq!(words(&["$-5"]), "negative five dollars");
    }

    #[test]
    fn test_scale_suffix() {
        assert_eq!(words(&["$5M"]), "five million dollars");
        assert_eq!(words(&["€1.5K"]), "one point five thousand euros");
    }

    #[test]
    fn test_yen_rejects_minor_units() {
        let m = match_currency(&["¥100.50"]).unwrap();
        assert_eq!(
            m.to_words(),
            Err(CurrencyError::MinorUnitsNotSupported {
                code: "JPY",
                amount: "100.50".into()
            })
        );
        assert_eq!(m.literal_words(), "one hundred point five zero yen");
        // Three digits after a single separator is grouping, not decimals.
        assert_eq!(words(&["¥1.000"]), "one thousand yen");
    }

    #[test]
    fn test_too_many_minor_digits() {
        let m = match_currency(&["$0.1234"]).unwrap();
        assert!(matches!(
            m.to_words(),
            Err(CurrencyError::TooManyMinorDigits { .. })
        ));
    }

    #[test]
    fn test_parse_amount_heuristics() {
        let a = |s: &str| parse_amount(s).map(|a| a.to_plain());
        assert_eq!(a("1,234"), Some("1234".into()));
        assert_eq!(a("1.234"), Some("1234".into()));
        assert_eq!(a("0.125"), Some("0.125".into()));
        assert_eq!(a("12.5"), Some("12.5".into()));
        assert_eq!(a("1,234,567.89"), Some("1234567.89".into()));
        assert_eq!(a("1.234.567,89"), Some("1234567.89".into()));
        assert_eq!(a("1,23,4"), None);
        assert_eq!(a("1234,56,78"), None);
    }

    #[test]
    fn test_non_currency_tokens() {
        assert!(match_currency(&["hello"]).is_none());
        assert!(match_currency(&["1234"]).is_none());
        assert!(match_currency(&["100", "apples"]).is_none());
        assert!(match_currency(&["XYZ100"]).is_none());
    }
}
