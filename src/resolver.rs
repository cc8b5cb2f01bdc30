//! Quantity Resolver
//!
//! Turns the numeral expression of a mention into a canonical LKR value:
//! - digit groups with thousands separators ("150,000", "1,50,000") and decimals ("2.5")
//! - spelled-out numbers followed by a scale word ("two lakhs", "a million")
//! - scale words: thousand, lakh/lac, crore, million, and the bare `k` suffix
//!
//! Currency is decided from the marker the segmenter found next to the figure.

use crate::error::ExtractionError;
use crate::models::{Currency, Mention, Period, ResolvedAmount};
use crate::Result;
use lazy_static::lazy_static;
use regex::Regex;

const ONES: &[(&str, u64)] = &[
    ("zero", 0),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("thirteen", 13),
    ("fourteen", 14),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventeen", 17),
    ("eighteen", 18),
    ("nineteen", 19),
];

const TENS: &[(&str, u64)] = &[
    ("twenty", 20),
    ("thirty", 30),
    ("forty", 40),
    ("fifty", 50),
    ("sixty", 60),
    ("seventy", 70),
    ("eighty", 80),
    ("ninety", 90),
];

/// Articles standing in for "one" in front of a scale word ("a lakh")
const ARTICLES: &[&str] = &["a", "an"];

const SCALES: &[(&str, f64)] = &[
    ("k", 1_000.0),
    ("thousand", 1_000.0),
    ("thousands", 1_000.0),
    ("lakh", 100_000.0),
    ("lakhs", 100_000.0),
    ("lac", 100_000.0),
    ("lacs", 100_000.0),
    ("million", 1_000_000.0),
    ("millions", 1_000_000.0),
    ("mn", 1_000_000.0),
    ("crore", 10_000_000.0),
    ("crores", 10_000_000.0),
];

/// Alternation of the given words, longest first so prefixes never shadow
fn alternation<'a>(words: impl Iterator<Item = &'a str>) -> String {
    let mut words: Vec<&str> = words.collect();
    words.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    words.join("|")
}

lazy_static! {
    /// A numeral with its optional scale.
    ///
    /// Digit numerals may stand alone; spelled-out numerals only count when
    /// a scale word follows them.
    pub(crate) static ref AMOUNT: Regex = {
        let words = alternation(
            ONES.iter()
                .chain(TENS.iter())
                .map(|(w, _)| *w)
                .chain(ARTICLES.iter().copied())
                .chain(std::iter::once("hundred")),
        );
        let scales = alternation(SCALES.iter().map(|(w, _)| *w).filter(|w| *w != "k"));
        let pattern = format!(
            r"(?i)(?:(?P<digits>\d{{1,3}}(?:,\d{{2,3}})+(?:\.\d+)?|\d+(?:\.\d+)?|\.\d+)(?P<k>\s?k\b)?(?:\s*(?P<scale>{scales})\b)?|\b(?P<words>(?:{words})(?:[\s-]+(?:and[\s-]+)?(?:{words}))*)\s+(?P<wscale>{scales})\b)",
            scales = scales,
            words = words,
        );
        Regex::new(&pattern).expect("amount pattern must compile")
    };

    pub(crate) static ref FOREIGN_CURRENCY: Regex = Regex::new(
        r"(?i)(?:\b(?:usd|dollars?|eur|euros?|gbp|pounds?|aud|cad|inr|abroad|foreign|overseas|offshore)\b|[$€£])"
    )
    .expect("foreign currency pattern must compile");

    pub(crate) static ref LOCAL_CURRENCY: Regex = Regex::new(
        r"(?i)\b(?:rs|rupees?|lkr|slr)\b\.?"
    )
    .expect("local currency pattern must compile");
}

/// True for spelled-out number words, including "hundred"
pub(crate) fn is_number_word(word: &str) -> bool {
    word == "hundred"
        || ONES.iter().any(|(w, _)| *w == word)
        || TENS.iter().any(|(w, _)| *w == word)
}

pub fn scale_multiplier(token: &str) -> Option<f64> {
    let token = token.trim().to_lowercase();
    SCALES
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, m)| *m)
}

/// Fixed-point reading of a numeral: `mantissa / 10^places`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decimal {
    mantissa: u128,
    places: u32,
}

impl Decimal {
    fn scaled(self, multiplier: f64) -> f64 {
        // multiply before dividing so "1.2 million" lands exactly on 1_200_000
        self.mantissa as f64 * multiplier / 10f64.powi(self.places as i32)
    }
}

fn unparseable(raw: &str) -> ExtractionError {
    ExtractionError::UnparseableNumeral(raw.to_string())
}

fn parse_digits(raw: &str) -> Result<Decimal> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let (int_part, frac_part) = match cleaned.split_once('.') {
        Some((i, f)) => (i, f),
        None => (cleaned.as_str(), ""),
    };

    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !all_digits(int_part) || !all_digits(frac_part) {
        return Err(unparseable(raw));
    }

    let places = u32::try_from(frac_part.len()).map_err(|_| unparseable(raw))?;
    if places > 18 {
        return Err(unparseable(raw));
    }

    let mantissa = format!("{}{}", int_part, frac_part)
        .parse::<u128>()
        .map_err(|_| unparseable(raw))?;

    Ok(Decimal { mantissa, places })
}

fn parse_words(raw: &str) -> Result<Decimal> {
    let mut current: u64 = 0;
    let mut found_any = false;

    for word in raw
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        if word == "and" && found_any {
            continue;
        }

        if ARTICLES.contains(&word.as_str()) {
            if found_any {
                return Err(unparseable(raw));
            }
            current = 1;
        } else if word == "hundred" {
            current = current.max(1) * 100;
        } else if let Some((_, v)) = ONES.iter().chain(TENS.iter()).find(|(w, _)| *w == word) {
            current += v;
        } else {
            return Err(unparseable(raw));
        }
        found_any = true;
    }

    if !found_any {
        return Err(unparseable(raw));
    }

    Ok(Decimal {
        mantissa: u128::from(current),
        places: 0,
    })
}

/// Numeric value of a numeral and its optional scale token
pub fn parse_numeral(numeral: &str, scale: Option<&str>) -> Result<f64> {
    let numeral = numeral.trim();
    let decimal = match numeral.chars().next() {
        Some(c) if c.is_ascii_digit() || c == '.' => parse_digits(numeral)?,
        Some(_) => parse_words(numeral)?,
        None => return Err(unparseable(numeral)),
    };

    let multiplier = match scale {
        Some(token) => scale_multiplier(token).ok_or_else(|| unparseable(token))?,
        None => 1.0,
    };

    let value = decimal.scaled(multiplier);
    if !value.is_finite() {
        return Err(unparseable(numeral));
    }
    Ok(value)
}

/// Parse the first amount found in free text, e.g. "Rs. 2.5 lakhs"
pub fn parse_amount(text: &str) -> Result<f64> {
    let caps = AMOUNT.captures(text).ok_or_else(|| unparseable(text))?;
    let (numeral, scale) = amount_parts(&caps);
    parse_numeral(numeral, scale.as_deref())
}

/// Split an AMOUNT match into its numeral text and lowercase scale token
pub(crate) fn amount_parts<'t>(caps: &regex::Captures<'t>) -> (&'t str, Option<String>) {
    if let Some(digits) = caps.name("digits") {
        let scale = if caps.name("k").is_some() {
            Some("k".to_string())
        } else {
            caps.name("scale").map(|m| m.as_str().to_lowercase())
        };
        (digits.as_str(), scale)
    } else {
        let words = caps.name("words").map(|m| m.as_str()).unwrap_or_default();
        let scale = caps.name("wscale").map(|m| m.as_str().to_lowercase());
        (words, scale)
    }
}

impl Currency {
    /// Currency implied by a marker token; foreign markers take precedence
    pub fn from_marker(marker: &str) -> Currency {
        if FOREIGN_CURRENCY.is_match(marker) {
            Currency::Foreign
        } else if LOCAL_CURRENCY.is_match(marker) {
            Currency::Local
        } else {
            Currency::Unknown
        }
    }
}

/// Quantity Resolver stage
#[derive(Debug, Default, Clone, Copy)]
pub struct QuantityResolver;

impl QuantityResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a mention into an amount with `period = Unknown`
    pub fn resolve(&self, mention: &Mention) -> Result<ResolvedAmount> {
        let value = parse_numeral(&mention.numeral, mention.scale.as_deref())?;

        // absence of a foreign marker means local currency
        let currency = match mention.currency.as_deref().map(Currency::from_marker) {
            Some(Currency::Foreign) => Currency::Foreign,
            _ => Currency::Local,
        };

        Ok(ResolvedAmount {
            value,
            period: Period::Unknown,
            currency,
        })
    }
}
