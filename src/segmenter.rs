//! Segmenter
//!
//! Splits a statement into sentences, sentences into clauses, and yields one
//! [`Mention`] per clause that carries a numeral. Numeral-free clauses next
//! to a mention are attached to it as context cues, so
//! "I invested in treasury bills and got around 25 thousand" still links the
//! figure to its category words. Period and currency markers are narrower:
//! they only carry over from preceding clauses joined by punctuation.

use crate::models::Mention;
use crate::period::{ANNUAL_CUE, MONTHLY_CUE};
use crate::resolver::{amount_parts, is_number_word, AMOUNT, FOREIGN_CURRENCY, LOCAL_CURRENCY};
use regex::{Captures, Regex};
use std::collections::VecDeque;
use std::ops::Range;

/// Words ending in '.' that do not close a sentence
const ABBREVIATIONS: &[&str] = &["rs", "mr", "mrs", "ms", "dr", "approx", "est"];

/// Words that separate unrelated figures
const CONJUNCTIONS: &[&str] = &["and", "also", "but", "plus", "while"];

const CLOSING_MARKS: &[char] = &['"', '\'', ')', ']', '”', '’'];

/// A whitespace-delimited word with its byte range in the input
#[derive(Debug, Clone, Copy)]
struct Word<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

impl<'a> Word<'a> {
    /// Lowercase word without surrounding punctuation
    fn bare(&self) -> String {
        self.text
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase()
    }

    fn is_dash(&self) -> bool {
        self.text.chars().all(|c| matches!(c, '-' | '–' | '—'))
    }

    fn ends_clause(&self) -> bool {
        self.text
            .trim_end_matches(CLOSING_MARKS)
            .ends_with([',', ':'])
    }

    fn ends_sentence(&self) -> bool {
        let trimmed = self.text.trim_end_matches(CLOSING_MARKS);
        if trimmed.ends_with(['!', '?', ';']) {
            return true;
        }
        if !trimmed.ends_with('.') {
            return false;
        }
        let stem = trimmed
            .trim_end_matches('.')
            .trim_start_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        !ABBREVIATIONS.contains(&stem.as_str())
    }
}

/// Lazy sentence iterator over the input
struct Sentences<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for Sentences<'a> {
    type Item = Vec<Word<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.text;
        let offset = self.pos;
        let mut words = Vec::new();
        let mut chars = text[offset..]
            .char_indices()
            .map(|(i, c)| (i + offset, c))
            .peekable();

        loop {
            // whitespace gap; a newline closes the current sentence
            let mut newline = false;
            while let Some(&(_, c)) = chars.peek() {
                if !c.is_whitespace() {
                    break;
                }
                newline |= c == '\n';
                chars.next();
            }

            let Some(&(start, _)) = chars.peek() else {
                self.pos = text.len();
                return if words.is_empty() { None } else { Some(words) };
            };

            if newline && !words.is_empty() {
                self.pos = start;
                return Some(words);
            }

            let mut end = start;
            while let Some(&(i, c)) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                end = i + c.len_utf8();
                chars.next();
            }

            let word = Word {
                text: &text[start..end],
                start,
                end,
            };
            words.push(word);

            if word.ends_sentence() {
                self.pos = end;
                return Some(words);
            }
        }
    }
}

/// A clause as a range of word indices
#[derive(Debug, Clone, PartialEq)]
struct Clause {
    words: Range<usize>,
    /// Opened by a conjunction rather than by punctuation
    after_conjunction: bool,
}

/// Group a sentence's words into clauses
fn split_clauses(words: &[Word<'_>]) -> Vec<Clause> {
    let mut clauses = Vec::new();
    let mut start = 0;
    let mut conjunction = false;

    fn close(clauses: &mut Vec<Clause>, from: usize, to: usize, after_conjunction: bool) {
        if to > from {
            clauses.push(Clause {
                words: from..to,
                after_conjunction,
            });
        }
    }

    for (i, word) in words.iter().enumerate() {
        if word.is_dash() {
            close(&mut clauses, start, i, conjunction);
            start = i + 1;
            conjunction = false;
            continue;
        }

        if CONJUNCTIONS.contains(&word.bare().as_str()) {
            let between_number_words = i > 0
                && i + 1 < words.len()
                && is_number_word(&words[i - 1].bare())
                && is_number_word(&words[i + 1].bare());
            if !between_number_words {
                close(&mut clauses, start, i, conjunction);
                start = i + 1;
                conjunction = true;
                continue;
            }
        }

        if word.ends_clause() {
            close(&mut clauses, start, i + 1, conjunction);
            start = i + 1;
            conjunction = false;
        }
    }
    close(&mut clauses, start, words.len(), conjunction);
    clauses
}

/// Lowercase words joined by single spaces, punctuation removed
pub(crate) fn normalize_cues(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

fn looks_like_year(caps: &Captures<'_>) -> bool {
    let Some(digits) = caps.name("digits") else {
        return false;
    };
    let has_scale = caps.name("k").is_some() || caps.name("scale").is_some();
    let text = digits.as_str();
    !has_scale
        && text.len() == 4
        && text
            .parse::<u32>()
            .map(|y| (1900..=2100).contains(&y))
            .unwrap_or(false)
}

/// Pick the figure a clause is about
fn primary_amount<'t>(clause: &'t str) -> Option<Captures<'t>> {
    let matches: Vec<Captures<'t>> = AMOUNT.captures_iter(clause).collect();

    let scaled = matches.iter().position(|c| {
        c.name("k").is_some() || c.name("scale").is_some() || c.name("wscale").is_some()
    });
    let non_year = matches.iter().position(|c| !looks_like_year(c));

    let index = scaled.or(non_year).unwrap_or(0);
    matches.into_iter().nth(index)
}

/// Period cue closest to the numeral, falling back to the leading clauses
fn find_period(clause: &str, numeral: &Range<usize>, context: &str) -> Option<String> {
    let distance = |cue: &Range<usize>| {
        if cue.start >= numeral.end {
            cue.start - numeral.end
        } else if numeral.start >= cue.end {
            numeral.start - cue.end
        } else {
            0
        }
    };

    MONTHLY_CUE
        .find_iter(clause)
        .chain(ANNUAL_CUE.find_iter(clause))
        .min_by_key(|m| distance(&m.range()))
        .map(|m| m.as_str().to_lowercase())
        .or_else(|| {
            MONTHLY_CUE
                .find(context)
                .or_else(|| ANNUAL_CUE.find(context))
                .map(|m| m.as_str().to_lowercase())
        })
}

fn find_currency(clause: &str, context: &str) -> Option<String> {
    fn first(re: &Regex, text: &str) -> Option<String> {
        re.find(text).map(|m| m.as_str().to_string())
    }

    first(&FOREIGN_CURRENCY, clause)
        .or_else(|| first(&LOCAL_CURRENCY, clause))
        .or_else(|| first(&FOREIGN_CURRENCY, context))
        .or_else(|| first(&LOCAL_CURRENCY, context))
}

/// Build the mentions of one sentence
fn sentence_mentions(text: &str, words: &[Word<'_>]) -> Vec<Mention> {
    let clauses: Vec<(Range<usize>, &str, bool)> = split_clauses(words)
        .into_iter()
        .filter_map(|clause| {
            let range = clause.words;
            let start = words[range.start].start;
            let raw = &text[start..words[range.end - 1].end];
            let trimmed = raw.trim_end_matches(|c: char| matches!(c, ',' | '.' | ';' | ':' | '!' | '?'));
            if trimmed.is_empty() {
                None
            } else {
                Some((start..start + trimmed.len(), trimmed, clause.after_conjunction))
            }
        })
        .collect();

    let has_numeral: Vec<bool> = clauses.iter().map(|(_, c, _)| AMOUNT.is_match(c)).collect();

    let mut mentions = Vec::new();
    for (index, (span, clause, _)) in clauses.iter().enumerate() {
        if !has_numeral[index] {
            continue;
        }
        let Some(caps) = primary_amount(clause) else {
            continue;
        };

        // adjacent numeral-free clauses on both sides
        let mut neighbours = Vec::new();
        let mut before = index;
        while before > 0 && !has_numeral[before - 1] {
            before -= 1;
            neighbours.push(before);
        }
        neighbours.reverse();
        let mut after = index + 1;
        while after < clauses.len() && !has_numeral[after] {
            neighbours.push(after);
            after += 1;
        }
        let context = neighbours
            .iter()
            .map(|i| normalize_cues(clauses[*i].1))
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        // period and currency markers only carry over from preceding
        // clauses joined by punctuation, never across a conjunction
        let mut lead = Vec::new();
        let mut joined = index;
        while joined > 0 && !clauses[joined].2 && !has_numeral[joined - 1] {
            joined -= 1;
            lead.push(clauses[joined].1);
        }
        lead.reverse();
        let marker_context = lead.join(" ");

        let numeral_range = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
        let (numeral, scale) = amount_parts(&caps);

        mentions.push(Mention {
            span: span.clone(),
            text: clause.to_string(),
            numeral: numeral.to_string(),
            scale,
            period: find_period(clause, &numeral_range, &marker_context),
            currency: find_currency(clause, &marker_context),
            cues: normalize_cues(clause),
            context,
        });
    }
    mentions
}

/// Lazy sequence of mentions for one input
pub struct Mentions<'a> {
    text: &'a str,
    sentences: Sentences<'a>,
    pending: VecDeque<Mention>,
}

impl<'a> Iterator for Mentions<'a> {
    type Item = Mention;

    fn next(&mut self) -> Option<Mention> {
        loop {
            if let Some(mention) = self.pending.pop_front() {
                return Some(mention);
            }
            let words = self.sentences.next()?;
            self.pending.extend(sentence_mentions(self.text, &words));
        }
    }
}

/// Segmenter stage
#[derive(Debug, Default, Clone, Copy)]
pub struct Segmenter;

impl Segmenter {
    pub fn new() -> Self {
        Self
    }

    /// Mentions of `text`, produced one sentence at a time
    pub fn segment<'a>(&self, text: &'a str) -> Mentions<'a> {
        Mentions {
            text,
            sentences: Sentences { text, pos: 0 },
            pending: VecDeque::new(),
        }
    }
}
