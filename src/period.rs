//! Period Normalizer
//!
//! Collapses every amount to an annual figure. Monthly cues multiply by 12;
//! annual cues and missing cues leave the value alone.

use crate::models::{Mention, Period, ResolvedAmount};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

const MONTHS_PER_YEAR: f64 = 12.0;

lazy_static! {
    pub(crate) static ref MONTHLY_CUE: Regex = Regex::new(
        r"(?i)(?:\b(?:per\s+month|a\s+month|each\s+month|every\s+month|monthly|per\s+mensem)\b|/\s*(?:month|mo)\b)"
    )
    .expect("monthly cue pattern must compile");

    pub(crate) static ref ANNUAL_CUE: Regex = Regex::new(
        r"(?i)(?:\b(?:per\s+year|per\s+annum|a\s+year|each\s+year|every\s+year|annually|yearly|annual|this\s+year|for\s+the\s+year|last\s+year|p\.a)\b|/\s*(?:year|yr)\b)"
    )
    .expect("annual cue pattern must compile");
}

/// Period named by a cue token; anything that is not a monthly cue is annual
pub fn period_from_cue(cue: &str) -> Period {
    if MONTHLY_CUE.is_match(cue) {
        Period::Monthly
    } else {
        Period::Annual
    }
}

/// Period Normalizer stage
#[derive(Debug, Default, Clone, Copy)]
pub struct PeriodNormalizer;

impl PeriodNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize using the mention's period cue. Already-annual amounts pass through.
    pub fn normalize(&self, amount: ResolvedAmount, mention: &Mention) -> ResolvedAmount {
        let period = match amount.period {
            Period::Unknown => mention
                .period
                .as_deref()
                .map(period_from_cue)
                .unwrap_or(Period::Annual),
            known => known,
        };

        debug!(cue = ?mention.period, %period, "Period resolved");
        self.annualize(ResolvedAmount { period, ..amount })
    }

    /// Scale to an annual figure based on the amount's own period
    pub fn annualize(&self, amount: ResolvedAmount) -> ResolvedAmount {
        match amount.period {
            Period::Monthly => ResolvedAmount {
                value: amount.value * MONTHS_PER_YEAR,
                period: Period::Annual,
                ..amount
            },
            Period::Annual | Period::Unknown => ResolvedAmount {
                period: Period::Annual,
                ..amount
            },
        }
    }
}
