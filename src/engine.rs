//! Rule-based extraction engine
//!
//! TEXT → SEGMENT → RESOLVE → NORMALIZE → CLASSIFY → ASSEMBLE
//!
//! Strictly linear per statement, no shared mutable state. A statement can
//! be processed on any thread; independent statements never interact.

use crate::assembler::RecordAssembler;
use crate::classifier::CategoryClassifier;
use crate::error::ExtractionError;
use crate::models::{ExtractionReport, TaxIncomeRecord};
use crate::period::PeriodNormalizer;
use crate::resolver::QuantityResolver;
use crate::segmenter::Segmenter;
use crate::Result;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Reject input that cannot be segmented at all
pub fn validate_input(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(ExtractionError::InvalidInput(
            "statement is empty".to_string(),
        ));
    }
    Ok(())
}

/// SHA256 hex digest of a statement, logged in place of the raw text
pub fn compute_input_digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Deterministic five-stage pipeline
#[derive(Debug, Default, Clone)]
pub struct ExtractionEngine {
    segmenter: Segmenter,
    resolver: QuantityResolver,
    normalizer: PeriodNormalizer,
    classifier: CategoryClassifier,
    assembler: RecordAssembler,
}

impl ExtractionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extract(&self, text: &str) -> Result<TaxIncomeRecord> {
        Ok(self.extract_detailed(text)?.record)
    }

    /// Extract from raw bytes; non-UTF-8 input is rejected before segmentation
    pub fn extract_bytes(&self, bytes: &[u8]) -> Result<TaxIncomeRecord> {
        let text = std::str::from_utf8(bytes).map_err(|e| {
            ExtractionError::InvalidInput(format!("statement is not UTF-8 text: {}", e))
        })?;
        self.extract(text)
    }

    /// Run the pipeline and keep every intermediate classification
    pub fn extract_detailed(&self, text: &str) -> Result<ExtractionReport> {
        validate_input(text)?;

        let input_digest = compute_input_digest(text);
        let mut classified = Vec::new();
        let mut dropped_mentions = 0;

        for mention in self.segmenter.segment(text) {
            let resolved = match self.resolver.resolve(&mention) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(
                        input_digest = %input_digest,
                        span = ?mention.span,
                        error = %e,
                        "Dropping mention"
                    );
                    dropped_mentions += 1;
                    continue;
                }
            };

            let normalized = self.normalizer.normalize(resolved, &mention);
            let item = self.classifier.classify(normalized, &mention);

            debug!(
                span = ?mention.span,
                numeral = %mention.numeral,
                scale = ?mention.scale,
                annual_value = item.amount.value,
                category = ?item.category(),
                "Mention processed"
            );

            classified.push(item);
        }

        let record = self.assembler.assemble(&classified);

        info!(
            input_digest = %input_digest,
            mentions = classified.len(),
            dropped = dropped_mentions,
            discarded = classified.iter().filter(|c| c.category().is_none()).count(),
            "Extraction completed"
        );

        Ok(ExtractionReport {
            extraction_id: Uuid::new_v4(),
            input_digest,
            record,
            classified,
            dropped_mentions,
            created_at: Utc::now(),
        })
    }
}

/// The five statements the extractor was designed around
pub const SAMPLE_STATEMENTS: [&str; 5] = [
    // Mixed monthly & annual + units
    "I earn 150,000 rupees per month from my job, around 2 lakhs annually from business, and rent brings me 40 thousand per month. I also paid 1.5 lakhs on a solar panel loan this year.",
    // All in annual terms, with 'million'
    "My employment income is about 1.8 million rupees per year. I also get 0.4 million from my shop. My investments bring in another 50,000. I paid 100,000 as other qualifying payments. No rental income.",
    // Some incomes missing
    "I make 200,000 per month from my salary. I don’t have any rental or business income. I invested in treasury bills and got around 25 thousand for the year.",
    // Different formats + irrelevant foreign income
    "My job in Sri Lanka pays me Rs. 175,000 monthly. I also receive Rs. 30,000 per month from an apartment I rent. I had some freelance work from abroad, paid in USD – please ignore that. Paid 50k for solar loan payments. No other income.",
    // Vague natural phrasing
    "I get two lakhs from my employment every month. Rental gives me 20k monthly. No business or investment income. I also made a solar loan payment of 75,000 and spent 10,000 on qualifying education.",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Classification, DiscardReason};

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    fn assert_record(record: &TaxIncomeRecord, expected: [f64; 6]) {
        for (category, want) in Category::ALL.iter().zip(expected) {
            assert_close(record.get(*category), want);
        }
    }

    #[test]
    fn test_mixed_monthly_and_annual() {
        let record = ExtractionEngine::new().extract(SAMPLE_STATEMENTS[0]).unwrap();
        // employment, investment, business, rental, solar, other
        assert_record(&record, [1_800_000.0, 0.0, 200_000.0, 480_000.0, 150_000.0, 0.0]);
    }

    #[test]
    fn test_annual_terms_with_million() {
        let record = ExtractionEngine::new().extract(SAMPLE_STATEMENTS[1]).unwrap();
        assert_record(&record, [1_800_000.0, 50_000.0, 400_000.0, 0.0, 0.0, 100_000.0]);
    }

    #[test]
    fn test_missing_incomes_stay_zero() {
        let record = ExtractionEngine::new().extract(SAMPLE_STATEMENTS[2]).unwrap();
        assert_record(&record, [2_400_000.0, 25_000.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_foreign_income_excluded() {
        let record = ExtractionEngine::new().extract(SAMPLE_STATEMENTS[3]).unwrap();
        assert_record(&record, [2_100_000.0, 0.0, 0.0, 360_000.0, 50_000.0, 0.0]);
    }

    #[test]
    fn test_vague_phrasing() {
        let record = ExtractionEngine::new().extract(SAMPLE_STATEMENTS[4]).unwrap();
        assert_record(&record, [2_400_000.0, 0.0, 0.0, 240_000.0, 75_000.0, 10_000.0]);
    }

    #[test]
    fn test_bare_shop_amount_is_annual() {
        let record = ExtractionEngine::new().extract("200,000 from my shop").unwrap();
        assert_close(record.business_income, 200_000.0);
    }

    #[test]
    fn test_foreign_mentions_contribute_nothing() {
        let engine = ExtractionEngine::new();
        let report = engine
            .extract_detailed("My salary is 5,000 USD per month. I earn 2,000 dollars from my shop.")
            .unwrap();

        assert!(report.record.is_zero());
        assert_eq!(report.classified.len(), 2);
        assert!(report.classified.iter().all(|c| {
            c.classification == Classification::Discard(DiscardReason::ForeignCurrency)
        }));
    }

    #[test]
    fn test_unrelated_clause_markers_are_ignored() {
        let engine = ExtractionEngine::new();

        let record = engine
            .extract("My job pays me 175,000 monthly, and I had some freelance work from abroad.")
            .unwrap();
        assert_close(record.employment_income, 2_100_000.0);

        let record = engine
            .extract("My job pays 900,000, and I pay my helper monthly.")
            .unwrap();
        assert_close(record.employment_income, 900_000.0);
    }

    #[test]
    fn test_spending_is_not_business_income() {
        let report = ExtractionEngine::new()
            .extract_detailed("I spent 20,000 on shopping.")
            .unwrap();
        assert!(report.record.is_zero());
        assert_eq!(
            report.classified[0].classification,
            Classification::Discard(DiscardReason::NoCategoryCue)
        );
    }

    #[test]
    fn test_repeated_mentions_accumulate() {
        let record = ExtractionEngine::new()
            .extract("My job pays 100,000 per month. My second job pays 50,000 per month.")
            .unwrap();
        assert_close(record.employment_income, 1_800_000.0);
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let engine = ExtractionEngine::new();
        assert!(matches!(engine.extract(""), Err(ExtractionError::InvalidInput(_))));
        assert!(matches!(engine.extract(" \n\t "), Err(ExtractionError::InvalidInput(_))));
    }

    #[test]
    fn test_non_utf8_bytes_are_rejected() {
        let engine = ExtractionEngine::new();
        let err = engine.extract_bytes(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(err.is_invalid_input());

        let record = engine.extract_bytes("Rent 20k monthly".as_bytes()).unwrap();
        assert_close(record.rental_income, 240_000.0);
    }

    #[test]
    fn test_unusual_input_still_returns_full_record() {
        let engine = ExtractionEngine::new();
        for text in [
            "Nothing to declare.",
            "I got 5,000 somewhere.",
            "Freelance work abroad paid 900,000.",
        ] {
            let record = engine.extract(text).unwrap();
            assert!(record.iter().all(|(_, v)| v >= 0.0));
            assert_eq!(record.iter().count(), 6);
        }
    }

    #[test]
    fn test_unparseable_numeral_is_dropped() {
        // Arabic-Indic digits match the numeral pattern but are not ASCII digits
        let engine = ExtractionEngine::new();
        let report = engine
            .extract_detailed("My salary is ١٢٣. My shop makes 10,000.")
            .unwrap();
        assert_eq!(report.dropped_mentions, 1);
        assert_close(report.record.business_income, 10_000.0);
    }

    #[test]
    fn test_report_carries_digest() {
        let report = ExtractionEngine::new()
            .extract_detailed("Salary 100,000")
            .unwrap();
        assert_eq!(report.input_digest, compute_input_digest("Salary 100,000"));
        assert_eq!(report.input_digest.len(), 64);
    }
}
