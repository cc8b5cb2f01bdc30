//! Extraction backends
//!
//! A backend turns one statement into a record. The rule backend runs the
//! deterministic engine; the Gemini backend asks the language model and
//! repairs its answer. Both are interchangeable behind one trait.

use crate::config::{ExtractorConfig, ExtractorMode};
use crate::engine::ExtractionEngine;
use crate::error::ExtractionError;
use crate::models::TaxIncomeRecord;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

pub mod gemini;
pub use gemini::GeminiBackend;

/// Trait for statement extraction
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn extract(&self, text: &str) -> Result<TaxIncomeRecord>;
}

/// Deterministic backend, no external dependency
#[derive(Debug, Default, Clone)]
pub struct RuleBackend {
    engine: ExtractionEngine,
}

impl RuleBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExtractionBackend for RuleBackend {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn extract(&self, text: &str) -> Result<TaxIncomeRecord> {
        self.engine.extract(text)
    }
}

/// Tries the primary backend, answers from the rule engine when it fails
pub struct FallbackBackend {
    primary: Box<dyn ExtractionBackend>,
    fallback: RuleBackend,
}

impl FallbackBackend {
    pub fn new(primary: Box<dyn ExtractionBackend>) -> Self {
        Self {
            primary,
            fallback: RuleBackend::new(),
        }
    }
}

#[async_trait]
impl ExtractionBackend for FallbackBackend {
    fn name(&self) -> &'static str {
        self.primary.name()
    }

    async fn extract(&self, text: &str) -> Result<TaxIncomeRecord> {
        match self.primary.extract(text).await {
            Ok(record) => Ok(record),
            Err(e) if e.is_invalid_input() => Err(e),
            Err(e) => {
                warn!(
                    backend = self.primary.name(),
                    error = %e,
                    "Primary backend failed, falling back to rules"
                );
                self.fallback.extract(text).await
            }
        }
    }
}

/// Build the backend selected by configuration
pub fn create_backend(config: &ExtractorConfig) -> Result<Arc<dyn ExtractionBackend>> {
    let backend: Arc<dyn ExtractionBackend> = match config.mode {
        ExtractorMode::Rules => Arc::new(RuleBackend::new()),
        ExtractorMode::Llm => {
            let api_key = config.gemini_api_key.clone().ok_or_else(|| {
                ExtractionError::ConfigError("GEMINI_API_KEY not configured".to_string())
            })?;
            let gemini = GeminiBackend::new(api_key, &config.gemini_model, config.timeout)?;

            if config.fallback_to_rules {
                Arc::new(FallbackBackend::new(Box::new(gemini)))
            } else {
                Arc::new(gemini)
            }
        }
    };

    info!(
        backend = backend.name(),
        fallback = config.fallback_to_rules,
        "Extraction backend ready"
    );
    Ok(backend)
}

/// Extract many statements concurrently; results keep the input order
pub async fn extract_batch(
    backend: Arc<dyn ExtractionBackend>,
    texts: Vec<String>,
) -> Vec<Result<TaxIncomeRecord>> {
    let total = texts.len();
    let mut set = JoinSet::new();

    for (index, text) in texts.into_iter().enumerate() {
        let backend = Arc::clone(&backend);
        set.spawn(async move { (index, backend.extract(&text).await) });
    }

    let mut slots: Vec<Option<Result<TaxIncomeRecord>>> = (0..total).map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, result)) => slots[index] = Some(result),
            Err(e) => warn!(error = %e, "Batch extraction task failed"),
        }
    }

    slots
        .into_iter()
        .map(|slot| {
            slot.unwrap_or_else(|| {
                Err(ExtractionError::TaskError(
                    "extraction task did not complete".to_string(),
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend that always fails with a backend error
    struct FailingBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExtractionBackend for FailingBackend {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn extract(&self, text: &str) -> Result<TaxIncomeRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            crate::engine::validate_input(text)?;
            Err(ExtractionError::LlmError("backend unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_rule_backend() {
        let backend = RuleBackend::new();
        let record = backend.extract("I make 200,000 per month from my salary.").await.unwrap();
        assert_eq!(record.employment_income, 2_400_000.0);
        assert_eq!(backend.name(), "rules");
    }

    #[tokio::test]
    async fn test_fallback_on_backend_error() {
        let backend = FallbackBackend::new(Box::new(FailingBackend {
            calls: AtomicUsize::new(0),
        }));
        let record = backend.extract("Rental gives me 20k monthly.").await.unwrap();
        assert_eq!(record.rental_income, 240_000.0);
        assert_eq!(backend.name(), "failing");
    }

    #[tokio::test]
    async fn test_fallback_keeps_invalid_input() {
        let backend = FallbackBackend::new(Box::new(FailingBackend {
            calls: AtomicUsize::new(0),
        }));
        let err = backend.extract("   ").await.unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[tokio::test]
    async fn test_batch_preserves_order() {
        let backend: Arc<dyn ExtractionBackend> = Arc::new(RuleBackend::new());
        let texts = vec![
            "My job pays 100,000 per month.".to_string(),
            "".to_string(),
            "Rent brings 10,000 per month.".to_string(),
        ];

        let results = extract_batch(backend, texts).await;
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().employment_income, 1_200_000.0);
        assert!(results[1].as_ref().unwrap_err().is_invalid_input());
        assert_eq!(results[2].as_ref().unwrap().rental_income, 120_000.0);
    }

    #[test]
    fn test_create_backend_from_config() {
        let config = ExtractorConfig::default();
        let backend = create_backend(&config).unwrap();
        assert_eq!(backend.name(), "rules");

        let llm = ExtractorConfig {
            mode: ExtractorMode::Llm,
            gemini_api_key: Some("key".to_string()),
            ..ExtractorConfig::default()
        };
        let backend = create_backend(&llm).unwrap();
        assert_eq!(backend.name(), "gemini");

        let missing_key = ExtractorConfig {
            mode: ExtractorMode::Llm,
            ..ExtractorConfig::default()
        };
        assert!(create_backend(&missing_key).is_err());
    }
}
