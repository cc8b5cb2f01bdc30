//! Gemini-powered extraction backend
//!
//! The model reads the statement and answers with a JSON object. The answer
//! is treated as untrusted and always goes through the repair layer.

use crate::backend::ExtractionBackend;
use crate::engine::{compute_input_digest, validate_input};
use crate::error::ExtractionError;
use crate::gemini::GeminiClient;
use crate::models::{Category, TaxIncomeRecord};
use crate::validation::{create_default_validator, RecordValidator};
use crate::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

pub struct GeminiBackend {
    client: GeminiClient,
    validator: RecordValidator,
    system_prompt: String,
}

impl GeminiBackend {
    pub fn new(api_key: String, model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: GeminiClient::new(api_key, model, timeout)?,
            validator: create_default_validator(),
            system_prompt: build_system_prompt(),
        })
    }

    /// Replace the instruction text (e.g. for a different tax year's wording)
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Parse and repair a raw model answer
    pub fn interpret(&self, response: &str) -> Result<TaxIncomeRecord> {
        let cleaned = strip_code_fence(response);

        let json: serde_json::Value = serde_json::from_str(cleaned).map_err(|e| {
            ExtractionError::MalformedBackendOutput(format!(
                "Failed to parse Gemini extraction response: {}",
                e
            ))
        })?;

        Ok(self.validator.repair(json)?.record)
    }
}

#[async_trait]
impl ExtractionBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn extract(&self, text: &str) -> Result<TaxIncomeRecord> {
        validate_input(text)?;

        info!(input_digest = %compute_input_digest(text), "Requesting Gemini extraction");
        let response = self.client.generate_json(&self.system_prompt, text).await?;

        self.interpret(&response)
    }
}

/// Strip an optional markdown ```json fence around the answer
fn strip_code_fence(response: &str) -> &str {
    response
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

/// Instruction set describing the categories and unit conventions
fn build_system_prompt() -> String {
    let fields = Category::ALL
        .iter()
        .map(|c| format!("- {}", c.field_name()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You extract Sri Lankan tax figures from a personal finance statement.

Report ONLY these income and deduction fields:
{}

Rules:
- Amounts stated monthly (per month, monthly, a month, every month) are multiplied by 12.
- Amounts with no stated period are already annual.
- Convert number words to numbers: 50 thousand = 50000, 2.5 lakhs = 250000, 1.2 million = 1200000, 50k = 50000.
- Every value is an annual amount in Sri Lankan Rupees (LKR).
- Ignore foreign currencies and foreign-sourced income entirely.
- A field with no figure in the statement is 0.00.
- Amounts are never negative.

Return ONLY a JSON object with exactly these keys and numeric values. No explanation text."#,
        fields
    )
}
