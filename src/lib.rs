//! Sri Lankan Tax Figure Extractor
//!
//! Reads an informal English statement about someone's income and payments
//! and produces a fixed six-field record of annual LKR amounts:
//! - Deterministic rule engine, no network needed
//! - Optional Gemini backend whose output is repaired before use
//! - Foreign amounts and uncategorised figures are never counted
//!
//! PIPELINE:
//! TEXT → SEGMENT → RESOLVE → NORMALIZE → CLASSIFY → ASSEMBLE

pub mod api;
pub mod assembler;
pub mod backend;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod gemini;
pub mod models;
pub mod period;
pub mod resolver;
pub mod segmenter;
pub mod validation;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use backend::{create_backend, extract_batch, ExtractionBackend, RuleBackend};
pub use config::{ExtractorConfig, ExtractorMode};
pub use engine::ExtractionEngine;
