use lk_tax_extractor::{
    create_backend, engine::SAMPLE_STATEMENTS, extract_batch, ExtractorConfig,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut json = false;
    let mut statements = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json" => json = true,
            "-h" | "--help" => {
                println!("Usage: tax-extract [--json] [STATEMENT ...]");
                println!("With no statements, the bundled sample statements are used.");
                return Ok(());
            }
            _ => statements.push(arg),
        }
    }

    if statements.is_empty() {
        statements = SAMPLE_STATEMENTS.iter().map(|s| s.to_string()).collect();
    }

    let config = ExtractorConfig::from_env()?;
    let backend = create_backend(&config)?;

    info!(
        backend = backend.name(),
        statements = statements.len(),
        "Tax figure extraction starting"
    );

    let results = extract_batch(backend, statements.clone()).await;

    let mut failures = 0;
    for (i, (statement, result)) in statements.iter().zip(results).enumerate() {
        match result {
            Ok(record) if json => {
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            Ok(record) => {
                println!("\n=== STATEMENT {} ===", i + 1);
                println!("{}", statement);
                println!("\n{}", record);
            }
            Err(e) => {
                failures += 1;
                eprintln!("Statement {} failed: {}", i + 1, e);
            }
        }
    }

    if failures > 0 {
        return Err(format!("{} statement(s) could not be extracted", failures).into());
    }

    Ok(())
}
