//! CLI `doctor` command: run database diagnostics and print a health report.

use anyhow::{Context, Result};

use eventmatch::config::EventMatchConfig;
use eventmatch::db;

/// Run database diagnostics and print a health report.
pub fn doctor(config: &EventMatchConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `eventmatch serve` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;

    let report = db::check_database_health(&conn).context("failed to run health check")?;

    println!("EventMatch Health Report");
    println!("========================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!();
    println!("Embedding model:");
    println!("  Stored:          {}", report.embedding_model.as_deref().unwrap_or("(not set)"));
    println!("  Configured:      {}", config.embedding.model);
    if let Some(ref stored) = report.embedding_model {
        if stored != &config.embedding.model {
            println!("  WARNING: model mismatch! Run `eventmatch re-embed` to update vectors.");
        } else {
            println!("  Status:          OK (match)");
        }
    }
    println!("  API key:         {}", if config.embedding.api_key.is_some() { "set" } else { "missing (set OPENAI_API_KEY)" });
    println!();
    println!("Row counts:");
    println!("  Users:           {}", report.user_count);
    println!("  Events:          {}", report.event_count);
    println!("  Registrations:   {}", report.registration_count);
    println!("  No embedding:    {}", report.missing_embeddings);
    if report.corrupt_embeddings > 0 {
        println!("    of which corrupt: {}", report.corrupt_embeddings);
    }
    if report.missing_embeddings > 0 {
        println!("  Records without an embedding are never recommended or used as a query.");
        println!("  Run `eventmatch re-embed` to backfill them.");
    }
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup: cp backup.db {}", db_path.display());
        println!("  2. Or delete the database and recreate users and events.");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
