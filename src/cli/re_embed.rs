//! CLI `re-embed` command: regenerate every user and event embedding with the
//! configured model.

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rusqlite::Connection;

use eventmatch::catalog::types::{Event, User};
use eventmatch::catalog::{events, profile, users};
use eventmatch::config::EventMatchConfig;
use eventmatch::db;
use eventmatch::embedding::{self, embed_or_absent, EmbeddingProvider};

const BATCH_SIZE: usize = 32;

enum Record {
    User(User),
    Event(Event),
}

/// Counts from one re-embed pass.
#[derive(Debug, Default, PartialEq, Eq)]
struct Summary {
    total: usize,
    /// Rows that now hold a vector from the configured model.
    written: usize,
    /// Rows left without a vector (no text, or the provider failed).
    absent: usize,
    /// Rows whose text changed mid-run; their vector was dropped.
    changed: usize,
}

/// Re-embed all users and events. Records with no text, or whose text the
/// provider rejects, end up with no embedding.
pub async fn re_embed(config: &EventMatchConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path).context("failed to open database")?;

    let provider = embedding::create_shared_provider(&config.embedding)
        .await
        .context("failed to create embedding provider")?;

    println!("Re-embedding users and events with model '{}'...", config.embedding.model);

    let pb = ProgressBar::new(0);
    pb.set_style(super::progress_style());
    let model = config.embedding.model.clone();
    let progress = pb.clone();
    let summary = tokio::task::spawn_blocking(move || {
        re_embed_records(&conn, provider.as_ref(), &model, &progress)
    })
    .await
    .context("re-embed task failed")??;
    pb.finish_and_clear();

    if summary.total == 0 {
        println!("No users or events to re-embed.");
        return Ok(());
    }

    println!(
        "Re-embedded {} of {} records with model '{}'.",
        summary.written, summary.total, config.embedding.model
    );
    if summary.absent > 0 {
        println!("{} records have no embedding (empty text or provider errors; see log).", summary.absent);
    }
    if summary.changed > 0 {
        println!("{} records changed during the run; run `eventmatch re-embed` again to cover them.", summary.changed);
    }
    if summary.written == 0 {
        println!("No vectors were written, so the stored model identifier was left unchanged.");
    }
    Ok(())
}

/// Re-embed every user and event in batches. The model identifier is only
/// recorded once at least one vector from it has been stored.
fn re_embed_records(
    conn: &Connection,
    provider: &dyn EmbeddingProvider,
    model: &str,
    pb: &ProgressBar,
) -> Result<Summary> {
    let mut work: Vec<(Record, Option<String>)> = Vec::new();
    for user in users::all_users(conn)? {
        let text = profile::user_profile_text(user.bio.as_deref(), user.interests.as_deref());
        work.push((Record::User(user), text));
    }
    for event in events::all_events(conn)? {
        let text = profile::event_profile_text(&event.title, &event.description, &event.location);
        work.push((Record::Event(event), text));
    }

    let mut summary = Summary {
        total: work.len(),
        ..Summary::default()
    };
    pb.set_length(work.len() as u64);

    for chunk in work.chunks(BATCH_SIZE) {
        let texts: Vec<Option<String>> = chunk.iter().map(|(_, text)| text.clone()).collect();
        let vectors = embed_chunk(provider, &texts);

        for ((record, _), vector) in chunk.iter().zip(vectors.iter()) {
            let stored = match record {
                Record::User(user) => users::replace_user_embedding(conn, user, vector.as_deref())?,
                Record::Event(event) => {
                    events::replace_event_embedding(conn, event, vector.as_deref())?
                }
            };
            match (stored, vector) {
                (false, _) => summary.changed += 1,
                (true, Some(_)) => summary.written += 1,
                (true, None) => summary.absent += 1,
            }
        }

        pb.inc(chunk.len() as u64);
    }

    if summary.written > 0 {
        db::migrations::set_embedding_model(conn, model)?;
    } else if summary.total > 0 {
        tracing::warn!(model, "no vectors written, keeping the stored model identifier");
    }

    Ok(summary)
}

/// Embed the non-empty texts of a chunk in one request, falling back to one
/// request per text when the batch fails.
fn embed_chunk(provider: &dyn EmbeddingProvider, texts: &[Option<String>]) -> Vec<Option<Vec<f32>>> {
    let present: Vec<&str> = texts.iter().flatten().map(String::as_str).collect();
    if present.is_empty() {
        return vec![None; texts.len()];
    }

    match provider.embed_batch(&present) {
        Ok(vectors) if vectors.len() == present.len() => {
            let mut vectors = vectors.into_iter();
            texts
                .iter()
                .map(|text| {
                    let vector = text.as_ref().and_then(|_| vectors.next())?;
                    if vector.len() != provider.dimensions() {
                        tracing::warn!(
                            model = provider.model(),
                            expected = provider.dimensions(),
                            actual = vector.len(),
                            "embedding has unexpected dimensionality, treating as absent"
                        );
                        return None;
                    }
                    Some(vector)
                })
                .collect()
        }
        Ok(vectors) => {
            tracing::warn!(
                expected = present.len(),
                actual = vectors.len(),
                "batch returned wrong number of vectors, retrying one by one"
            );
            embed_each(provider, texts)
        }
        Err(e) => {
            tracing::warn!(error = %e, "batch embedding failed, retrying one by one");
            embed_each(provider, texts)
        }
    }
}

fn embed_each(provider: &dyn EmbeddingProvider, texts: &[Option<String>]) -> Vec<Option<Vec<f32>>> {
    texts
        .iter()
        .map(|text| text.as_deref().and_then(|t| embed_or_absent(provider, t)))
        .collect()
}
