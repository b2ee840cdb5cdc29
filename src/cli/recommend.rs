//! CLI `recommend` command: print ranked recommendations for one user.

use anyhow::{Context, Result};

use eventmatch::config::EventMatchConfig;
use eventmatch::db;
use eventmatch::embedding;
use eventmatch::recommend::{recommend_for_user, Recommendations};

/// Print up to `limit` recommended events for `user_id`.
pub async fn recommend(config: &EventMatchConfig, user_id: &str, limit: Option<usize>) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path).context("failed to open database")?;

    let provider = embedding::create_shared_provider(&config.embedding)
        .await
        .context("failed to create embedding provider")?;

    let settings = config.recommendation.settings(limit);
    let user_id_owned = user_id.to_string();
    let recommendations = tokio::task::spawn_blocking(move || {
        recommend_for_user(
            &conn,
            provider.as_ref(),
            &user_id_owned,
            &settings,
            chrono::Utc::now(),
        )
    })
    .await??;

    match recommendations {
        Recommendations::ProfileIncomplete { message } => {
            println!("{message}");
        }
        Recommendations::Ranked { events } if events.is_empty() => {
            println!("No upcoming events match this profile yet.");
        }
        Recommendations::Ranked { events } => {
            println!("Recommended events for {user_id}:");
            println!();
            for (i, event) in events.iter().enumerate() {
                let category = event.category.as_deref().unwrap_or("uncategorized");
                let marker = if event.category_match { " *" } else { "" };
                println!(
                    "{:>2}. [{:.3}] {} ({}){}",
                    i + 1,
                    event.score,
                    event.title,
                    category,
                    marker
                );
                println!("    {} | {}", event.event_date, event.location);
            }
            if events.iter().any(|e| e.category_match) {
                println!();
                println!("* category matches your interests (+{:.2})", config.recommendation.category_boost);
            }
        }
    }

    Ok(())
}
