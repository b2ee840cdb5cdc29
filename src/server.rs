//! Serving entry points: MCP over stdio, or MCP plus a JSON health endpoint
//! over HTTP.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Json;
use eventmatch::config::EventMatchConfig;
use eventmatch::db::{self, HealthReport};
use eventmatch::embedding::{self, EmbeddingProvider};
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::StreamableHttpService;
use rmcp::ServiceExt;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::tools::EventMatchTools;

/// Everything a tool call needs, shared by every MCP session.
#[derive(Clone)]
struct AppState {
    db: Arc<Mutex<Connection>>,
    embedding: Arc<dyn EmbeddingProvider>,
    config: Arc<EventMatchConfig>,
}

impl AppState {
    /// Open the catalog, report anything that will degrade recommendations,
    /// then build the embedding provider.
    async fn open(config: EventMatchConfig) -> Result<Self> {
        let db_path = config.resolved_db_path();
        let conn = db::open_database(&db_path)?;

        let report = db::check_database_health(&conn).context("startup health check failed")?;
        tracing::info!(
            db = %db_path.display(),
            users = report.user_count,
            events = report.event_count,
            registrations = report.registration_count,
            "catalog ready"
        );
        for warning in startup_warnings(&report, &config.embedding.model) {
            tracing::warn!("{warning}");
        }

        let embedding = embedding::create_shared_provider(&config.embedding).await?;
        tracing::info!(model = embedding.model(), "embedding provider ready");

        Ok(Self {
            db: Arc::new(Mutex::new(conn)),
            embedding,
            config: Arc::new(config),
        })
    }

    fn tools(&self) -> EventMatchTools {
        EventMatchTools::new(
            Arc::clone(&self.db),
            Arc::clone(&self.embedding),
            Arc::clone(&self.config),
        )
    }
}

/// Conditions under which recommendations will be worse than they could be.
fn startup_warnings(report: &HealthReport, configured_model: &str) -> Vec<String> {
    let mut warnings = Vec::new();
    if let Some(ref stored) = report.embedding_model {
        if stored != configured_model {
            warnings.push(format!(
                "stored vectors come from '{stored}' but '{configured_model}' is configured; \
                 run `eventmatch re-embed`"
            ));
        }
    }
    if report.missing_embeddings > 0 {
        warnings.push(format!(
            "{} users or events have no usable embedding ({} corrupt) and will be skipped \
             when ranking; run `eventmatch re-embed`",
            report.missing_embeddings, report.corrupt_embeddings
        ));
    }
    if !report.integrity_ok {
        warnings.push(format!("database integrity check failed: {}", report.integrity_details));
    }
    warnings
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: EventMatchConfig) -> Result<()> {
    tracing::info!("starting eventmatch MCP server on stdio");

    let state = AppState::open(config).await?;
    let server = state.tools().serve(rmcp::transport::stdio()).await?;
    tracing::info!("waiting for MCP client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");
    Ok(())
}

/// Start the MCP server over Streamable HTTP at `/mcp`, with the catalog
/// health report at `/health`.
pub async fn serve_http(config: EventMatchConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::open(config).await?;

    let mcp_state = state.clone();
    let mcp = StreamableHttpService::new(
        move || Ok(mcp_state.tools()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let router = axum::Router::new()
        .route("/health", get(health))
        .with_state(state)
        .nest_service("/mcp", mcp);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "serving MCP at /mcp and health at /health");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthReport>, (StatusCode, String)> {
    let db = Arc::clone(&state.db);
    let report = tokio::task::spawn_blocking(move || {
        let conn = db
            .lock()
            .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
        db::check_database_health(&conn)
    })
    .await
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("health task failed: {e}")))?
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(report))
}
