mod config;
mod db;
mod errors;
mod extract;
mod fingerprint;
mod letters;
mod llm_client;
mod models;
mod profile;
mod provider;
mod render;
mod repository;
mod routes;
mod state;
mod storage;
mod tailoring;
#[cfg(test)]
mod testing;
mod validation;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::{BlobBackend, Config};
use crate::db::{create_pool, run_migrations};
use crate::llm_client::LlmClient;
use crate::provider::{CachedProvider, ClaudeProvider, LlmProvider};
use crate::repository::PgRepository;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{BlobStore, LocalBlobStore, S3BlobStore};
use crate::tailoring::RateLimiter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter(&config.rust_log))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Credfolio API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    run_migrations(&db).await?;
    let repo = Arc::new(PgRepository::new(db));

    // Initialize blob storage
    let blobs: Arc<dyn BlobStore> = match &config.blob_backend {
        BlobBackend::Local { upload_path } => {
            info!("Storing uploads under {upload_path}");
            Arc::new(LocalBlobStore::new(upload_path.clone()))
        }
        BlobBackend::S3 {
            bucket,
            endpoint,
            access_key_id,
            secret_access_key,
        } => {
            let client = build_s3_client(endpoint, access_key_id, secret_access_key).await;
            info!("S3 client initialized (bucket: {bucket})");
            Arc::new(S3BlobStore::new(client, bucket.clone()))
        }
    };

    // Initialize LLM provider
    let client = LlmClient::new(config.anthropic_api_key.clone(), config.llm_timeout)?;
    let llm: Arc<dyn LlmProvider> = Arc::new(CachedProvider::new(Arc::new(ClaudeProvider::new(
        client,
        config.llm_timeout,
    ))));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let limiter = Arc::new(RateLimiter::per_minute(config.ai_requests_per_minute));

    // Build app state
    let state = AppState {
        repo,
        blobs,
        llm,
        limiter,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the web client's host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Filter directive used when `RUST_LOG` holds a bare level. Tracing targets
/// use the crate name, which has an underscore where the package has a hyphen.
fn default_log_filter(level: &str) -> String {
    format!("{}={level}", env!("CARGO_CRATE_NAME"))
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(
    endpoint: &str,
    access_key_id: &str,
    secret_access_key: &str,
) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        access_key_id,
        secret_access_key,
        None,
        None,
        "credfolio-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(endpoint)
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
