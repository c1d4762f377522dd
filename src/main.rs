use std::net::SocketAddr;
use std::sync::Arc;

use face_attendance::api::create_router;
use face_attendance::config::{Config, FALLBACK_DATABASE_URL};
use face_attendance::db::{create_lazy_pool, create_pool, PgDirectory};
use face_attendance::face::{CollectionNaming, RekognitionFaceService};
use face_attendance::services::Backends;
use face_attendance::storage::S3Backend;

use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "face_attendance=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    config.log_missing();

    tracing::info!("Starting face-attendance server...");

    let pool = connect_database(&config).await?;
    match sqlx::migrate!("./migrations").run(&pool).await {
        Ok(()) => tracing::info!("Database migrations applied"),
        Err(e) => tracing::error!("Failed to apply migrations: {}", e),
    }

    let storage = S3Backend::new(
        config.s3_bucket.clone(),
        &config.aws_region,
        config.aws_access_key_id.as_deref(),
        config.aws_secret_access_key.as_deref(),
        config.external_timeout(),
    )?;
    tracing::info!("S3 storage enabled: bucket={}", config.s3_bucket);

    if !config.has_aws_credentials() {
        tracing::warn!("AWS keys not set, falling back to the default credential chain");
    }
    let faces = RekognitionFaceService::from_config(&config).await;
    tracing::info!(
        "Face service enabled: region={}, collection_prefix={}",
        config.aws_region,
        config.face_collection_prefix
    );

    let backends = Backends {
        directory: Arc::new(PgDirectory::new(pool)),
        storage: Arc::new(storage),
        faces: Arc::new(faces),
        collections: CollectionNaming::new(config.face_collection_prefix.clone()),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    let app = create_router(backends)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Falls back to a lazily connecting pool so a missing or unreachable database
/// only fails the requests that need it.
async fn connect_database(config: &Config) -> anyhow::Result<PgPool> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, using {}", FALLBACK_DATABASE_URL);
        return Ok(create_lazy_pool(FALLBACK_DATABASE_URL)?);
    };

    tracing::info!("Connecting to database...");
    match create_pool(url).await {
        Ok(pool) => {
            tracing::info!("Database connection established");
            Ok(pool)
        }
        Err(e) => {
            tracing::error!("Database connection failed, retrying lazily: {}", e);
            Ok(create_lazy_pool(url)?)
        }
    }
}
