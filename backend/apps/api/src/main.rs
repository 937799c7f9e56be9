//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; application-level errors are
//! `identity::IdentityError` / `kernel::error::AppError`.

use axum::{
    Router, http,
    http::{Method, header},
};
use identity::domain::service::{AssertionVerifier, SignedAssertionVerifier};
use identity::{IdentityConfig, PgIdentityRepository, identity_router};
use platform::encryption::FieldCipher;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,identity=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    // Identity configuration
    let identity_config = if cfg!(debug_assertions) {
        IdentityConfig::development()
    } else {
        // In production, the signing secret comes from the environment
        let secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set in production");
        IdentityConfig::new(secret.into_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid JWT_SECRET: {}", e))?
    };

    // Field encryption key for PII at rest
    let cipher = match env::var("FIELD_KEY") {
        Ok(encoded) => FieldCipher::from_base64_key(&encoded)
            .map_err(|e| anyhow::anyhow!("Invalid FIELD_KEY: {}", e))?,
        Err(_) if cfg!(debug_assertions) => {
            tracing::warn!("FIELD_KEY not set, using a volatile development key");
            FieldCipher::with_random_key()
        }
        Err(_) => panic!("FIELD_KEY must be set in production"),
    };

    // Federated login is mounted only when the gateway secret is configured
    let assertion_verifier: Option<Arc<dyn AssertionVerifier>> =
        match env::var("FEDERATED_ASSERTION_SECRET") {
            Ok(secret) => {
                let issuer = env::var("FEDERATED_ASSERTION_ISSUER")
                    .unwrap_or_else(|_| "auth-gateway".to_string());
                tracing::info!(issuer = %issuer, "Federated login enabled");
                Some(Arc::new(SignedAssertionVerifier::new(
                    secret.as_bytes(),
                    issuer,
                    "vetsecure",
                )))
            }
            Err(_) => None,
        };

    let repo = PgIdentityRepository::new(pool.clone(), Arc::new(cipher));

    // CORS configuration
    let frontend_origins =
        env::var("FRONTEND_ORIGINS").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .nest(
            "/api/auth",
            identity_router(repo, identity_config, assertion_verifier),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
