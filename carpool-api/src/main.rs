use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use carpool_api::{app, AppState, AuthConfig};
use carpool_core::events::EventSink;
use carpool_store::app_config::Config;
use carpool_store::{DbClient, EventProducer, RedisClient};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carpool_api=debug,carpool_core=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Carpool API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database).await.context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;
    let repos = carpool_store::repositories(&db);

    // Kafka is optional; booking events still reach SSE clients without it
    let mut sinks: Vec<Arc<dyn EventSink>> = Vec::new();
    if let Some(kafka) = &config.kafka {
        let producer = EventProducer::new(&kafka.brokers, &kafka.topic).context("Failed to create Kafka producer")?;
        sinks.push(Arc::new(producer));
    }

    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
        expiration: config.auth.jwt_expiration_seconds,
    };
    let mut app_state = AppState::new(&repos, sinks, config.matching.clone(), auth)?;

    // Redis only backs the rate limiter
    if let Some(redis) = &config.redis {
        let client = RedisClient::new(&redis.url).context("Failed to create Redis client")?;
        app_state = app_state.with_rate_limit(Arc::new(client), config.rate_limit.clone());
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>()
    ).await?;

    Ok(())
}
