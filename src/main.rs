use std::{error::Error, future::IntoFuture as _};

use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use tokio::{fs, net, task};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{
    layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter,
};

use helpdesk::{db, http, Config};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = fs::read_to_string("config.toml").await?;
    let config = toml::from_str::<Config>(&config)?;

    let (mut db_client, db_connection) = db::connect(config.db).await?;
    let mut db_connection = task::spawn(db_connection);
    tracing::info!("connected to database");

    let applied = db_client.migrate().await?;
    tracing::info!(applied = applied.len(), "database schema is up to date");

    let allowed_origins = config
        .http
        .cors
        .allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()?;
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH])
        .allow_headers([CONTENT_TYPE])
        .allow_origin(allowed_origins);

    let app = http::router(http::AppState {
        store: Box::new(db_client),
        lookup_key: config.tickets.lookup_key,
        create_attempts: config.tickets.create_attempts,
    })
    .layer(cors);

    let listener = net::TcpListener::bind(config.http.server.addr).await?;
    tracing::info!("listening on {}", config.http.server.addr);

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(http::shutdown_signal())
        .into_future();

    // Losing the database connection stops the server.
    tokio::select! {
        res = server => res?,
        res = &mut db_connection => {
            return Err(match res {
                Ok(Ok(())) => "database connection closed".into(),
                Ok(Err(e)) => e.into(),
                Err(e) => e.into(),
            });
        }
    }

    // The server held the last client handle, so the connection ends now.
    if let Err(e) = db_connection.await? {
        tracing::warn!("database connection closed with error: {e}");
    }

    Ok(())
}
