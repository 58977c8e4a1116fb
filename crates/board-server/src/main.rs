mod bots;
mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use board_api::AppStateInner;
use board_bot::bot::Bot;
use board_bot::{broadcast, client, poster};
use board_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "board=debug,board_api=debug,board_bot=debug,board_db=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    // Reply pipeline: broadcaster -> bots -> poster -> broadcaster
    let shutdown = CancellationToken::new();
    let (broadcaster, dispatcher) = broadcast::channel(config.queue_capacity);
    let (poster, posting) = poster::channel(config.poster_capacity);

    let dispatch_task = tokio::spawn(dispatcher.run());
    let poster_task = tokio::spawn(posting.run(
        db.clone(),
        broadcaster.clone(),
        config.publish_timeout,
    ));

    let http = client::http_client(config.api_timeout)?;
    let mut bot_tasks = Vec::new();
    for (index, kind) in config.bots.iter().copied().enumerate() {
        let Some(processor) = bots::build_processor(kind, &config, &http, index) else {
            continue;
        };
        let inbox = broadcaster.register(kind.name(), config.inbox_capacity).await?;
        let bot = Bot::new(kind.name(), processor, inbox, poster.clone());
        bot_tasks.push(tokio::spawn(bot.run(shutdown.clone())));
    }
    // Only bots post; the poster stops once they are all gone.
    drop(poster);
    info!("{} bots running", bot_tasks.len());

    // Routes
    let state = Arc::new(AppStateInner {
        db,
        broadcaster,
        publish_timeout: config.publish_timeout,
    });
    let app = board_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Board server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    // Drain: bots stop on the token, then the poster and broadcaster run dry.
    shutdown.cancel();
    for task in bot_tasks {
        if let Err(e) = task.await {
            warn!("Bot task failed: {}", e);
        }
    }
    let posted = poster_task.await?;
    let stats = dispatch_task.await?;
    info!(
        posted,
        delivered = stats.delivered,
        dropped = stats.dropped,
        "Board server stopped"
    );

    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("SIGTERM handler unavailable: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
    shutdown.cancel();
}
