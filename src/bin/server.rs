use std::sync::Arc;

use sea_orm::Database;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use apiwatch::alerting::AlertEngine;
use apiwatch::config::ServerConfig;
use apiwatch::monitoring::{CheckScheduler, MonitorTickRunner, Prober};
use apiwatch::notifications::NotificationDispatcher;
use apiwatch::notifications::senders::email::EmailSender;
use apiwatch::notifications::senders::{LogOnlySender, NotificationSender};
use apiwatch::realtime::EventHub;
use apiwatch::web::{AppState, create_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Arc::new(ServerConfig::from_env()?);

    let db = Database::connect(&config.database_url).await?;
    info!("Database connected.");

    let hub = Arc::new(EventHub::new());

    let sender: Arc<dyn NotificationSender> = match &config.smtp {
        Some(smtp) => Arc::new(EmailSender::new(smtp)?),
        None => {
            info!("No SMTP configuration found; notifications will be logged only.");
            Arc::new(LogOnlySender)
        }
    };
    let dispatcher = Arc::new(NotificationDispatcher::start(sender));

    let engine = Arc::new(AlertEngine::new(
        db.clone(),
        Arc::clone(&hub),
        Arc::clone(&dispatcher),
    ));
    let prober = Arc::new(Prober::new());
    let runner = Arc::new(MonitorTickRunner::new(
        db.clone(),
        prober,
        engine,
        Arc::clone(&hub),
    ));
    let scheduler = Arc::new(CheckScheduler::new(Arc::clone(&runner)));

    // Rebuild the schedule table from the durable set of active endpoints.
    scheduler.reconcile(&db).await;

    let app_state = Arc::new(AppState {
        db,
        config: Arc::clone(&config),
        scheduler: Arc::clone(&scheduler),
        runner,
        hub,
        dispatcher,
    });

    let router = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Server listening.");

    let serve_result = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    scheduler.shutdown().await;

    if let Err(e) = serve_result {
        error!(error = %e, "Server exited with error.");
        return Err(e.into());
    }
    info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C; shutting down."),
        _ = terminate => info!("Received SIGTERM; shutting down."),
    }
}
