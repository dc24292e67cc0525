mod auth;
mod config;
mod database;
mod email;
mod entities;
mod error;
mod router;
mod routes;
mod services;

use std::sync::Arc;

use axum_login::tower_sessions::ExpiredDeletion;
use tokio::net::TcpListener;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::email::{ConsoleEmailSender, EmailSender, SmtpEmailSender};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.rust_log.clone()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (db, pool) = database::setup_database(&config.database_url).await?;

    let session_store = PostgresStore::new(pool);
    session_store.migrate().await?;

    let deletion_task = tokio::task::spawn(
        session_store
            .clone()
            .continuously_delete_expired(tokio::time::Duration::from_secs(60)),
    );

    let mailer: Arc<dyn EmailSender> = match &config.smtp {
        Some(smtp) => {
            let sender = SmtpEmailSender::new(smtp.clone()).map_err(anyhow::Error::msg)?;
            Arc::new(sender)
        }
        None => {
            tracing::warn!("SMTP not configured, emails go to the console");
            Arc::new(ConsoleEmailSender)
        }
    };

    let app = router::create_router(db, mailer, Arc::new(config), session_store).await?;

    let listener = TcpListener::bind("0.0.0.0:3000").await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(router::shutdown_signal(deletion_task.abort_handle()))
        .await?;

    deletion_task.await??;

    Ok(())
}
