use std::sync::Arc;

use tokio::net::TcpListener;

use ntumiwa::auth::ensure_user;
use ntumiwa::catalog::{CatalogStore, MemoryCatalog, SqliteCatalog};
use ntumiwa::{
    AppConfig, InMemorySessionStore, InMemoryUserStore, PasswordHasher, SessionManager,
    SqliteUserStore, UserStore, spawn_sweeper,
};
use ntumiwa_axum::{AppState, app_router};

pub(crate) async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (users, catalog): (Arc<dyn UserStore>, Arc<dyn CatalogStore>) =
        match config.database_url.as_deref() {
            Some(url) => (
                Arc::new(SqliteUserStore::connect(url).await?),
                Arc::new(SqliteCatalog::connect(url).await?),
            ),
            None => {
                tracing::warn!("DATABASE_URL not set, users and catalog are kept in memory");
                (
                    Arc::new(InMemoryUserStore::new()),
                    Arc::new(MemoryCatalog::new()),
                )
            }
        };
    let hasher = PasswordHasher::new(&config.hash)?;

    if let Some(admin) = &config.admin {
        if ensure_user(users.as_ref(), &hasher, &admin.username, &admin.password).await? {
            tracing::info!(username = %admin.username, "Created administrator account");
        }
    }

    let sessions = Arc::new(SessionManager::new(
        config.session.clone(),
        Arc::new(InMemorySessionStore::new()),
    ));
    let sweeper = spawn_sweeper(sessions.clone());

    let state = AppState {
        sessions,
        users,
        hasher,
        catalog,
    };

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped, stopping session sweeper");
    sweeper.shutdown().await;
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
