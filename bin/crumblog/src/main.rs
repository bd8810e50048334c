//! # crumblog Binary
//!
//! The entry point that assembles the application based on compile-time features
//! and runtime configuration.

use anyhow::Context;
use cl_api::{router, AppState};
use cl_config::{AppConfig, Backend, DatabaseConfig, LogConfig};
use cl_core::services::{Registration, Services};
use cl_core::traits::{IdentityProvider, RatingRepo, SubmissionRepo, UserRepo};
use cl_core::Catalog;
use secrecy::ExposeSecret;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

// Feature-gated imports: the binary is compiled to order.
#[cfg(feature = "db-memory")]
use cl_db_memory::MemoryStore;

#[cfg(feature = "db-sqlite")]
use cl_db_sqlite::SqliteStore;

#[cfg(feature = "auth-simple")]
use cl_auth_simple::SimpleIdentityProvider;

#[cfg(not(feature = "auth-simple"))]
compile_error!("crumblog needs an identity provider: enable the `auth-simple` feature");

/// The three repository ports, backed by one store.
struct Stores {
    submissions: Arc<dyn SubmissionRepo>,
    ratings: Arc<dyn RatingRepo>,
    users: Arc<dyn UserRepo>,
}

impl Stores {
    fn shared<S>(store: Arc<S>) -> Self
    where
        S: SubmissionRepo + RatingRepo + UserRepo + 'static,
    {
        Self { submissions: store.clone(), ratings: store.clone(), users: store }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.log);

    info!(version = env!("CARGO_PKG_VERSION"), "starting crumblog");

    // 1. Catalog
    let catalog = Arc::new(load_catalog(&config)?);
    info!(breads = catalog.len(), "catalog loaded");

    // 2. Storage
    let stores = open_stores(&config.database).await?;

    // 3. Identity provider
    let provider: Arc<dyn IdentityProvider> = Arc::new(SimpleIdentityProvider::new());

    let services = Arc::new(Services::new(
        catalog,
        stores.submissions,
        stores.ratings,
        stores.users,
        provider,
    ));

    // 4. Bootstrap administrator
    if let Some(admin) = &config.admin {
        let profile = services
            .identity
            .ensure_admin(Registration {
                username: admin.username.clone(),
                email: admin.email.clone(),
                password: admin.password.expose_secret().to_string(),
                display_name: None,
            })
            .await
            .context("Failed to bootstrap admin account")?;
        info!(user_id = %profile.id, "admin account ready");
    }

    let app = router(AppState::new(services));

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;
    info!("crumblog listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins over the configured filter.
fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let registry = tracing_subscriber::registry().with(filter);
    if log.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

fn load_catalog(config: &AppConfig) -> anyhow::Result<Catalog> {
    match &config.catalog.path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read catalog {}", path.display()))?;
            Ok(Catalog::from_json(&json)?)
        }
        None => Ok(Catalog::builtin()?),
    }
}

async fn open_stores(db: &DatabaseConfig) -> anyhow::Result<Stores> {
    match db.backend {
        #[cfg(feature = "db-memory")]
        Backend::Memory => {
            info!("using in-memory store; data is lost on exit");
            Ok(Stores::shared(Arc::new(MemoryStore::new())))
        }
        #[cfg(feature = "db-sqlite")]
        Backend::Sqlite => {
            let store = SqliteStore::connect(&db.url)
                .await
                .with_context(|| format!("Failed to open {}", db.url))?;
            Ok(Stores::shared(Arc::new(store)))
        }
        #[allow(unreachable_patterns)]
        other => anyhow::bail!("database backend {other:?} is not compiled into this binary"),
    }
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
