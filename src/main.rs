//! Bank Ledger server
//!
//! ```text
//! bank_ledger [config.yaml]
//! bank_ledger --env dev        # loads config/dev.yaml
//! ```

use std::sync::Arc;

use anyhow::Context;

use bank_ledger::config::{AppConfig, StoreKind};
use bank_ledger::db::Database;
use bank_ledger::gateway::{self, state::AppState};
use bank_ledger::ledger::{Ledger, LedgerStore, MemoryLedger, PgLedger};
use bank_ledger::user_auth::{
    MemoryUserRepository, PgUserRepository, UserRepository, UserService,
};

fn load_config() -> anyhow::Result<AppConfig> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return AppConfig::load(&args[i + 1]).context("Failed to load config");
        }
    }
    let path = args
        .first()
        .cloned()
        .unwrap_or_else(|| "config/dev.yaml".to_string());
    AppConfig::from_file(&path).with_context(|| format!("Failed to load config from {}", path))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    let _log_guard = bank_ledger::logging::init_logging(&config);

    let (store, users): (Arc<dyn LedgerStore>, Arc<dyn UserRepository>) = match config.store {
        StoreKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("database_url is required for the postgres store")?;
            let db = Database::connect(url, config.db_max_connections)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.init_schema()
                .await
                .context("Failed to initialize schema")?;
            let store: Arc<dyn LedgerStore> = Arc::new(PgLedger::new(db.pool().clone()));
            let users: Arc<dyn UserRepository> =
                Arc::new(PgUserRepository::new(db.pool().clone()));
            (store, users)
        }
        StoreKind::Memory => {
            tracing::warn!("Using in-memory store; all data is lost on exit");
            let users: Arc<dyn UserRepository> = Arc::new(MemoryUserRepository::new());
            let store: Arc<dyn LedgerStore> =
                Arc::new(MemoryLedger::new().with_users(Arc::clone(&users)));
            (store, users)
        }
    };

    tracing::info!(
        store = store.name(),
        version = env!("GIT_HASH"),
        "Starting bank ledger"
    );

    let ledger = Ledger::new(store);
    let user_service = Arc::new(UserService::new(
        users,
        config.jwt_secret.clone(),
        config.access_token_duration(),
    ));
    let state = Arc::new(AppState::new(
        ledger,
        user_service,
        config.transfer_timeout(),
    ));

    gateway::run_server(&config.gateway, state)
        .await
        .context("Gateway server error")
}
