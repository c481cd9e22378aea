use std::sync::Arc;
use std::time::Duration;

use crate::ledger::Ledger;
use crate::user_auth::UserService;

/// Gateway application state (shared)
#[derive(Clone)]
pub struct AppState {
    pub ledger: Ledger,
    pub users: Arc<UserService>,
    /// Deadline applied to each transfer request
    pub transfer_timeout: Duration,
}

impl AppState {
    pub fn new(ledger: Ledger, users: Arc<UserService>, transfer_timeout: Duration) -> Self {
        Self {
            ledger,
            users,
            transfer_timeout,
        }
    }
}
