//! HTTP handlers
//!
//! Glob re-exports keep the `__path_*` items generated by `utoipa::path`
//! reachable from `crate::gateway::handlers` for the OpenAPI derive.

pub mod account;
pub mod health;
pub mod transfer;

pub use account::*;
pub use health::*;
pub use transfer::*;
