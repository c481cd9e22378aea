//! Users: registration, login and JWT issuance

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod service;

pub use error::UserError;
pub use models::{LoginResponse, User, UserResponse};
pub use repository::{MemoryUserRepository, PgUserRepository, UserRepository};
pub use service::{Claims, UserChanges, UserService};
