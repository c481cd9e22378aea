//! User repository: PostgreSQL and in-memory implementations

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::error::UserError;
use super::models::{CreateUserParams, UpdateUserParams, User, never_changed};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `AlreadyExists` on a duplicate username or email.
    async fn create_user(&self, params: CreateUserParams) -> Result<User, UserError>;

    async fn get_user(&self, username: &str) -> Result<User, UserError>;

    async fn update_user(&self, params: UpdateUserParams) -> Result<User, UserError>;
}

fn user_from_row(row: &PgRow) -> Result<User, UserError> {
    Ok(User {
        username: row.try_get("username")?,
        hashed_password: row.try_get("hashed_password")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        password_changed_at: row.try_get("password_changed_at")?,
        created_at: row.try_get("created_at")?,
    })
}

const USER_COLUMNS: &str =
    "username, hashed_password, full_name, email, password_changed_at, created_at";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, params: CreateUserParams) -> Result<User, UserError> {
        let sql = format!(
            r#"INSERT INTO users (username, hashed_password, full_name, email)
               VALUES ($1, $2, $3, $4) RETURNING {}"#,
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(&params.username)
            .bind(&params.hashed_password)
            .bind(&params.full_name)
            .bind(&params.email)
            .fetch_one(&self.pool)
            .await?;
        user_from_row(&row)
    }

    async fn get_user(&self, username: &str) -> Result<User, UserError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| UserError::NotFound(username.to_string()))?;
        user_from_row(&row)
    }

    async fn update_user(&self, params: UpdateUserParams) -> Result<User, UserError> {
        let sql = format!(
            r#"UPDATE users SET
                   hashed_password = COALESCE($1, hashed_password),
                   password_changed_at = COALESCE($2, password_changed_at),
                   full_name = COALESCE($3, full_name),
                   email = COALESCE($4, email)
               WHERE username = $5
               RETURNING {}"#,
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(params.hashed_password.as_deref())
            .bind(params.password_changed_at)
            .bind(params.full_name.as_deref())
            .bind(params.email.as_deref())
            .bind(&params.username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| UserError::NotFound(params.username.clone()))?;
        user_from_row(&row)
    }
}

/// In-memory users keyed by username
#[derive(Default)]
pub struct MemoryUserRepository {
    users: Mutex<BTreeMap<String, User>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, User>> {
        self.users.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create_user(&self, params: CreateUserParams) -> Result<User, UserError> {
        let mut users = self.users();
        if users.contains_key(&params.username) {
            return Err(UserError::AlreadyExists(params.username));
        }
        if users.values().any(|u| u.email == params.email) {
            return Err(UserError::AlreadyExists(params.email));
        }
        let user = User {
            username: params.username,
            hashed_password: params.hashed_password,
            full_name: params.full_name,
            email: params.email,
            password_changed_at: never_changed(),
            created_at: Utc::now(),
        };
        users.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, username: &str) -> Result<User, UserError> {
        self.users()
            .get(username)
            .cloned()
            .ok_or_else(|| UserError::NotFound(username.to_string()))
    }

    async fn update_user(&self, params: UpdateUserParams) -> Result<User, UserError> {
        let mut users = self.users();
        if let Some(email) = &params.email {
            if users
                .values()
                .any(|u| &u.email == email && u.username != params.username)
            {
                return Err(UserError::AlreadyExists(email.clone()));
            }
        }
        let user = users
            .get_mut(&params.username)
            .ok_or_else(|| UserError::NotFound(params.username.clone()))?;
        if let Some(hash) = params.hashed_password {
            user.hashed_password = hash;
        }
        if let Some(at) = params.password_changed_at {
            user.password_changed_at = at;
        }
        if let Some(name) = params.full_name {
            user.full_name = name;
        }
        if let Some(email) = params.email {
            user.email = email;
        }
        Ok(user.clone())
    }
}
