//! User accounts and their store operations.
//!
//! ```sql
//! CREATE TABLE users (
//!     id            INTEGER PRIMARY KEY,
//!     email         TEXT NOT NULL UNIQUE,   -- trimmed, lowercase
//!     password_hash TEXT NOT NULL,          -- bcrypt
//!     role          TEXT NOT NULL DEFAULT 'user',
//!     created_at    TIMESTAMP NOT NULL
//! );
//! ```

use chrono::{DateTime, Utc};
use common::{Role, UserDto, UserSummaryDto};

use crate::db::DbPool;

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Debug)]
struct UserSummaryRecord {
    id: i64,
    email: String,
    role: String,
    created_at: DateTime<Utc>,
    task_count: i64,
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
}

// Roles are constrained by a CHECK in the schema.
fn parse_role(raw: &str) -> Role {
    raw.parse().unwrap_or_else(|_| {
        tracing::warn!("Unknown role `{}` in store, treating as user", raw);
        Role::User
    })
}

impl User {
    pub fn role(&self) -> Role {
        parse_role(&self.role)
    }

    pub fn to_dto(&self) -> UserDto {
        UserDto {
            id: self.id,
            email: self.email.clone(),
            role: self.role(),
            created_at: Some(self.created_at),
        }
    }

    pub async fn create(pool: &DbPool, new_user: NewUser<'_>) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, password_hash, role, created_at
            "#,
        )
        .bind(new_user.email)
        .bind(new_user.password_hash)
        .bind(new_user.role.as_str())
        .bind(Utc::now())
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, role, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(pool: &DbPool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, role, created_at FROM users ORDER BY id",
        )
        .fetch_all(pool)
        .await
    }

    /// Every user with the number of tasks they own.
    pub async fn list_with_task_counts(pool: &DbPool) -> Result<Vec<UserSummaryDto>, sqlx::Error> {
        let records = sqlx::query_as::<_, UserSummaryRecord>(
            r#"
            SELECT u.id, u.email, u.role, u.created_at, COUNT(t.id) AS task_count
            FROM users u
            LEFT JOIN tasks t ON t.user_id = u.id
            GROUP BY u.id, u.email, u.role, u.created_at
            ORDER BY u.id
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(records
            .into_iter()
            .map(|r| UserSummaryDto {
                id: r.id,
                email: r.email,
                role: parse_role(&r.role),
                created_at: r.created_at,
                task_count: r.task_count,
            })
            .collect())
    }

    /// Deletes the account, returning it if it existed. Owned tasks are kept
    /// with their owner reference cleared.
    pub async fn delete(pool: &DbPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            DELETE FROM users WHERE id = $1
            RETURNING id, email, password_hash, role, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_roles_degrade_to_user() {
        assert_eq!(parse_role("admin"), Role::Admin);
        assert_eq!(parse_role("root"), Role::User);
    }
}
