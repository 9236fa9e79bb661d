#[cfg(not(any(feature = "db-sqlite", feature = "db-postgres")))]
compile_error!("Either the `db-sqlite` or `db-postgres` feature must be enabled.");

#[cfg(all(feature = "db-sqlite", feature = "db-postgres"))]
compile_error!("Only one of `db-sqlite` or `db-postgres` can be enabled.");

#[cfg(feature = "db-postgres")]
pub use sqlx::postgres::{PgPool as DbPool, PgPoolOptions as DbPoolOptions};

#[cfg(feature = "db-sqlite")]
pub use sqlx::sqlite::{SqlitePool as DbPool, SqlitePoolOptions as DbPoolOptions};

use crate::config::DatabaseConfig;

/// Opens the connection pool. SQLite files are created on first use and
/// foreign keys are enforced so deleting a user detaches their tasks.
#[cfg(feature = "db-sqlite")]
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    use sqlx::sqlite::SqliteConnectOptions;
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true);

    DbPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
}

#[cfg(feature = "db-postgres")]
pub async fn connect(config: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    DbPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    #[cfg(feature = "db-sqlite")]
    let migrator = sqlx::migrate!("./migrations/sqlite");
    #[cfg(feature = "db-postgres")]
    let migrator = sqlx::migrate!("./migrations/postgres");

    migrator.run(pool).await
}
