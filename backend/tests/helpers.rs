// backend/tests/helpers.rs
#![allow(dead_code)]

use backend::{
    config::{AppConfig, DatabaseConfig, ExpiresIn, JwtConfig, WebConfig},
    db::{self, DbPool},
    web_server::{create_router, AppState},
};
use common::{AuthResponse, Credentials, RegisterRequest, Role};
use reqwest::StatusCode;
use serde_json::Value;
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;

pub const TEST_JWT_SECRET: &str = "test-secret";
pub const TEST_PASSWORD: &str = "password123";

/// Test config: in-memory store, fixed secret, cheapest bcrypt cost.
pub fn test_config(port: u16) -> AppConfig {
    AppConfig {
        web: WebConfig {
            addr: "127.0.0.1".to_string(),
            port,
            cors_origin: "http://localhost:5173".to_string(),
        },
        // A single connection keeps every query on the same in-memory database.
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            expires_in: ExpiresIn::default(),
        },
        bcrypt_cost: 4,
    }
}

/// Migrated in-memory pool plus the state wrapping it.
pub async fn test_state() -> AppState {
    let app_config = test_config(0);
    let db_pool = db::connect(&app_config.database)
        .await
        .expect("Failed to create in-memory database pool.");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run migrations on test database.");

    AppState {
        db_pool,
        app_config,
    }
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub db_pool: DbPool,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Registers `email` with `role` and returns the token from the response.
    pub async fn register(&self, email: &str, role: Role) -> AuthResponse {
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(&RegisterRequest {
                email: email.to_string(),
                password: TEST_PASSWORD.to_string(),
                role: Some(role),
            })
            .send()
            .await
            .expect("Failed to register user");

        assert_eq!(response.status(), StatusCode::CREATED, "Registration failed");
        response.json().await.expect("Failed to parse register response")
    }

    pub async fn token_for(&self, email: &str, role: Role) -> String {
        self.register(email, role).await.token
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&Credentials {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .expect("Failed to execute login request")
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute GET request")
    }

    pub async fn delete(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute DELETE request")
    }

    /// Creates a task and returns the `task` object from the response.
    pub async fn create_task(&self, token: &str, body: Value) -> Value {
        let response = self
            .client
            .post(self.url("/api/tasks"))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to create task");

        assert_eq!(response.status(), StatusCode::CREATED, "Task creation failed");
        let body: Value = response.json().await.expect("Failed to parse task response");
        body["task"].clone()
    }
}

/// Spawn the app on an ephemeral port against a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let app_state = test_state().await;
    let db_pool = app_state.db_pool.clone();
    let app = create_router(app_state);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        client,
        db_pool,
    }
}
