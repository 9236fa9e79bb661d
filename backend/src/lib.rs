// --- File: backend/src/lib.rs ---

// Library half of the backend; `main.rs` and the integration tests both
// build the router from here.
pub mod admin;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod models;
pub mod password;
pub mod tasks;
pub mod token;
pub mod web_server;
