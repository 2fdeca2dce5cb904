pub mod auth;
pub mod config;
pub mod error;
pub mod filter;
pub mod middleware;
pub mod models;
pub mod moderation;
pub mod naming;
pub mod openapi;
pub mod resolver;
pub mod routes;
pub mod settings;
pub mod store;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState, Publishing};
pub use middleware::RequireJson;
