pub mod auth;
pub mod config;
pub mod response;
pub mod server;

pub use auth::{AdminToken, RequirePrivileged};
pub use config::AppConfig;
pub use response::ApiResponse;
pub use server::{configure, run};
