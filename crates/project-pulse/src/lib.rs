pub mod auth;
pub mod config;
pub mod error;
pub mod health;
pub mod telemetry;
pub mod tracking;

pub use error::AppError;
