//! Shared configuration and error types for Trellis.
//!
//! This crate carries everything that both the pure settlement logic and the
//! database layer need to agree on: the application configuration (business
//! rule knobs included) and the application-wide error type. It has no
//! database or web dependencies.

pub mod config;
pub mod error;

pub use config::{AppConfig, DatabaseConfig, SettlementConfig};
pub use error::{AppError, AppResult};
