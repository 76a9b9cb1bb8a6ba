//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by audience.

pub mod guest;
pub mod health;
pub mod host;
pub mod scanner;

use crate::error::AppError;
use serde::de::DeserializeOwned;

// Re-export common handler utilities
pub use health::health_check;

/// Parse a JSON body read as bytes.
///
/// Handlers take raw bytes so rate limiting runs before body validation.
fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::bad_request(format!("Invalid request body: {e}")))
}
