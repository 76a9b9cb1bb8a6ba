//! Mock provider implementations for testing.
//!
//! This module provides a simple, in-memory implementation of all provider
//! traits for use in unit and integration tests.

pub mod store;

pub use store::MockAccessStore;
