//! Core abstractions for steward-rs
//!
//! This crate defines the `Agent` trait and the error type shared by the
//! tool and runtime crates.

pub mod agent;
pub mod error;

pub use agent::Agent;
pub use error::{Error, Result};
