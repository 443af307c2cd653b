//! Core types and trait definitions for GAC (Gestor Automatizado de Códigos).
//!
//! This crate holds the code-consultation logic: given an email, an access
//! code and a platform, decide whether the requester may see the latest
//! inbound email for that exact mailbox, and find it. It is free of HTTP and
//! database dependencies; storage backends implement the traits in [`store`].

pub mod access;
pub mod code;
pub mod consult;
pub mod error;
pub mod platform;
pub mod session;
pub mod store;
pub mod time_ago;

pub use error::{Error, Result};

/// Canonical form of an email address for lookups and comparisons.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }
