//! Core infrastructure shared by the callguard pattern crates.
//!
//! This crate holds the two pieces every other callguard crate agrees on:
//!
//! - [`ProviderError`]: the closed taxonomy of failures an outbound AI
//!   backend call can produce, with [`ErrorKind`] as its field-less mirror
//!   for building classification sets.
//! - [`events`]: a small listener system the admission and retry crates use
//!   to expose what they are doing without coupling callers to a specific
//!   logging or metrics stack.
//!
//! Nothing in this crate performs I/O or spawns tasks.

pub mod error;
pub mod events;

pub use error::{ErrorKind, ProviderError};
