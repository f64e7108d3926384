//! # duplex-core
//!
//! Foundation types shared by every duplex crate:
//!
//! - [`errors`]: [`ConnectionError`] surfaced to connection users and
//!   [`TransportError`] raised by socket implementations
//! - [`constants`]: default queue capacities and listen address
//! - [`logging`]: `tracing` subscriber setup and test capture utilities

#![deny(unsafe_code)]

pub mod constants;
pub mod errors;
pub mod logging;

pub use errors::{ConnectionError, TransportError};
