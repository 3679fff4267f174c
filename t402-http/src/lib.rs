//! HTTP transport layer for the t402 payment protocol.
//!
//! Every t402 message that crosses HTTP travels as base64-encoded JSON in a
//! header. This crate owns those header names, the codec, and (behind the
//! `client` feature) a [`FacilitatorClient`](t402::server::FacilitatorClient)
//! that talks to a remote facilitator service.
//!
//! # Modules
//!
//! - [`constants`] - Header names, status code, default facilitator URL
//! - [`headers`] - Base64 header codec and version detection
//! - [`error`] - Codec error type
//! - [`facilitator`] - HTTP facilitator client (feature: `client`)

pub mod constants;
pub mod error;
pub mod headers;

#[cfg(feature = "client")]
pub mod facilitator;

pub use error::HttpError;
#[cfg(feature = "client")]
pub use facilitator::{FacilitatorClientError, HttpFacilitatorClient, HttpFacilitatorConfig};
