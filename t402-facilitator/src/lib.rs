//! t402 facilitator service.
//!
//! Verifies and settles payments for resource servers over HTTP. Chains are
//! configured in a JSON file (see [`config::FacilitatorConfig`]) and each one
//! is served by the `exact` scheme of its family.

pub mod config;
pub mod error;
pub mod handlers;
pub mod schemes;
pub mod shutdown;
pub mod telemetry;
