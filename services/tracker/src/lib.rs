//! Food-safety tracker service library crate.
//!
//! # Purpose
//! Exposes the tracker HTTP API, role checks, configuration, observability, and
//! storage backends for use by the binary and tests.
//!
//! # Notes
//! The compliance workflow itself lives in `larder-compliance`; this crate wires
//! it to HTTP and to the storage backends.
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod observability;
pub mod store;
