//! Tracker authorization modules.
//!
//! # Purpose
//! Resolves the acting user from request headers and evaluates store-scoped
//! permissions against the caller's membership role.
pub mod actor;
pub mod rbac;
