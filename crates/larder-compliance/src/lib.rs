//! Food-safety compliance core shared by the tracker service.
//!
//! # Purpose
//! Classifies temperature readings against equipment thresholds and drives the
//! follow-up a non-compliant reading requires: a compliance record, a corrective
//! action for the person who took the reading, and an alert for every manager,
//! owner, and franchise admin of the store.
//!
//! # How it fits
//! The tracker service implements the persistence ports in [`ports`] for its
//! storage backends and calls [`ComplianceEvaluator`] from its HTTP handlers.
//!
//! # Examples
//! ```rust
//! use larder_compliance::{TemperatureRange, compliance_rate};
//!
//! let fridge = TemperatureRange { min: 0.0, max: 5.0 };
//! assert!(fridge.contains(5.0));
//! assert!(!fridge.contains(6.0));
//! assert_eq!(compliance_rate(10, 3), 70);
//! ```
pub mod audit;
pub mod classify;
mod errors;
pub mod evaluator;
pub mod model;
pub mod ports;

pub use audit::{AUDIT_SCHEMA_VERSION, AuditAction, AuditEntry, AuditEvent};
pub use classify::{
    Classification, DEFAULT_MAX_TEMP, DEFAULT_MIN_TEMP, TemperatureRange, UnmonitoredPolicy,
    classify, format_degrees,
};
pub use errors::{ComplianceError, ComplianceResult, StoreError, StoreResult};
pub use evaluator::{
    Clock, ComplianceEvaluator, EvaluatorPolicy, RecordTemperature, SystemClock,
    TemperatureStats, compliance_rate,
};
pub use ports::{
    Cascade, ComplianceStore, EquipmentLookup, EquipmentReader, MembershipReader, ReadingCounts,
    ReadingWrite, TimeWindow,
};
