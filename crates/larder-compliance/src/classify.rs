//! Temperature compliance classification.
//!
//! # Purpose
//! Resolves the acceptable band for a piece of equipment and decides whether a
//! reading falls inside it. Both bounds are inclusive.
//!
//! # Key invariants
//! - A missing lower bound reads as [`DEFAULT_MIN_TEMP`], a missing upper bound
//!   as [`DEFAULT_MAX_TEMP`]; each is defaulted independently.
//! - Equipment with neither bound is unmonitored and handled by [`UnmonitoredPolicy`].
use crate::errors::{ComplianceError, ComplianceResult};
use crate::model::Equipment;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

pub const DEFAULT_MIN_TEMP: f64 = 0.0;
pub const DEFAULT_MAX_TEMP: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
}

impl TemperatureRange {
    pub fn from_bounds(min: Option<f64>, max: Option<f64>) -> Self {
        Self {
            min: min.unwrap_or(DEFAULT_MIN_TEMP),
            max: max.unwrap_or(DEFAULT_MAX_TEMP),
        }
    }

    pub fn contains(&self, temperature: f64) -> bool {
        temperature >= self.min && temperature <= self.max
    }

    /// `"{min}°C – {max}°C"`, the form used in record details and alert text.
    pub fn display(&self) -> String {
        format!("{}°C – {}°C", format_degrees(self.min), format_degrees(self.max))
    }
}

/// What to do with a reading for equipment that has no configured range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmonitoredPolicy {
    /// Evaluate against the wide default band `[0, 100]`.
    #[default]
    DefaultBand,
    /// Accept the reading as compliant without evaluating it.
    Skip,
    /// Refuse the reading.
    Reject,
}

impl FromStr for UnmonitoredPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default_band" | "default-band" => Ok(UnmonitoredPolicy::DefaultBand),
            "skip" => Ok(UnmonitoredPolicy::Skip),
            "reject" => Ok(UnmonitoredPolicy::Reject),
            other => Err(format!("unknown unmonitored policy {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    Compliant(TemperatureRange),
    NonCompliant(TemperatureRange),
    /// No range configured and the policy skips evaluation.
    Unmonitored,
}

impl Classification {
    pub fn is_compliant(&self) -> bool {
        !matches!(self, Classification::NonCompliant(_))
    }

    pub fn range(&self) -> Option<TemperatureRange> {
        match self {
            Classification::Compliant(range) | Classification::NonCompliant(range) => Some(*range),
            Classification::Unmonitored => None,
        }
    }
}

pub fn classify(
    equipment: &Equipment,
    temperature: f64,
    policy: UnmonitoredPolicy,
) -> ComplianceResult<Classification> {
    if equipment.is_unmonitored() {
        match policy {
            UnmonitoredPolicy::DefaultBand => {}
            UnmonitoredPolicy::Skip => return Ok(Classification::Unmonitored),
            UnmonitoredPolicy::Reject => {
                return Err(ComplianceError::Validation(format!(
                    "equipment {} has no configured temperature range",
                    equipment.name
                )));
            }
        }
    }
    let range = TemperatureRange::from_bounds(equipment.min_temp, equipment.max_temp);
    if range.contains(temperature) {
        Ok(Classification::Compliant(range))
    } else {
        Ok(Classification::NonCompliant(range))
    }
}

/// Shortest decimal form of a temperature: `6.0` prints as `6`, `-0.0` as `0`.
pub fn format_degrees(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{value}")
}
