//! Structured audit trail entries.
//!
//! # Purpose
//! Each audited action carries a typed payload instead of a free-form blob so the
//! trail can be checked by machines as well as read by people.
//!
//! # Key invariants
//! - `schema_version` is stamped at construction from [`AUDIT_SCHEMA_VERSION`].
//! - The action kind is derived from the payload, never stored independently.
use crate::classify::TemperatureRange;
use crate::model::{RecordStatus, Role};
use chrono::{DateTime, Utc};
use larder_common::ids::{
    AuditEntryId, ComplianceRecordId, CorrectiveActionId, EquipmentId, StoreId,
    TemperatureRecordId, UserId,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const AUDIT_SCHEMA_VERSION: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    TemperatureRecorded,
    EquipmentCreated,
    EquipmentDeactivated,
    ComplianceRecordReviewed,
    CorrectiveActionCompleted,
    MemberAdded,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::TemperatureRecorded => "TEMPERATURE_RECORDED",
            AuditAction::EquipmentCreated => "EQUIPMENT_CREATED",
            AuditAction::EquipmentDeactivated => "EQUIPMENT_DEACTIVATED",
            AuditAction::ComplianceRecordReviewed => "COMPLIANCE_RECORD_REVIEWED",
            AuditAction::CorrectiveActionCompleted => "CORRECTIVE_ACTION_COMPLETED",
            AuditAction::MemberAdded => "MEMBER_ADDED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEvent {
    TemperatureRecorded {
        #[schema(value_type = String)]
        reading_id: TemperatureRecordId,
        #[schema(value_type = String)]
        equipment_id: EquipmentId,
        equipment_name: String,
        temperature: f64,
        compliant: bool,
        /// False when the reading was accepted without evaluation.
        monitored: bool,
        range: Option<TemperatureRange>,
    },
    EquipmentCreated {
        #[schema(value_type = String)]
        equipment_id: EquipmentId,
        name: String,
    },
    EquipmentDeactivated {
        #[schema(value_type = String)]
        equipment_id: EquipmentId,
    },
    ComplianceRecordReviewed {
        #[schema(value_type = String)]
        record_id: ComplianceRecordId,
        from: RecordStatus,
        to: RecordStatus,
    },
    CorrectiveActionCompleted {
        #[schema(value_type = String)]
        action_id: CorrectiveActionId,
        #[schema(value_type = String)]
        record_id: ComplianceRecordId,
    },
    MemberAdded {
        #[schema(value_type = String)]
        user_id: UserId,
        role: Role,
    },
}

impl AuditEvent {
    pub fn action(&self) -> AuditAction {
        match self {
            AuditEvent::TemperatureRecorded { .. } => AuditAction::TemperatureRecorded,
            AuditEvent::EquipmentCreated { .. } => AuditAction::EquipmentCreated,
            AuditEvent::EquipmentDeactivated { .. } => AuditAction::EquipmentDeactivated,
            AuditEvent::ComplianceRecordReviewed { .. } => AuditAction::ComplianceRecordReviewed,
            AuditEvent::CorrectiveActionCompleted { .. } => AuditAction::CorrectiveActionCompleted,
            AuditEvent::MemberAdded { .. } => AuditAction::MemberAdded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditEntry {
    #[schema(value_type = String)]
    pub id: AuditEntryId,
    pub schema_version: u16,
    #[schema(value_type = String)]
    pub actor: UserId,
    #[schema(value_type = String)]
    pub store_id: StoreId,
    pub event: AuditEvent,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(actor: UserId, store_id: StoreId, event: AuditEvent, at: DateTime<Utc>) -> Self {
        Self {
            id: AuditEntryId::new(),
            schema_version: AUDIT_SCHEMA_VERSION,
            actor,
            store_id,
            event,
            recorded_at: at,
        }
    }

    pub fn action(&self) -> AuditAction {
        self.event.action()
    }
}
