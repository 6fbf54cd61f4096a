//! Food-safety domain records.
//!
//! # Purpose
//! Defines stores, memberships, equipment, temperature readings, and the
//! artifacts a non-compliant reading produces (compliance record, corrective
//! action, notifications).
//!
//! # Notes
//! Category, role, and status values are closed enums. They travel over the wire
//! and into storage as SCREAMING_SNAKE_CASE strings.
use chrono::{DateTime, Utc};
use larder_common::ids::{
    ComplianceRecordId, CorrectiveActionId, EquipmentId, NotificationId, StoreId,
    TemperatureRecordId, UserId,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentCategory {
    ColdStorage,
    Freezer,
    HotHolding,
    Cooking,
    Delivery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Staff,
    Manager,
    Owner,
    FranchiseAdmin,
}

impl Role {
    /// Roles that receive compliance alerts for their store.
    pub const MANAGEMENT: [Role; 3] = [Role::Manager, Role::Owner, Role::FranchiseAdmin];

    pub fn is_management(self) -> bool {
        Self::MANAGEMENT.contains(&self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Store {
    #[schema(value_type = String)]
    pub id: StoreId,
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Membership {
    #[schema(value_type = String)]
    pub store_id: StoreId,
    #[schema(value_type = String)]
    pub user_id: UserId,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Equipment {
    #[schema(value_type = String)]
    pub id: EquipmentId,
    #[schema(value_type = String)]
    pub store_id: StoreId,
    pub name: String,
    pub category: EquipmentCategory,
    /// Lower acceptable bound in °C; `None` means unset.
    pub min_temp: Option<f64>,
    /// Upper acceptable bound in °C; `None` means unset.
    pub max_temp: Option<f64>,
    pub location: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Equipment {
    /// Equipment with neither bound configured.
    pub fn is_unmonitored(&self) -> bool {
        self.min_temp.is_none() && self.max_temp.is_none()
    }
}

/// A single human-entered reading. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TemperatureRecord {
    #[schema(value_type = String)]
    pub id: TemperatureRecordId,
    #[schema(value_type = String)]
    pub equipment_id: EquipmentId,
    #[schema(value_type = String)]
    pub store_id: StoreId,
    pub temperature: f64,
    pub recorded_at: DateTime<Utc>,
    #[schema(value_type = String)]
    pub recorded_by: UserId,
    pub notes: Option<String>,
    pub is_compliant: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordKind {
    Temperature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    NonCompliant,
    Compliant,
    Corrected,
}

impl RecordStatus {
    /// Only an open violation can be resolved, and only to a resolved state.
    pub fn can_transition_to(self, next: RecordStatus) -> bool {
        matches!(
            (self, next),
            (RecordStatus::NonCompliant, RecordStatus::Compliant)
                | (RecordStatus::NonCompliant, RecordStatus::Corrected)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RecordDetail {
    pub key: String,
    pub value: String,
}

impl RecordDetail {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ComplianceRecord {
    #[schema(value_type = String)]
    pub id: ComplianceRecordId,
    #[schema(value_type = String)]
    pub store_id: StoreId,
    pub kind: RecordKind,
    pub status: RecordStatus,
    pub notes: String,
    pub details: Vec<RecordDetail>,
    #[schema(value_type = String)]
    pub source_reading: TemperatureRecordId,
    #[schema(value_type = String)]
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    #[schema(value_type = Option<String>)]
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ComplianceRecord {
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|detail| detail.key == key)
            .map(|detail| detail.value.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionStatus {
    Pending,
    Completed,
    Overdue,
}

impl ActionStatus {
    pub fn can_transition_to(self, next: ActionStatus) -> bool {
        matches!(
            (self, next),
            (ActionStatus::Pending, ActionStatus::Completed)
                | (ActionStatus::Overdue, ActionStatus::Completed)
                | (ActionStatus::Pending, ActionStatus::Overdue)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CorrectiveAction {
    #[schema(value_type = String)]
    pub id: CorrectiveActionId,
    #[schema(value_type = String)]
    pub record_id: ComplianceRecordId,
    #[schema(value_type = String)]
    pub store_id: StoreId,
    #[schema(value_type = String)]
    pub assignee: UserId,
    pub description: String,
    pub due_at: DateTime<Utc>,
    pub status: ActionStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>)]
    pub completed_by: Option<UserId>,
}

impl CorrectiveAction {
    /// Status as seen at `now`: a pending action past its due date reads as overdue.
    /// The stored status is left untouched.
    pub fn effective_status(&self, now: DateTime<Utc>) -> ActionStatus {
        match self.status {
            ActionStatus::Pending if self.due_at < now => ActionStatus::Overdue,
            status => status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    TempAlert,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    #[schema(value_type = String)]
    pub id: NotificationId,
    #[schema(value_type = String)]
    pub user_id: UserId,
    #[schema(value_type = String)]
    pub store_id: StoreId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub action_url: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}
