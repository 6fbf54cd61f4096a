//! HTTP API request/response types.
//!
//! # Purpose
//! Payload shapes for the tracker REST API and OpenAPI schema generation.
//! Domain entities are returned as-is; only requests and list wrappers live here.
use larder_common::ids::UserId;
use larder_compliance::AuditEntry;
use larder_compliance::model::{
    ComplianceRecord, CorrectiveAction, Equipment, EquipmentCategory, Membership, Notification,
    RecordStatus, Role, Store, TemperatureRecord,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct FeatureFlags {
    pub durable_storage: bool,
    /// How readings for equipment without a configured range are handled.
    pub unmonitored_policy: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct SystemInfo {
    pub api_version: String,
    pub storage_backend: String,
    pub features: FeatureFlags,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct HealthStatus {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub request_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct StoreCreateRequest {
    pub name: String,
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MemberAddRequest {
    #[schema(value_type = String)]
    pub user_id: UserId,
    pub role: Role,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct EquipmentCreateRequest {
    pub name: String,
    pub category: EquipmentCategory,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub location: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct TemperatureRecordRequest {
    /// Degrees Celsius.
    pub temperature: f64,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ReviewRequest {
    /// `COMPLIANT` or `CORRECTED`.
    pub status: RecordStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct StoreListResponse {
    pub items: Vec<Store>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct MemberListResponse {
    pub items: Vec<Membership>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct EquipmentListResponse {
    pub items: Vec<Equipment>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct TemperatureListResponse {
    pub items: Vec<TemperatureRecord>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct ComplianceRecordListResponse {
    pub items: Vec<ComplianceRecord>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct CorrectiveActionListResponse {
    pub items: Vec<CorrectiveAction>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct NotificationListResponse {
    pub items: Vec<Notification>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct AuditListResponse {
    pub items: Vec<AuditEntry>,
}
