//! OpenAPI schema aggregation for the tracker API.
use crate::api::{
    actions, audit, equipment, notifications, records, stores, system, temperatures,
    types::{
        AuditListResponse, ComplianceRecordListResponse, CorrectiveActionListResponse,
        EquipmentCreateRequest, EquipmentListResponse, ErrorResponse, FeatureFlags, HealthStatus,
        MemberAddRequest, MemberListResponse, NotificationListResponse, ReviewRequest,
        StoreCreateRequest, StoreListResponse, SystemInfo, TemperatureListResponse,
        TemperatureRecordRequest,
    },
};
use larder_compliance::model::{
    ActionStatus, ComplianceRecord, CorrectiveAction, Equipment, EquipmentCategory, Membership,
    Notification, NotificationKind, RecordDetail, RecordKind, RecordStatus, Role, Store,
    TemperatureRecord,
};
use larder_compliance::{AuditAction, AuditEntry, AuditEvent, TemperatureRange, TemperatureStats};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "larder-tracker",
        version = "v1",
        description = "Food-safety temperature compliance tracker"
    ),
    paths(
        system::system_info,
        system::system_health,
        stores::create_store,
        stores::list_stores,
        stores::add_member,
        stores::list_members,
        equipment::create_equipment,
        equipment::list_equipment,
        equipment::deactivate_equipment,
        temperatures::record_temperature,
        temperatures::list_temperatures,
        temperatures::temperature_stats,
        records::list_compliance_records,
        records::review_compliance_record,
        actions::list_corrective_actions,
        actions::complete_corrective_action,
        notifications::list_notifications,
        notifications::mark_notification_read,
        audit::list_audit
    ),
    components(schemas(
        FeatureFlags,
        SystemInfo,
        HealthStatus,
        ErrorResponse,
        Store,
        StoreCreateRequest,
        StoreListResponse,
        Role,
        Membership,
        MemberAddRequest,
        MemberListResponse,
        EquipmentCategory,
        Equipment,
        EquipmentCreateRequest,
        EquipmentListResponse,
        TemperatureRecord,
        TemperatureRecordRequest,
        TemperatureListResponse,
        TemperatureRange,
        TemperatureStats,
        RecordKind,
        RecordStatus,
        RecordDetail,
        ComplianceRecord,
        ComplianceRecordListResponse,
        ReviewRequest,
        ActionStatus,
        CorrectiveAction,
        CorrectiveActionListResponse,
        NotificationKind,
        Notification,
        NotificationListResponse,
        AuditAction,
        AuditEvent,
        AuditEntry,
        AuditListResponse
    )),
    tags(
        (name = "system", description = "System and discovery endpoints"),
        (name = "stores", description = "Stores and memberships"),
        (name = "equipment", description = "Monitored equipment"),
        (name = "temperatures", description = "Temperature readings and statistics"),
        (name = "compliance", description = "Compliance records and corrective actions"),
        (name = "notifications", description = "Per-user alert inbox"),
        (name = "audit", description = "Store audit trail")
    )
)]
pub struct ApiDoc;
