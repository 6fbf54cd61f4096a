//! Storage backends for the tracker service.
//!
//! Every backend implements the compliance ports from `larder-compliance`
//! (equipment lookup, membership lookup, the transactional reading commit) plus
//! the CRUD surface the HTTP API needs around them.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use larder_common::ids::{
    ComplianceRecordId, CorrectiveActionId, EquipmentId, NotificationId, StoreId, UserId,
};
use larder_compliance::model::{
    ComplianceRecord, CorrectiveAction, Equipment, Membership, Notification, RecordStatus, Role,
    Store, TemperatureRecord,
};
use larder_compliance::{AuditEntry, ComplianceStore, EquipmentReader, MembershipReader, TimeWindow};

pub mod memory;
pub mod postgres;

pub use larder_compliance::{StoreError, StoreResult};

/// Upper bound on audit entries returned by one listing.
pub const AUDIT_PAGE_LIMIT: usize = 500;

#[async_trait]
pub trait TrackerStore: EquipmentReader + MembershipReader + ComplianceStore + Send + Sync {
    /// Create a store and its first membership in one step.
    async fn create_store(&self, store: Store, owner: Membership) -> StoreResult<Store>;
    async fn get_store(&self, id: StoreId) -> StoreResult<Store>;
    async fn list_stores_for_user(&self, user: UserId) -> StoreResult<Vec<Store>>;

    /// Fails with `Conflict` when the user already belongs to the store.
    async fn add_member(&self, membership: Membership) -> StoreResult<Membership>;
    async fn list_members(&self, store: StoreId) -> StoreResult<Vec<Membership>>;
    async fn member_role(&self, store: StoreId, user: UserId) -> StoreResult<Option<Role>>;

    async fn create_equipment(&self, equipment: Equipment) -> StoreResult<Equipment>;
    async fn list_equipment(&self, store: StoreId) -> StoreResult<Vec<Equipment>>;
    /// Soft delete: the row stays, `active` becomes false.
    async fn deactivate_equipment(&self, id: EquipmentId) -> StoreResult<Equipment>;

    async fn list_readings(
        &self,
        store: StoreId,
        window: TimeWindow,
    ) -> StoreResult<Vec<TemperatureRecord>>;

    async fn list_compliance_records(&self, store: StoreId) -> StoreResult<Vec<ComplianceRecord>>;
    async fn get_compliance_record(&self, id: ComplianceRecordId) -> StoreResult<ComplianceRecord>;
    /// Moves an open record to `status`. Fails with `Conflict` when the stored
    /// status does not allow the transition.
    async fn review_compliance_record(
        &self,
        id: ComplianceRecordId,
        status: RecordStatus,
        reviewer: UserId,
        at: DateTime<Utc>,
    ) -> StoreResult<ComplianceRecord>;

    async fn list_corrective_actions(&self, store: StoreId) -> StoreResult<Vec<CorrectiveAction>>;
    async fn get_corrective_action(&self, id: CorrectiveActionId) -> StoreResult<CorrectiveAction>;
    /// Fails with `Conflict` when the action is already completed.
    async fn complete_corrective_action(
        &self,
        id: CorrectiveActionId,
        by: UserId,
        at: DateTime<Utc>,
    ) -> StoreResult<CorrectiveAction>;

    async fn list_notifications(
        &self,
        user: UserId,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>>;
    /// Only the recipient can mark a notification; any other user sees `NotFound`.
    async fn mark_notification_read(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> StoreResult<Notification>;

    /// Newest first, at most `limit` entries.
    async fn list_audit(&self, store: StoreId, limit: usize) -> StoreResult<Vec<AuditEntry>>;

    async fn health_check(&self) -> StoreResult<()>;
    fn is_durable(&self) -> bool;
    fn backend_name(&self) -> &'static str;
}
