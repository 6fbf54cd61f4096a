//! Persistence ports consumed by the compliance evaluator.
//!
//! # Purpose
//! The evaluator never talks to a database directly. It reads equipment and
//! store membership and writes readings through these traits, which the service
//! implements for each storage backend (and tests implement with doubles).
//!
//! # Key invariants
//! - [`ComplianceStore::commit_reading`] is all-or-nothing: the reading and its
//!   cascade are persisted together or not at all.
//! - Cascade rows are written in dependency order: compliance record (with its
//!   details), corrective action, notifications.
use crate::audit::AuditEntry;
use crate::errors::StoreResult;
use crate::model::{
    ComplianceRecord, CorrectiveAction, Equipment, Notification, Role, TemperatureRecord,
};
use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, Utc};
use larder_common::ids::{EquipmentId, StoreId, UserId};

/// Equipment joined with the name of the store it belongs to.
#[derive(Debug, Clone)]
pub struct EquipmentLookup {
    pub equipment: Equipment,
    pub store_name: String,
}

/// Rows produced by a non-compliant reading.
#[derive(Debug, Clone)]
pub struct Cascade {
    pub record: ComplianceRecord,
    pub action: CorrectiveAction,
    pub notifications: Vec<Notification>,
}

/// One reading submission, ready to persist.
#[derive(Debug, Clone)]
pub struct ReadingWrite {
    pub reading: TemperatureRecord,
    pub cascade: Option<Cascade>,
}

/// Half-open UTC interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The UTC calendar day containing `day`.
    pub fn day(day: NaiveDate) -> Self {
        let start = day.and_time(chrono::NaiveTime::MIN).and_utc();
        let end = day
            .checked_add_days(Days::new(1))
            .map(|next| next.and_time(chrono::NaiveTime::MIN).and_utc())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadingCounts {
    pub total: u64,
    pub non_compliant: u64,
}

#[async_trait]
pub trait EquipmentReader: Send + Sync {
    async fn find_equipment(&self, id: EquipmentId) -> StoreResult<Option<EquipmentLookup>>;
}

#[async_trait]
pub trait MembershipReader: Send + Sync {
    /// Users holding any of `roles` at `store`, without duplicates.
    async fn users_with_role_in_store(
        &self,
        store: StoreId,
        roles: &[Role],
    ) -> StoreResult<Vec<UserId>>;
}

#[async_trait]
pub trait ComplianceStore: Send + Sync {
    async fn commit_reading(&self, write: ReadingWrite) -> StoreResult<()>;
    async fn append_audit(&self, entry: AuditEntry) -> StoreResult<()>;
    async fn count_readings(&self, store: StoreId, window: TimeWindow)
    -> StoreResult<ReadingCounts>;
    async fn count_active_equipment(&self, store: StoreId) -> StoreResult<u64>;
}
