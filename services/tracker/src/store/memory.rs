//! In-memory implementation of the tracker store.
//!
//! # Purpose
//! Keeps every table in process memory behind one `tokio::sync::RwLock`. Used for
//! local development, tests, and deployments that do not need durability.
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - A reading commit takes the write guard once and validates before it mutates
//!   anything, so the reading and its cascade become visible together or not at all.
//! - Foreign references (equipment, store, compliance record) are checked the
//!   same way the Postgres schema enforces them.
use super::{StoreError, StoreResult, TrackerStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use larder_common::ids::{
    ComplianceRecordId, CorrectiveActionId, EquipmentId, NotificationId, StoreId, UserId,
};
use larder_compliance::model::{
    ActionStatus, ComplianceRecord, CorrectiveAction, Equipment, Membership, Notification,
    RecordStatus, Role, Store, TemperatureRecord,
};
use larder_compliance::{
    AuditEntry, ComplianceStore, EquipmentLookup, EquipmentReader, MembershipReader,
    ReadingCounts, ReadingWrite, TimeWindow,
};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    stores: HashMap<StoreId, Store>,
    /// Keyed by `(store, user)`; a user holds one role per store.
    memberships: BTreeMap<(StoreId, UserId), Role>,
    equipment: HashMap<EquipmentId, Equipment>,
    /// Append order, which is also `recorded_at` order.
    readings: Vec<TemperatureRecord>,
    records: HashMap<ComplianceRecordId, ComplianceRecord>,
    actions: HashMap<CorrectiveActionId, CorrectiveAction>,
    notifications: HashMap<NotificationId, Notification>,
    audit: Vec<AuditEntry>,
}

impl Tables {
    fn publish_equipment_gauge(&self) {
        let active = self.equipment.values().filter(|item| item.active).count();
        metrics::gauge!("larder_equipment_active").set(active as f64);
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EquipmentReader for InMemoryStore {
    async fn find_equipment(&self, id: EquipmentId) -> StoreResult<Option<EquipmentLookup>> {
        let tables = self.tables.read().await;
        let Some(equipment) = tables.equipment.get(&id) else {
            return Ok(None);
        };
        let store = tables
            .stores
            .get(&equipment.store_id)
            .ok_or_else(|| StoreError::NotFound("store".into()))?;
        Ok(Some(EquipmentLookup {
            equipment: equipment.clone(),
            store_name: store.name.clone(),
        }))
    }
}

#[async_trait]
impl MembershipReader for InMemoryStore {
    async fn users_with_role_in_store(
        &self,
        store: StoreId,
        roles: &[Role],
    ) -> StoreResult<Vec<UserId>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .filter(|((store_id, _), role)| *store_id == store && roles.contains(role))
            .map(|((_, user_id), _)| *user_id)
            .collect())
    }
}

#[async_trait]
impl ComplianceStore for InMemoryStore {
    async fn commit_reading(&self, write: ReadingWrite) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        // Validate everything first; nothing below may fail once mutation starts.
        if !tables.equipment.contains_key(&write.reading.equipment_id) {
            return Err(StoreError::NotFound("equipment".into()));
        }
        if !tables.stores.contains_key(&write.reading.store_id) {
            return Err(StoreError::NotFound("store".into()));
        }
        if let Some(cascade) = &write.cascade {
            if cascade.record.source_reading != write.reading.id
                || cascade.action.record_id != cascade.record.id
            {
                return Err(StoreError::Unexpected(anyhow::anyhow!(
                    "cascade does not reference the committed reading"
                )));
            }
            if tables.records.contains_key(&cascade.record.id) {
                return Err(StoreError::Conflict("compliance record exists".into()));
            }
        }

        tables.readings.push(write.reading);
        if let Some(cascade) = write.cascade {
            tables.records.insert(cascade.record.id, cascade.record);
            tables.actions.insert(cascade.action.id, cascade.action);
            for notification in cascade.notifications {
                tables.notifications.insert(notification.id, notification);
            }
        }
        Ok(())
    }

    async fn append_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        self.tables.write().await.audit.push(entry);
        Ok(())
    }

    async fn count_readings(&self, store: StoreId, window: TimeWindow) -> StoreResult<ReadingCounts> {
        let tables = self.tables.read().await;
        let mut counts = ReadingCounts::default();
        for reading in tables
            .readings
            .iter()
            .filter(|reading| reading.store_id == store && window.contains(reading.recorded_at))
        {
            counts.total += 1;
            if !reading.is_compliant {
                counts.non_compliant += 1;
            }
        }
        Ok(counts)
    }

    async fn count_active_equipment(&self, store: StoreId) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .equipment
            .values()
            .filter(|item| item.store_id == store && item.active)
            .count() as u64)
    }
}

#[async_trait]
impl TrackerStore for InMemoryStore {
    async fn create_store(&self, store: Store, owner: Membership) -> StoreResult<Store> {
        let mut tables = self.tables.write().await;
        if tables.stores.contains_key(&store.id) {
            return Err(StoreError::Conflict("store exists".into()));
        }
        tables.stores.insert(store.id, store.clone());
        tables
            .memberships
            .insert((owner.store_id, owner.user_id), owner.role);
        Ok(store)
    }

    async fn get_store(&self, id: StoreId) -> StoreResult<Store> {
        self.tables
            .read()
            .await
            .stores
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("store".into()))
    }

    async fn list_stores_for_user(&self, user: UserId) -> StoreResult<Vec<Store>> {
        let tables = self.tables.read().await;
        let mut stores: Vec<Store> = tables
            .memberships
            .keys()
            .filter(|(_, user_id)| *user_id == user)
            .filter_map(|(store_id, _)| tables.stores.get(store_id).cloned())
            .collect();
        stores.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(stores)
    }

    async fn add_member(&self, membership: Membership) -> StoreResult<Membership> {
        let mut tables = self.tables.write().await;
        if !tables.stores.contains_key(&membership.store_id) {
            return Err(StoreError::NotFound("store".into()));
        }
        let key = (membership.store_id, membership.user_id);
        if tables.memberships.contains_key(&key) {
            return Err(StoreError::Conflict("membership exists".into()));
        }
        tables.memberships.insert(key, membership.role);
        Ok(membership)
    }

    async fn list_members(&self, store: StoreId) -> StoreResult<Vec<Membership>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .filter(|((store_id, _), _)| *store_id == store)
            .map(|((store_id, user_id), role)| Membership {
                store_id: *store_id,
                user_id: *user_id,
                role: *role,
            })
            .collect())
    }

    async fn member_role(&self, store: StoreId, user: UserId) -> StoreResult<Option<Role>> {
        Ok(self
            .tables
            .read()
            .await
            .memberships
            .get(&(store, user))
            .copied())
    }

    async fn create_equipment(&self, equipment: Equipment) -> StoreResult<Equipment> {
        let mut tables = self.tables.write().await;
        if !tables.stores.contains_key(&equipment.store_id) {
            return Err(StoreError::NotFound("store".into()));
        }
        if tables.equipment.contains_key(&equipment.id) {
            return Err(StoreError::Conflict("equipment exists".into()));
        }
        tables.equipment.insert(equipment.id, equipment.clone());
        tables.publish_equipment_gauge();
        Ok(equipment)
    }

    async fn list_equipment(&self, store: StoreId) -> StoreResult<Vec<Equipment>> {
        let tables = self.tables.read().await;
        let mut items: Vec<Equipment> = tables
            .equipment
            .values()
            .filter(|item| item.store_id == store)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn deactivate_equipment(&self, id: EquipmentId) -> StoreResult<Equipment> {
        let mut tables = self.tables.write().await;
        let equipment = tables
            .equipment
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("equipment".into()))?;
        equipment.active = false;
        let updated = equipment.clone();
        tables.publish_equipment_gauge();
        Ok(updated)
    }

    async fn list_readings(
        &self,
        store: StoreId,
        window: TimeWindow,
    ) -> StoreResult<Vec<TemperatureRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .readings
            .iter()
            .filter(|reading| reading.store_id == store && window.contains(reading.recorded_at))
            .cloned()
            .collect())
    }

    async fn list_compliance_records(&self, store: StoreId) -> StoreResult<Vec<ComplianceRecord>> {
        let tables = self.tables.read().await;
        let mut items: Vec<ComplianceRecord> = tables
            .records
            .values()
            .filter(|record| record.store_id == store)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(items)
    }

    async fn get_compliance_record(&self, id: ComplianceRecordId) -> StoreResult<ComplianceRecord> {
        self.tables
            .read()
            .await
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("compliance record".into()))
    }

    async fn review_compliance_record(
        &self,
        id: ComplianceRecordId,
        status: RecordStatus,
        reviewer: UserId,
        at: DateTime<Utc>,
    ) -> StoreResult<ComplianceRecord> {
        let mut tables = self.tables.write().await;
        let record = tables
            .records
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("compliance record".into()))?;
        if !record.status.can_transition_to(status) {
            return Err(StoreError::Conflict(format!(
                "compliance record is {:?}",
                record.status
            )));
        }
        record.status = status;
        record.reviewed_by = Some(reviewer);
        record.reviewed_at = Some(at);
        Ok(record.clone())
    }

    async fn list_corrective_actions(&self, store: StoreId) -> StoreResult<Vec<CorrectiveAction>> {
        let tables = self.tables.read().await;
        let mut items: Vec<CorrectiveAction> = tables
            .actions
            .values()
            .filter(|action| action.store_id == store)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.due_at.cmp(&b.due_at).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn get_corrective_action(&self, id: CorrectiveActionId) -> StoreResult<CorrectiveAction> {
        self.tables
            .read()
            .await
            .actions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound("corrective action".into()))
    }

    async fn complete_corrective_action(
        &self,
        id: CorrectiveActionId,
        by: UserId,
        at: DateTime<Utc>,
    ) -> StoreResult<CorrectiveAction> {
        let mut tables = self.tables.write().await;
        let action = tables
            .actions
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound("corrective action".into()))?;
        if !action.status.can_transition_to(ActionStatus::Completed) {
            return Err(StoreError::Conflict("corrective action already completed".into()));
        }
        action.status = ActionStatus::Completed;
        action.completed_at = Some(at);
        action.completed_by = Some(by);
        Ok(action.clone())
    }

    async fn list_notifications(
        &self,
        user: UserId,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        let tables = self.tables.read().await;
        let mut items: Vec<Notification> = tables
            .notifications
            .values()
            .filter(|item| item.user_id == user && (!unread_only || !item.read))
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(items)
    }

    async fn mark_notification_read(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> StoreResult<Notification> {
        let mut tables = self.tables.write().await;
        match tables.notifications.get_mut(&id) {
            Some(item) if item.user_id == user => {
                item.read = true;
                Ok(item.clone())
            }
            _ => Err(StoreError::NotFound("notification".into())),
        }
    }

    async fn list_audit(&self, store: StoreId, limit: usize) -> StoreResult<Vec<AuditEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .audit
            .iter()
            .rev()
            .filter(|entry| entry.store_id == store)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn is_durable(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, TimeZone};
    use larder_common::ids::TemperatureRecordId;
    use larder_compliance::model::{EquipmentCategory, NotificationKind, RecordDetail, RecordKind};
    use larder_compliance::{AuditEvent, Cascade};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 2, hour, 0, 0).unwrap()
    }

    async fn seeded() -> (InMemoryStore, Store, Equipment, UserId) {
        let store = InMemoryStore::new();
        let owner = UserId::new();
        let shop = Store {
            id: StoreId::new(),
            name: "Harbour St".to_string(),
            location: None,
        };
        store
            .create_store(
                shop.clone(),
                Membership {
                    store_id: shop.id,
                    user_id: owner,
                    role: Role::Owner,
                },
            )
            .await
            .expect("store");
        let fridge = Equipment {
            id: EquipmentId::new(),
            store_id: shop.id,
            name: "Walk-in Fridge".to_string(),
            category: EquipmentCategory::ColdStorage,
            min_temp: Some(0.0),
            max_temp: Some(5.0),
            location: None,
            active: true,
            created_at: at(8),
        };
        store.create_equipment(fridge.clone()).await.expect("equipment");
        (store, shop, fridge, owner)
    }

    fn reading(equipment: &Equipment, temperature: f64, when: DateTime<Utc>) -> TemperatureRecord {
        TemperatureRecord {
            id: TemperatureRecordId::new(),
            equipment_id: equipment.id,
            store_id: equipment.store_id,
            temperature,
            recorded_at: when,
            recorded_by: UserId::new(),
            notes: None,
            is_compliant: (0.0..=5.0).contains(&temperature),
        }
    }

    fn cascade_for(reading: &TemperatureRecord, recipients: &[UserId]) -> Cascade {
        let record = ComplianceRecord {
            id: ComplianceRecordId::new(),
            store_id: reading.store_id,
            kind: RecordKind::Temperature,
            status: RecordStatus::NonCompliant,
            notes: "out of range".to_string(),
            details: vec![RecordDetail::new("Equipment", "Walk-in Fridge")],
            source_reading: reading.id,
            created_by: reading.recorded_by,
            created_at: reading.recorded_at,
            reviewed_by: None,
            reviewed_at: None,
        };
        let action = CorrectiveAction {
            id: CorrectiveActionId::new(),
            record_id: record.id,
            store_id: reading.store_id,
            assignee: reading.recorded_by,
            description: "check seals".to_string(),
            due_at: reading.recorded_at + Duration::hours(24),
            status: ActionStatus::Pending,
            created_at: reading.recorded_at,
            completed_at: None,
            completed_by: None,
        };
        let notifications = recipients
            .iter()
            .map(|user| Notification {
                id: NotificationId::new(),
                user_id: *user,
                store_id: reading.store_id,
                kind: NotificationKind::TempAlert,
                title: "Temperature Alert – Harbour St".to_string(),
                message: "out of range".to_string(),
                action_url: "/temperature".to_string(),
                read: false,
                created_at: reading.recorded_at,
            })
            .collect();
        Cascade {
            record,
            action,
            notifications,
        }
    }

    #[tokio::test]
    async fn commit_persists_reading_and_cascade_together() {
        let (store, shop, fridge, owner) = seeded().await;
        let hot = reading(&fridge, 6.0, at(9));
        let cascade = cascade_for(&hot, &[owner]);
        let record_id = cascade.record.id;
        store
            .commit_reading(ReadingWrite {
                reading: hot,
                cascade: Some(cascade),
            })
            .await
            .expect("commit");

        assert_eq!(store.list_compliance_records(shop.id).await.unwrap().len(), 1);
        assert_eq!(store.list_corrective_actions(shop.id).await.unwrap().len(), 1);
        let inbox = store.list_notifications(owner, true).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(
            store.get_compliance_record(record_id).await.unwrap().status,
            RecordStatus::NonCompliant
        );
    }

    #[tokio::test]
    async fn rejected_commit_leaves_no_rows() {
        let (store, shop, fridge, owner) = seeded().await;
        let hot = reading(&fridge, 7.0, at(9));
        let mut cascade = cascade_for(&hot, &[owner]);
        cascade.action.record_id = ComplianceRecordId::new();
        let err = store
            .commit_reading(ReadingWrite {
                reading: hot,
                cascade: Some(cascade),
            })
            .await
            .expect_err("dangling action");
        assert!(matches!(err, StoreError::Unexpected(_)));

        let day = TimeWindow::day(NaiveDate::from_ymd_opt(2026, 5, 2).unwrap());
        assert!(store.list_readings(shop.id, day).await.unwrap().is_empty());
        assert!(store.list_compliance_records(shop.id).await.unwrap().is_empty());
        assert!(store.list_notifications(owner, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn counts_respect_the_day_window() {
        let (store, shop, fridge, _) = seeded().await;
        for (temperature, when) in [
            (3.0, at(1)),
            (6.0, at(10)),
            (4.0, at(23)),
            (9.0, at(23) + Duration::hours(2)),
        ] {
            store
                .commit_reading(ReadingWrite {
                    reading: reading(&fridge, temperature, when),
                    cascade: None,
                })
                .await
                .expect("commit");
        }
        let day = TimeWindow::day(NaiveDate::from_ymd_opt(2026, 5, 2).unwrap());
        let counts = store.count_readings(shop.id, day).await.unwrap();
        assert_eq!(
            counts,
            ReadingCounts {
                total: 3,
                non_compliant: 1
            }
        );
        assert_eq!(store.count_active_equipment(shop.id).await.unwrap(), 1);
        store.deactivate_equipment(fridge.id).await.unwrap();
        assert_eq!(store.count_active_equipment(shop.id).await.unwrap(), 0);
        assert_eq!(store.list_equipment(shop.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn membership_queries_filter_by_role() {
        let (store, shop, _, owner) = seeded().await;
        let staff = UserId::new();
        let manager = UserId::new();
        for (user, role) in [(staff, Role::Staff), (manager, Role::Manager)] {
            store
                .add_member(Membership {
                    store_id: shop.id,
                    user_id: user,
                    role,
                })
                .await
                .expect("member");
        }
        let err = store
            .add_member(Membership {
                store_id: shop.id,
                user_id: staff,
                role: Role::Manager,
            })
            .await
            .expect_err("duplicate");
        assert!(matches!(err, StoreError::Conflict(_)));

        let mut managers = store
            .users_with_role_in_store(shop.id, &Role::MANAGEMENT)
            .await
            .unwrap();
        managers.sort();
        let mut expected = vec![owner, manager];
        expected.sort();
        assert_eq!(managers, expected);
        assert_eq!(store.member_role(shop.id, staff).await.unwrap(), Some(Role::Staff));
        assert_eq!(store.member_role(StoreId::new(), staff).await.unwrap(), None);
        assert_eq!(store.list_stores_for_user(staff).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn review_and_completion_enforce_transitions() {
        let (store, _, fridge, owner) = seeded().await;
        let hot = reading(&fridge, 8.0, at(9));
        let cascade = cascade_for(&hot, &[]);
        let (record_id, action_id) = (cascade.record.id, cascade.action.id);
        store
            .commit_reading(ReadingWrite {
                reading: hot,
                cascade: Some(cascade),
            })
            .await
            .unwrap();

        let reviewed = store
            .review_compliance_record(record_id, RecordStatus::Corrected, owner, at(12))
            .await
            .expect("review");
        assert_eq!(reviewed.reviewed_by, Some(owner));
        let err = store
            .review_compliance_record(record_id, RecordStatus::Compliant, owner, at(13))
            .await
            .expect_err("already reviewed");
        assert!(matches!(err, StoreError::Conflict(_)));

        let done = store
            .complete_corrective_action(action_id, owner, at(12))
            .await
            .expect("complete");
        assert_eq!(done.status, ActionStatus::Completed);
        let err = store
            .complete_corrective_action(action_id, owner, at(13))
            .await
            .expect_err("twice");
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn notifications_are_private_to_recipient() {
        let (store, _, fridge, owner) = seeded().await;
        let hot = reading(&fridge, 8.0, at(9));
        let cascade = cascade_for(&hot, &[owner]);
        let id = cascade.notifications[0].id;
        store
            .commit_reading(ReadingWrite {
                reading: hot,
                cascade: Some(cascade),
            })
            .await
            .unwrap();

        let err = store
            .mark_notification_read(id, UserId::new())
            .await
            .expect_err("stranger");
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(store.mark_notification_read(id, owner).await.unwrap().read);
        assert!(store.list_notifications(owner, true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn same_instant_listings_have_a_stable_order() {
        let (store, shop, fridge, owner) = seeded().await;
        for temperature in [6.0, 7.0, 8.0, 9.0] {
            let hot = reading(&fridge, temperature, at(9));
            let cascade = cascade_for(&hot, &[owner]);
            store
                .commit_reading(ReadingWrite {
                    reading: hot,
                    cascade: Some(cascade),
                })
                .await
                .unwrap();
        }

        let inbox = store.list_notifications(owner, false).await.unwrap();
        let ids: Vec<NotificationId> = inbox.iter().map(|n| n.id).collect();
        let mut expected = ids.clone();
        expected.sort_by(|a, b| b.cmp(a));
        assert_eq!(ids, expected);
        for _ in 0..3 {
            let again: Vec<NotificationId> = store
                .list_notifications(owner, false)
                .await
                .unwrap()
                .iter()
                .map(|n| n.id)
                .collect();
            assert_eq!(again, ids);
        }

        let records: Vec<ComplianceRecordId> = store
            .list_compliance_records(shop.id)
            .await
            .unwrap()
            .iter()
            .map(|record| record.id)
            .collect();
        let mut expected = records.clone();
        expected.sort_by(|a, b| b.cmp(a));
        assert_eq!(records, expected);

        let actions: Vec<CorrectiveActionId> = store
            .list_corrective_actions(shop.id)
            .await
            .unwrap()
            .iter()
            .map(|action| action.id)
            .collect();
        let mut expected = actions.clone();
        expected.sort();
        assert_eq!(actions, expected);
    }

    #[tokio::test]
    async fn audit_lists_newest_first_with_limit() {
        let (store, shop, fridge, owner) = seeded().await;
        for hour in [9, 10, 11] {
            store
                .append_audit(AuditEntry::new(
                    owner,
                    shop.id,
                    AuditEvent::EquipmentDeactivated {
                        equipment_id: fridge.id,
                    },
                    at(hour),
                ))
                .await
                .unwrap();
        }
        let entries = store.list_audit(shop.id, 2).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].recorded_at, at(11));
        assert!(store.list_audit(StoreId::new(), 10).await.unwrap().is_empty());
    }
}
