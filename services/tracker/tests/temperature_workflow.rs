mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::{DateTime, Duration, Utc};
use common::{App, TestClock, app_with, memory_app, send};
use http_helpers::{get_as, json_request_as};
use larder_common::ids::{
    ComplianceRecordId, CorrectiveActionId, EquipmentId, NotificationId, StoreId, UserId,
};
use larder_compliance::model::{
    ComplianceRecord, CorrectiveAction, Equipment, Membership, Notification, RecordStatus, Role,
    Store, TemperatureRecord,
};
use larder_compliance::{
    AuditEntry, ComplianceStore, EquipmentLookup, EquipmentReader, EvaluatorPolicy,
    MembershipReader, ReadingCounts, ReadingWrite, TimeWindow, UnmonitoredPolicy,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracker::store::memory::InMemoryStore;
use tracker::store::{StoreError, StoreResult, TrackerStore};

struct Kitchen {
    store_id: String,
    owner: UserId,
    manager: UserId,
    staff: UserId,
    fridge_id: String,
}

/// Store "Harbour Street": the owner and a manager receive alerts, a staff
/// member records readings, and a walk-in fridge is ranged [0, 5].
async fn kitchen(app: &App) -> Kitchen {
    let owner = UserId::new();
    let manager = UserId::new();
    let staff = UserId::new();
    let (status, store) = send(
        app,
        json_request_as("POST", "/v1/stores", owner, json!({ "name": "Harbour Street" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let store_id = store["id"].as_str().unwrap().to_string();
    for (user, role) in [(manager, "MANAGER"), (staff, "STAFF")] {
        let (status, _) = send(
            app,
            json_request_as(
                "POST",
                &format!("/v1/stores/{store_id}/members"),
                owner,
                json!({ "user_id": user, "role": role }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, fridge) = send(
        app,
        json_request_as(
            "POST",
            &format!("/v1/stores/{store_id}/equipment"),
            owner,
            json!({
                "name": "Walk-in Fridge",
                "category": "COLD_STORAGE",
                "min_temp": 0.0,
                "max_temp": 5.0,
                "location": "Back kitchen"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    Kitchen {
        store_id,
        owner,
        manager,
        staff,
        fridge_id: fridge["id"].as_str().unwrap().to_string(),
    }
}

async fn record(app: &App, equipment_id: &str, user: UserId, body: Value) -> (StatusCode, Value) {
    send(
        app,
        json_request_as(
            "POST",
            &format!("/v1/equipment/{equipment_id}/temperatures"),
            user,
            body,
        ),
    )
    .await
}

fn items(body: &Value) -> &Vec<Value> {
    body["items"].as_array().expect("items")
}

#[tokio::test]
async fn out_of_range_reading_opens_record_action_and_alerts() {
    let clock = TestClock::new();
    let (app, _) = memory_app(clock.clone()).await;
    let k = kitchen(&app).await;

    let (status, reading) = record(
        &app,
        &k.fridge_id,
        k.staff,
        json!({ "temperature": 6.0, "notes": "door left open" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reading["is_compliant"], false);
    assert_eq!(reading["recorded_by"], k.staff.to_string());
    assert_eq!(reading["notes"], "door left open");

    let (status, records) = send(
        &app,
        get_as(&format!("/v1/stores/{}/compliance-records", k.store_id), k.staff),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(items(&records).len(), 1);
    let record = &items(&records)[0];
    assert_eq!(record["status"], "NON_COMPLIANT");
    assert_eq!(record["kind"], "TEMPERATURE");
    let temperature_detail = record["details"]
        .as_array()
        .unwrap()
        .iter()
        .find(|detail| detail["key"] == "Temperature")
        .expect("temperature detail");
    assert_eq!(temperature_detail["value"], "6°C");

    let (_, actions) = send(
        &app,
        get_as(&format!("/v1/stores/{}/corrective-actions", k.store_id), k.staff),
    )
    .await;
    assert_eq!(items(&actions).len(), 1);
    let action = &items(&actions)[0];
    assert_eq!(action["assignee"], k.staff.to_string());
    assert_eq!(action["status"], "PENDING");
    assert_eq!(action["record_id"], record["id"]);
    let created: DateTime<Utc> = serde_json::from_value(action["created_at"].clone()).unwrap();
    let due: DateTime<Utc> = serde_json::from_value(action["due_at"].clone()).unwrap();
    assert_eq!(due - created, Duration::hours(24));

    for user in [k.owner, k.manager] {
        let (_, inbox) = send(&app, get_as("/v1/notifications", user)).await;
        assert_eq!(items(&inbox).len(), 1);
        let alert = &items(&inbox)[0];
        assert_eq!(alert["kind"], "TEMP_ALERT");
        assert!(alert["title"].as_str().unwrap().contains("Harbour Street"));
        assert_eq!(alert["action_url"], "/temperature");
        assert_eq!(alert["read"], false);
    }
    let (_, inbox) = send(&app, get_as("/v1/notifications", k.staff)).await;
    assert!(items(&inbox).is_empty());
}

#[tokio::test]
async fn in_range_reading_creates_nothing_else() {
    let (app, _) = memory_app(TestClock::new()).await;
    let k = kitchen(&app).await;

    let (status, reading) = record(&app, &k.fridge_id, k.staff, json!({ "temperature": 3.0 })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reading["is_compliant"], true);

    let (_, records) = send(
        &app,
        get_as(&format!("/v1/stores/{}/compliance-records", k.store_id), k.owner),
    )
    .await;
    assert!(items(&records).is_empty());
    let (_, actions) = send(
        &app,
        get_as(&format!("/v1/stores/{}/corrective-actions", k.store_id), k.owner),
    )
    .await;
    assert!(items(&actions).is_empty());
    let (_, inbox) = send(&app, get_as("/v1/notifications", k.manager)).await;
    assert!(items(&inbox).is_empty());

    let (_, readings) = send(
        &app,
        get_as(&format!("/v1/stores/{}/temperatures?day=2026-03-14", k.store_id), k.staff),
    )
    .await;
    assert_eq!(items(&readings).len(), 1);
}

#[tokio::test]
async fn boundaries_are_compliant() {
    let (app, _) = memory_app(TestClock::new()).await;
    let k = kitchen(&app).await;
    for temperature in [0.0, 5.0] {
        let (_, reading) = record(&app, &k.fridge_id, k.staff, json!({ "temperature": temperature })).await;
        assert_eq!(reading["is_compliant"], true, "{temperature}");
    }
    let (_, reading) = record(&app, &k.fridge_id, k.staff, json!({ "temperature": -0.5 })).await;
    assert_eq!(reading["is_compliant"], false);
}

#[tokio::test]
async fn stats_follow_the_requested_day() {
    let clock = TestClock::new();
    let (app, _) = memory_app(clock.clone()).await;
    let k = kitchen(&app).await;
    let stats_uri = format!("/v1/stores/{}/temperature-stats", k.store_id);

    let (status, empty) = send(&app, get_as(&stats_uri, k.staff)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(empty["total_records"], 0);
    assert_eq!(empty["compliance_rate"], 100);
    assert_eq!(empty["equipment_count"], 1);

    for temperature in [2.0, 3.0, 4.0, 1.0, 0.5, 2.5, 3.5, 9.0, 11.0, -4.0] {
        record(&app, &k.fridge_id, k.staff, json!({ "temperature": temperature })).await;
    }
    let (_, stats) = send(&app, get_as(&stats_uri, k.staff)).await;
    assert_eq!(stats["total_records"], 10);
    assert_eq!(stats["non_compliant_records"], 3);
    assert_eq!(stats["compliance_rate"], 70);

    let (_, yesterday) = send(&app, get_as(&format!("{stats_uri}?day=2026-03-13"), k.staff)).await;
    assert_eq!(yesterday["total_records"], 0);

    clock.advance(Duration::days(1));
    let (_, today) = send(&app, get_as(&stats_uri, k.staff)).await;
    assert_eq!(today["total_records"], 0);
    let (_, explicit) = send(&app, get_as(&format!("{stats_uri}?day=2026-03-14"), k.staff)).await;
    assert_eq!(explicit["total_records"], 10);

    let (status, body) = send(&app, get_as(&format!("{stats_uri}?day=yesterday"), k.staff)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn malformed_readings_are_rejected_before_any_write() {
    let (app, store) = memory_app(TestClock::new()).await;
    let k = kitchen(&app).await;

    let (status, body) = record(&app, &k.fridge_id, k.staff, json!({ "temperature": "cold" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    let (status, _) = record(&app, &k.fridge_id, k.staff, json!({ "notes": "forgot" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = record(
        &app,
        &EquipmentId::new().to_string(),
        k.staff,
        json!({ "temperature": 4.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "equipment not found");

    let store_id: StoreId = k.store_id.parse().unwrap();
    let counts = store
        .count_readings(store_id, TimeWindow::day(chrono::NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()))
        .await
        .unwrap();
    assert_eq!(counts, ReadingCounts::default());
}

#[tokio::test]
async fn outsiders_cannot_tell_foreign_ids_from_missing_ones() {
    let (app, _) = memory_app(TestClock::new()).await;
    let k = kitchen(&app).await;
    let outsider = UserId::new();

    let (status, foreign) = record(&app, &k.fridge_id, outsider, json!({ "temperature": 4.0 })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, missing) = record(
        &app,
        &EquipmentId::new().to_string(),
        outsider,
        json!({ "temperature": 4.0 }),
    )
    .await;
    assert_eq!(foreign, missing);

    let (status, body) = send(
        &app,
        json_request_as(
            "POST",
            &format!("/v1/equipment/{}/deactivate", k.fridge_id),
            outsider,
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "equipment not found");

    record(&app, &k.fridge_id, k.staff, json!({ "temperature": 9.0 })).await;
    let (_, records) = send(
        &app,
        get_as(&format!("/v1/stores/{}/compliance-records", k.store_id), k.owner),
    )
    .await;
    let (status, _) = send(
        &app,
        json_request_as(
            "POST",
            &format!(
                "/v1/compliance-records/{}/review",
                items(&records)[0]["id"].as_str().unwrap()
            ),
            outsider,
            json!({ "status": "CORRECTED" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, actions) = send(
        &app,
        get_as(&format!("/v1/stores/{}/corrective-actions", k.store_id), k.owner),
    )
    .await;
    let (status, _) = send(
        &app,
        json_request_as(
            "POST",
            &format!(
                "/v1/corrective-actions/{}/complete",
                items(&actions)[0]["id"].as_str().unwrap()
            ),
            outsider,
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deactivated_equipment_rejects_readings() {
    let (app, _) = memory_app(TestClock::new()).await;
    let k = kitchen(&app).await;
    let (status, _) = send(
        &app,
        json_request_as(
            "POST",
            &format!("/v1/equipment/{}/deactivate", k.fridge_id),
            k.manager,
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = record(&app, &k.fridge_id, k.staff, json!({ "temperature": 4.0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn unranged_equipment_follows_configured_policy() {
    let store = Arc::new(InMemoryStore::new());
    let policy = EvaluatorPolicy {
        unmonitored: UnmonitoredPolicy::Reject,
        ..EvaluatorPolicy::default()
    };
    let app = app_with(store, TestClock::new(), policy).await;
    let k = kitchen(&app).await;
    let (_, bag) = send(
        &app,
        json_request_as(
            "POST",
            &format!("/v1/stores/{}/equipment", k.store_id),
            k.owner,
            json!({ "name": "Delivery Bag", "category": "DELIVERY" }),
        ),
    )
    .await;
    let (status, body) = record(
        &app,
        bag["id"].as_str().unwrap(),
        k.staff,
        json!({ "temperature": 40.0 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
}

#[tokio::test]
async fn review_and_completion_workflow() {
    let clock = TestClock::new();
    let (app, _) = memory_app(clock.clone()).await;
    let k = kitchen(&app).await;
    record(&app, &k.fridge_id, k.staff, json!({ "temperature": 8.5 })).await;

    let (_, records) = send(
        &app,
        get_as(&format!("/v1/stores/{}/compliance-records", k.store_id), k.owner),
    )
    .await;
    let record_id = items(&records)[0]["id"].as_str().unwrap().to_string();
    let review_uri = format!("/v1/compliance-records/{record_id}/review");

    let (status, _) = send(
        &app,
        json_request_as("POST", &review_uri, k.staff, json!({ "status": "CORRECTED" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(
        &app,
        json_request_as("POST", &review_uri, k.manager, json!({ "status": "NON_COMPLIANT" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "validation_error");
    let (status, reviewed) = send(
        &app,
        json_request_as("POST", &review_uri, k.manager, json!({ "status": "CORRECTED" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reviewed["status"], "CORRECTED");
    assert_eq!(reviewed["reviewed_by"], k.manager.to_string());
    let (status, body) = send(
        &app,
        json_request_as("POST", &review_uri, k.owner, json!({ "status": "COMPLIANT" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "invalid_transition");

    // Past the 24h deadline the pending action reads as overdue.
    clock.advance(Duration::hours(25));
    let (_, actions) = send(
        &app,
        get_as(&format!("/v1/stores/{}/corrective-actions", k.store_id), k.staff),
    )
    .await;
    assert_eq!(items(&actions)[0]["status"], "OVERDUE");
    let action_id = items(&actions)[0]["id"].as_str().unwrap().to_string();
    let complete_uri = format!("/v1/corrective-actions/{action_id}/complete");

    let other_staff = UserId::new();
    send(
        &app,
        json_request_as(
            "POST",
            &format!("/v1/stores/{}/members", k.store_id),
            k.owner,
            json!({ "user_id": other_staff, "role": "STAFF" }),
        ),
    )
    .await;
    let (status, _) = send(&app, json_request_as("POST", &complete_uri, other_staff, json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, completed) = send(&app, json_request_as("POST", &complete_uri, k.staff, json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(completed["status"], "COMPLETED");
    assert_eq!(completed["completed_by"], k.staff.to_string());
    let (status, body) = send(&app, json_request_as("POST", &complete_uri, k.manager, json!({}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "already_completed");

    let (status, _) = send(
        &app,
        json_request_as(
            "POST",
            &format!("/v1/corrective-actions/{}/complete", CorrectiveActionId::new()),
            k.staff,
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn notifications_are_private_to_their_recipient() {
    let (app, _) = memory_app(TestClock::new()).await;
    let k = kitchen(&app).await;
    record(&app, &k.fridge_id, k.staff, json!({ "temperature": 12.0 })).await;

    let (_, inbox) = send(&app, get_as("/v1/notifications", k.manager)).await;
    let id = items(&inbox)[0]["id"].as_str().unwrap().to_string();
    let read_uri = format!("/v1/notifications/{id}/read");

    let (status, _) = send(&app, json_request_as("POST", &read_uri, k.owner, json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, marked) = send(&app, json_request_as("POST", &read_uri, k.manager, json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["read"], true);

    let (_, unread) = send(&app, get_as("/v1/notifications?unread=true", k.manager)).await;
    assert!(items(&unread).is_empty());
    let (_, unread) = send(&app, get_as("/v1/notifications?unread=true", k.owner)).await;
    assert_eq!(items(&unread).len(), 1);
}

#[tokio::test]
async fn audit_trail_records_each_step() {
    let (app, _) = memory_app(TestClock::new()).await;
    let k = kitchen(&app).await;
    record(&app, &k.fridge_id, k.staff, json!({ "temperature": 7.0 })).await;

    let audit_uri = format!("/v1/stores/{}/audit", k.store_id);
    let (status, _) = send(&app, get_as(&audit_uri, k.staff)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, audit) = send(&app, get_as(&audit_uri, k.manager)).await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = items(&audit)
        .iter()
        .map(|entry| entry["event"]["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds.first(), Some(&"TEMPERATURE_RECORDED"));
    assert!(kinds.contains(&"EQUIPMENT_CREATED"));
    assert_eq!(kinds.iter().filter(|kind| **kind == "MEMBER_ADDED").count(), 3);
    let reading = &items(&audit)[0];
    assert_eq!(reading["actor"], k.staff.to_string());
    assert_eq!(reading["schema_version"], 1);
    assert_eq!(reading["event"]["compliant"], false);

    let (_, limited) = send(&app, get_as(&format!("{audit_uri}?limit=2"), k.owner)).await;
    assert_eq!(items(&limited).len(), 2);
}

/// Memory store whose reading commit always fails.
struct FailingCommitStore {
    inner: InMemoryStore,
}

#[async_trait]
impl EquipmentReader for FailingCommitStore {
    async fn find_equipment(&self, id: EquipmentId) -> StoreResult<Option<EquipmentLookup>> {
        self.inner.find_equipment(id).await
    }
}

#[async_trait]
impl MembershipReader for FailingCommitStore {
    async fn users_with_role_in_store(
        &self,
        store: StoreId,
        roles: &[Role],
    ) -> StoreResult<Vec<UserId>> {
        self.inner.users_with_role_in_store(store, roles).await
    }
}

#[async_trait]
impl ComplianceStore for FailingCommitStore {
    async fn commit_reading(&self, _write: ReadingWrite) -> StoreResult<()> {
        Err(StoreError::Unexpected(anyhow::anyhow!(
            "could not write block: no space left on device"
        )))
    }

    async fn append_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        self.inner.append_audit(entry).await
    }

    async fn count_readings(&self, store: StoreId, window: TimeWindow) -> StoreResult<ReadingCounts> {
        self.inner.count_readings(store, window).await
    }

    async fn count_active_equipment(&self, store: StoreId) -> StoreResult<u64> {
        self.inner.count_active_equipment(store).await
    }
}

#[async_trait]
impl TrackerStore for FailingCommitStore {
    async fn create_store(&self, store: Store, owner: Membership) -> StoreResult<Store> {
        self.inner.create_store(store, owner).await
    }
    async fn get_store(&self, id: StoreId) -> StoreResult<Store> {
        self.inner.get_store(id).await
    }
    async fn list_stores_for_user(&self, user: UserId) -> StoreResult<Vec<Store>> {
        self.inner.list_stores_for_user(user).await
    }
    async fn add_member(&self, membership: Membership) -> StoreResult<Membership> {
        self.inner.add_member(membership).await
    }
    async fn list_members(&self, store: StoreId) -> StoreResult<Vec<Membership>> {
        self.inner.list_members(store).await
    }
    async fn member_role(&self, store: StoreId, user: UserId) -> StoreResult<Option<Role>> {
        self.inner.member_role(store, user).await
    }
    async fn create_equipment(&self, equipment: Equipment) -> StoreResult<Equipment> {
        self.inner.create_equipment(equipment).await
    }
    async fn list_equipment(&self, store: StoreId) -> StoreResult<Vec<Equipment>> {
        self.inner.list_equipment(store).await
    }
    async fn deactivate_equipment(&self, id: EquipmentId) -> StoreResult<Equipment> {
        self.inner.deactivate_equipment(id).await
    }
    async fn list_readings(
        &self,
        store: StoreId,
        window: TimeWindow,
    ) -> StoreResult<Vec<TemperatureRecord>> {
        self.inner.list_readings(store, window).await
    }
    async fn list_compliance_records(&self, store: StoreId) -> StoreResult<Vec<ComplianceRecord>> {
        self.inner.list_compliance_records(store).await
    }
    async fn get_compliance_record(&self, id: ComplianceRecordId) -> StoreResult<ComplianceRecord> {
        self.inner.get_compliance_record(id).await
    }
    async fn review_compliance_record(
        &self,
        id: ComplianceRecordId,
        status: RecordStatus,
        reviewer: UserId,
        at: DateTime<Utc>,
    ) -> StoreResult<ComplianceRecord> {
        self.inner
            .review_compliance_record(id, status, reviewer, at)
            .await
    }
    async fn list_corrective_actions(&self, store: StoreId) -> StoreResult<Vec<CorrectiveAction>> {
        self.inner.list_corrective_actions(store).await
    }
    async fn get_corrective_action(&self, id: CorrectiveActionId) -> StoreResult<CorrectiveAction> {
        self.inner.get_corrective_action(id).await
    }
    async fn complete_corrective_action(
        &self,
        id: CorrectiveActionId,
        by: UserId,
        at: DateTime<Utc>,
    ) -> StoreResult<CorrectiveAction> {
        self.inner.complete_corrective_action(id, by, at).await
    }
    async fn list_notifications(
        &self,
        user: UserId,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        self.inner.list_notifications(user, unread_only).await
    }
    async fn mark_notification_read(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> StoreResult<Notification> {
        self.inner.mark_notification_read(id, user).await
    }
    async fn list_audit(&self, store: StoreId, limit: usize) -> StoreResult<Vec<AuditEntry>> {
        self.inner.list_audit(store, limit).await
    }
    async fn health_check(&self) -> StoreResult<()> {
        self.inner.health_check().await
    }
    fn is_durable(&self) -> bool {
        false
    }
    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

#[tokio::test]
async fn storage_failure_returns_generic_error_and_no_rows() {
    let store = Arc::new(FailingCommitStore {
        inner: InMemoryStore::new(),
    });
    let app = app_with(store.clone(), TestClock::new(), EvaluatorPolicy::default()).await;
    let k = kitchen(&app).await;

    let (status, body) = record(&app, &k.fridge_id, k.staff, json!({ "temperature": 9.0 })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "internal");
    assert_eq!(body["message"], "failed to record temperature");
    assert!(!body.to_string().contains("no space left"));

    let (_, records) = send(
        &app,
        get_as(&format!("/v1/stores/{}/compliance-records", k.store_id), k.owner),
    )
    .await;
    assert!(items(&records).is_empty());
    let (_, inbox) = send(&app, get_as("/v1/notifications", k.manager)).await;
    assert!(items(&inbox).is_empty());
}
