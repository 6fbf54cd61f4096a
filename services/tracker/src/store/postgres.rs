//! Postgres-backed implementation of the tracker store.
//!
//! # Key invariants
//! - `commit_reading` runs in one transaction: the temperature record, the
//!   compliance record and its details, the corrective action, and every
//!   notification are inserted in that order and committed together.
//! - Status transitions lock the row (`FOR UPDATE`) and are checked against the
//!   domain transition rules before the update.
//! - Enums are stored as their SCREAMING_SNAKE_CASE text and parsed strictly on
//!   load; an unknown value is a storage error, never a silent default.
//!
//! # Operational notes
//! - Migrations run at startup via `sqlx::migrate!("./migrations")`.
//! - Pool size and timeouts come from [`PostgresConfig`]; avoid logging the URL,
//!   it may carry credentials.
use super::{StoreError, StoreResult, TrackerStore};
use crate::config::PostgresConfig;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use larder_common::ids::{
    AuditEntryId, ComplianceRecordId, CorrectiveActionId, EquipmentId, NotificationId, StoreId,
    TemperatureRecordId, UserId,
};
use larder_compliance::model::{
    ActionStatus, ComplianceRecord, CorrectiveAction, Equipment, EquipmentCategory, Membership,
    Notification, NotificationKind, RecordDetail, RecordKind, RecordStatus, Role, Store,
    TemperatureRecord,
};
use larder_compliance::{
    AuditEntry, AuditEvent, ComplianceStore, EquipmentLookup, EquipmentReader, MembershipReader,
    ReadingCounts, ReadingWrite, TimeWindow,
};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

pub struct PostgresStore {
    pool: PgPool,
}

#[derive(Debug, Clone, FromRow)]
struct DbStore {
    id: Uuid,
    name: String,
    location: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
struct DbMembership {
    store_id: Uuid,
    user_id: Uuid,
    role: String,
}

#[derive(Debug, Clone, FromRow)]
struct DbEquipment {
    id: Uuid,
    store_id: Uuid,
    name: String,
    category: String,
    min_temp: Option<f64>,
    max_temp: Option<f64>,
    location: Option<String>,
    active: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbEquipmentLookup {
    #[sqlx(flatten)]
    equipment: DbEquipment,
    store_name: String,
}

#[derive(Debug, Clone, FromRow)]
struct DbReading {
    id: Uuid,
    equipment_id: Uuid,
    store_id: Uuid,
    temperature: f64,
    recorded_at: DateTime<Utc>,
    recorded_by: Uuid,
    notes: Option<String>,
    is_compliant: bool,
}

#[derive(Debug, Clone, FromRow)]
struct DbRecord {
    id: Uuid,
    store_id: Uuid,
    kind: String,
    status: String,
    notes: String,
    source_reading: Uuid,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    reviewed_by: Option<Uuid>,
    reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
struct DbDetail {
    record_id: Uuid,
    key: String,
    value: String,
}

#[derive(Debug, Clone, FromRow)]
struct DbAction {
    id: Uuid,
    record_id: Uuid,
    store_id: Uuid,
    assignee: Uuid,
    description: String,
    due_at: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    completed_by: Option<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
struct DbNotification {
    id: Uuid,
    user_id: Uuid,
    store_id: Uuid,
    kind: String,
    title: String,
    message: String,
    action_url: String,
    read: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
struct DbAudit {
    id: Uuid,
    schema_version: i32,
    actor: Uuid,
    store_id: Uuid,
    event: serde_json::Value,
    recorded_at: DateTime<Utc>,
}

const EQUIPMENT_COLUMNS: &str =
    "e.id, e.store_id, e.name, e.category, e.min_temp, e.max_temp, e.location, e.active, e.created_at";
const RECORD_COLUMNS: &str = "id, store_id, kind, status, notes, source_reading, created_by, created_at, reviewed_by, reviewed_at";
const ACTION_COLUMNS: &str = "id, record_id, store_id, assignee, description, due_at, status, created_at, completed_at, completed_by";
const NOTIFICATION_COLUMNS: &str =
    "id, user_id, store_id, kind, title, message, action_url, read, created_at";

impl PostgresStore {
    /// Connect, apply embedded migrations, and return a ready store.
    pub async fn connect(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, true).await
    }

    /// Connect without touching the schema. Tests that manage migrations use this.
    #[cfg(any(test, feature = "pg-tests"))]
    pub async fn connect_without_migrations(pg: &PostgresConfig) -> StoreResult<Self> {
        Self::connect_internal(pg, false).await
    }

    async fn connect_internal(pg: &PostgresConfig, run_migrations: bool) -> StoreResult<Self> {
        let connect_options = PgConnectOptions::from_str(&pg.url).map_err(db_err)?;
        let pool = tokio::time::timeout(
            Duration::from_millis(pg.connect_timeout_ms),
            PgPoolOptions::new()
                .max_connections(pg.max_connections)
                .acquire_timeout(Duration::from_millis(pg.acquire_timeout_ms))
                .connect_with(connect_options),
        )
        .await
        .map_err(|_| StoreError::Unexpected(anyhow!("postgres connect timed out")))?
        .map_err(db_err)?;

        if run_migrations {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .map_err(|err| StoreError::Unexpected(err.into()))?;
        }
        let store = Self { pool };
        store.refresh_equipment_gauge().await?;
        Ok(store)
    }

    async fn refresh_equipment_gauge(&self) -> StoreResult<()> {
        let active: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM equipment WHERE active")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        metrics::gauge!("larder_equipment_active").set(active as f64);
        Ok(())
    }

    /// Refresh the gauge after an equipment write that has already committed.
    /// A failed count only leaves the gauge stale; the write itself stands.
    async fn note_equipment_change(&self) {
        if let Err(err) = self.refresh_equipment_gauge().await {
            tracing::warn!(error = ?err, "failed to refresh active equipment gauge");
        }
    }

    /// Attach detail rows to records, preserving each record's detail order.
    async fn hydrate_records(&self, rows: Vec<DbRecord>) -> StoreResult<Vec<ComplianceRecord>> {
        let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
        let details: Vec<DbDetail> = sqlx::query_as(
            "SELECT record_id, key, value FROM compliance_record_details WHERE record_id = ANY($1) ORDER BY record_id, position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        let mut by_record: HashMap<Uuid, Vec<RecordDetail>> = HashMap::new();
        for detail in details {
            by_record
                .entry(detail.record_id)
                .or_default()
                .push(RecordDetail::new(detail.key, detail.value));
        }
        rows.into_iter()
            .map(|row| {
                let details = by_record.remove(&row.id).unwrap_or_default();
                record_from_db(row, details)
            })
            .collect()
    }

    async fn load_record(&self, id: ComplianceRecordId) -> StoreResult<ComplianceRecord> {
        let row: Option<DbRecord> = sqlx::query_as(&format!(
            "SELECT {RECORD_COLUMNS} FROM compliance_records WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        let row = row.ok_or_else(|| StoreError::NotFound("compliance record".into()))?;
        self.hydrate_records(vec![row])
            .await?
            .pop()
            .ok_or_else(|| StoreError::NotFound("compliance record".into()))
    }
}

async fn insert_cascade_rows(
    tx: &mut Transaction<'_, Postgres>,
    write: &ReadingWrite,
) -> Result<(), sqlx::Error> {
    let reading = &write.reading;
    sqlx::query(
        r#"INSERT INTO temperature_records (id, equipment_id, store_id, temperature, recorded_at, recorded_by, notes, is_compliant)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
    )
    .bind(reading.id.as_uuid())
    .bind(reading.equipment_id.as_uuid())
    .bind(reading.store_id.as_uuid())
    .bind(reading.temperature)
    .bind(reading.recorded_at)
    .bind(reading.recorded_by.as_uuid())
    .bind(&reading.notes)
    .bind(reading.is_compliant)
    .execute(&mut **tx)
    .await?;

    let Some(cascade) = &write.cascade else {
        return Ok(());
    };
    let record = &cascade.record;
    sqlx::query(
        r#"INSERT INTO compliance_records (id, store_id, kind, status, notes, source_reading, created_by, created_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
    )
    .bind(record.id.as_uuid())
    .bind(record.store_id.as_uuid())
    .bind(record_kind_to_str(record.kind))
    .bind(record_status_to_str(record.status))
    .bind(&record.notes)
    .bind(record.source_reading.as_uuid())
    .bind(record.created_by.as_uuid())
    .bind(record.created_at)
    .execute(&mut **tx)
    .await?;
    for (position, detail) in record.details.iter().enumerate() {
        sqlx::query(
            "INSERT INTO compliance_record_details (record_id, position, key, value) VALUES ($1, $2, $3, $4)",
        )
        .bind(record.id.as_uuid())
        .bind(position as i32)
        .bind(&detail.key)
        .bind(&detail.value)
        .execute(&mut **tx)
        .await?;
    }

    let action = &cascade.action;
    sqlx::query(
        r#"INSERT INTO corrective_actions (id, record_id, store_id, assignee, description, due_at, status, created_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
    )
    .bind(action.id.as_uuid())
    .bind(action.record_id.as_uuid())
    .bind(action.store_id.as_uuid())
    .bind(action.assignee.as_uuid())
    .bind(&action.description)
    .bind(action.due_at)
    .bind(action_status_to_str(action.status))
    .bind(action.created_at)
    .execute(&mut **tx)
    .await?;

    for notification in &cascade.notifications {
        sqlx::query(
            r#"INSERT INTO notifications (id, user_id, store_id, kind, title, message, action_url, read, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.user_id.as_uuid())
        .bind(notification.store_id.as_uuid())
        .bind(notification_kind_to_str(notification.kind))
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.action_url)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

#[async_trait]
impl EquipmentReader for PostgresStore {
    async fn find_equipment(&self, id: EquipmentId) -> StoreResult<Option<EquipmentLookup>> {
        let row: Option<DbEquipmentLookup> = sqlx::query_as(&format!(
            "SELECT {EQUIPMENT_COLUMNS}, s.name AS store_name FROM equipment e JOIN stores s ON s.id = e.store_id WHERE e.id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(|row| {
            Ok(EquipmentLookup {
                equipment: equipment_from_db(row.equipment)?,
                store_name: row.store_name,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl MembershipReader for PostgresStore {
    async fn users_with_role_in_store(
        &self,
        store: StoreId,
        roles: &[Role],
    ) -> StoreResult<Vec<UserId>> {
        let roles: Vec<&'static str> = roles.iter().map(|role| role_to_str(*role)).collect();
        let users: Vec<Uuid> = sqlx::query_scalar(
            "SELECT DISTINCT user_id FROM memberships WHERE store_id = $1 AND role = ANY($2) ORDER BY user_id",
        )
        .bind(store.as_uuid())
        .bind(&roles)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(users.into_iter().map(UserId::from_uuid).collect())
    }
}

#[async_trait]
impl ComplianceStore for PostgresStore {
    async fn commit_reading(&self, write: ReadingWrite) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        if let Err(err) = insert_cascade_rows(&mut tx, &write).await {
            // Dropping the transaction rolls back every row inserted so far.
            if is_foreign_key_violation(&err) {
                return Err(StoreError::NotFound("equipment or store".into()));
            }
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("reading already recorded".into()));
            }
            return Err(db_err(err));
        }
        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn append_audit(&self, entry: AuditEntry) -> StoreResult<()> {
        let event = serde_json::to_value(&entry.event)
            .map_err(|err| StoreError::Unexpected(err.into()))?;
        sqlx::query(
            r#"INSERT INTO audit_entries (id, schema_version, actor, store_id, action, event, recorded_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(entry.id.as_uuid())
        .bind(i32::from(entry.schema_version))
        .bind(entry.actor.as_uuid())
        .bind(entry.store_id.as_uuid())
        .bind(entry.action().as_str())
        .bind(event)
        .bind(entry.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn count_readings(&self, store: StoreId, window: TimeWindow) -> StoreResult<ReadingCounts> {
        let (total, non_compliant): (i64, i64) = sqlx::query_as(
            r#"SELECT COUNT(*), COUNT(*) FILTER (WHERE NOT is_compliant)
               FROM temperature_records
               WHERE store_id = $1 AND recorded_at >= $2 AND recorded_at < $3"#,
        )
        .bind(store.as_uuid())
        .bind(window.start)
        .bind(window.end)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(ReadingCounts {
            total: total as u64,
            non_compliant: non_compliant as u64,
        })
    }

    async fn count_active_equipment(&self, store: StoreId) -> StoreResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM equipment WHERE store_id = $1 AND active")
                .bind(store.as_uuid())
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;
        Ok(count as u64)
    }
}

#[async_trait]
impl TrackerStore for PostgresStore {
    async fn create_store(&self, store: Store, owner: Membership) -> StoreResult<Store> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let insert = sqlx::query("INSERT INTO stores (id, name, location) VALUES ($1, $2, $3)")
            .bind(store.id.as_uuid())
            .bind(&store.name)
            .bind(&store.location)
            .execute(&mut *tx)
            .await;
        if let Err(err) = insert {
            if is_unique_violation(&err) {
                return Err(StoreError::Conflict("store exists".into()));
            }
            return Err(db_err(err));
        }
        sqlx::query("INSERT INTO memberships (store_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(owner.store_id.as_uuid())
            .bind(owner.user_id.as_uuid())
            .bind(role_to_str(owner.role))
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        Ok(store)
    }

    async fn get_store(&self, id: StoreId) -> StoreResult<Store> {
        let row: Option<DbStore> =
            sqlx::query_as("SELECT id, name, location FROM stores WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        row.map(store_from_db)
            .ok_or_else(|| StoreError::NotFound("store".into()))
    }

    async fn list_stores_for_user(&self, user: UserId) -> StoreResult<Vec<Store>> {
        let rows: Vec<DbStore> = sqlx::query_as(
            r#"SELECT s.id, s.name, s.location FROM stores s
               JOIN memberships m ON m.store_id = s.id
               WHERE m.user_id = $1 ORDER BY s.name, s.id"#,
        )
        .bind(user.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(store_from_db).collect())
    }

    async fn add_member(&self, membership: Membership) -> StoreResult<Membership> {
        let insert = sqlx::query("INSERT INTO memberships (store_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(membership.store_id.as_uuid())
            .bind(membership.user_id.as_uuid())
            .bind(role_to_str(membership.role))
            .execute(&self.pool)
            .await;
        match insert {
            Ok(_) => Ok(membership),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::Conflict("membership exists".into()))
            }
            Err(err) if is_foreign_key_violation(&err) => {
                Err(StoreError::NotFound("store".into()))
            }
            Err(err) => Err(db_err(err)),
        }
    }

    async fn list_members(&self, store: StoreId) -> StoreResult<Vec<Membership>> {
        let rows: Vec<DbMembership> = sqlx::query_as(
            "SELECT store_id, user_id, role FROM memberships WHERE store_id = $1 ORDER BY user_id",
        )
        .bind(store.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter()
            .map(|row| {
                Ok(Membership {
                    store_id: StoreId::from_uuid(row.store_id),
                    user_id: UserId::from_uuid(row.user_id),
                    role: parse_role(&row.role)?,
                })
            })
            .collect()
    }

    async fn member_role(&self, store: StoreId, user: UserId) -> StoreResult<Option<Role>> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM memberships WHERE store_id = $1 AND user_id = $2")
                .bind(store.as_uuid())
                .bind(user.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;
        role.as_deref().map(parse_role).transpose()
    }

    async fn create_equipment(&self, equipment: Equipment) -> StoreResult<Equipment> {
        let insert = sqlx::query(
            r#"INSERT INTO equipment (id, store_id, name, category, min_temp, max_temp, location, active, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(equipment.id.as_uuid())
        .bind(equipment.store_id.as_uuid())
        .bind(&equipment.name)
        .bind(category_to_str(equipment.category))
        .bind(equipment.min_temp)
        .bind(equipment.max_temp)
        .bind(&equipment.location)
        .bind(equipment.active)
        .bind(equipment.created_at)
        .execute(&self.pool)
        .await;
        match insert {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::Conflict("equipment exists".into()));
            }
            Err(err) if is_foreign_key_violation(&err) => {
                return Err(StoreError::NotFound("store".into()));
            }
            Err(err) => return Err(db_err(err)),
        }
        self.note_equipment_change().await;
        Ok(equipment)
    }

    async fn list_equipment(&self, store: StoreId) -> StoreResult<Vec<Equipment>> {
        let rows: Vec<DbEquipment> = sqlx::query_as(&format!(
            "SELECT {EQUIPMENT_COLUMNS} FROM equipment e WHERE e.store_id = $1 ORDER BY e.name, e.id"
        ))
        .bind(store.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(equipment_from_db).collect()
    }

    async fn deactivate_equipment(&self, id: EquipmentId) -> StoreResult<Equipment> {
        let row: Option<DbEquipment> = sqlx::query_as(&format!(
            "UPDATE equipment e SET active = FALSE WHERE e.id = $1 RETURNING {EQUIPMENT_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        let row = row.ok_or_else(|| StoreError::NotFound("equipment".into()))?;
        self.note_equipment_change().await;
        equipment_from_db(row)
    }

    async fn list_readings(
        &self,
        store: StoreId,
        window: TimeWindow,
    ) -> StoreResult<Vec<TemperatureRecord>> {
        let rows: Vec<DbReading> = sqlx::query_as(
            r#"SELECT id, equipment_id, store_id, temperature, recorded_at, recorded_by, notes, is_compliant
               FROM temperature_records
               WHERE store_id = $1 AND recorded_at >= $2 AND recorded_at < $3
               ORDER BY recorded_at, id"#,
        )
        .bind(store.as_uuid())
        .bind(window.start)
        .bind(window.end)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.into_iter().map(reading_from_db).collect())
    }

    async fn list_compliance_records(&self, store: StoreId) -> StoreResult<Vec<ComplianceRecord>> {
        let rows: Vec<DbRecord> = sqlx::query_as(&format!(
            "SELECT {RECORD_COLUMNS} FROM compliance_records WHERE store_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(store.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        self.hydrate_records(rows).await
    }

    async fn get_compliance_record(&self, id: ComplianceRecordId) -> StoreResult<ComplianceRecord> {
        self.load_record(id).await
    }

    async fn review_compliance_record(
        &self,
        id: ComplianceRecordId,
        status: RecordStatus,
        reviewer: UserId,
        at: DateTime<Utc>,
    ) -> StoreResult<ComplianceRecord> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM compliance_records WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
        let current = current.ok_or_else(|| StoreError::NotFound("compliance record".into()))?;
        let current = parse_record_status(&current)?;
        if !current.can_transition_to(status) {
            return Err(StoreError::Conflict(format!(
                "compliance record is {}",
                record_status_to_str(current)
            )));
        }
        sqlx::query(
            "UPDATE compliance_records SET status = $2, reviewed_by = $3, reviewed_at = $4 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(record_status_to_str(status))
        .bind(reviewer.as_uuid())
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        self.load_record(id).await
    }

    async fn list_corrective_actions(&self, store: StoreId) -> StoreResult<Vec<CorrectiveAction>> {
        let rows: Vec<DbAction> = sqlx::query_as(&format!(
            "SELECT {ACTION_COLUMNS} FROM corrective_actions WHERE store_id = $1 ORDER BY due_at, id"
        ))
        .bind(store.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(action_from_db).collect()
    }

    async fn get_corrective_action(&self, id: CorrectiveActionId) -> StoreResult<CorrectiveAction> {
        let row: Option<DbAction> = sqlx::query_as(&format!(
            "SELECT {ACTION_COLUMNS} FROM corrective_actions WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(action_from_db)
            .unwrap_or_else(|| Err(StoreError::NotFound("corrective action".into())))
    }

    async fn complete_corrective_action(
        &self,
        id: CorrectiveActionId,
        by: UserId,
        at: DateTime<Utc>,
    ) -> StoreResult<CorrectiveAction> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM corrective_actions WHERE id = $1 FOR UPDATE")
                .bind(id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
        let current = current.ok_or_else(|| StoreError::NotFound("corrective action".into()))?;
        if !parse_action_status(&current)?.can_transition_to(ActionStatus::Completed) {
            return Err(StoreError::Conflict("corrective action already completed".into()));
        }
        let row: DbAction = sqlx::query_as(&format!(
            "UPDATE corrective_actions SET status = $2, completed_by = $3, completed_at = $4 WHERE id = $1 RETURNING {ACTION_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(action_status_to_str(ActionStatus::Completed))
        .bind(by.as_uuid())
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;
        action_from_db(row)
    }

    async fn list_notifications(
        &self,
        user: UserId,
        unread_only: bool,
    ) -> StoreResult<Vec<Notification>> {
        let rows: Vec<DbNotification> = sqlx::query_as(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = $1 AND (NOT $2 OR NOT read) ORDER BY created_at DESC, id DESC"
        ))
        .bind(user.as_uuid())
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(notification_from_db).collect()
    }

    async fn mark_notification_read(
        &self,
        id: NotificationId,
        user: UserId,
    ) -> StoreResult<Notification> {
        let row: Option<DbNotification> = sqlx::query_as(&format!(
            "UPDATE notifications SET read = TRUE WHERE id = $1 AND user_id = $2 RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(user.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        row.map(notification_from_db)
            .unwrap_or_else(|| Err(StoreError::NotFound("notification".into())))
    }

    async fn list_audit(&self, store: StoreId, limit: usize) -> StoreResult<Vec<AuditEntry>> {
        let rows: Vec<DbAudit> = sqlx::query_as(
            r#"SELECT id, schema_version, actor, store_id, event, recorded_at
               FROM audit_entries WHERE store_id = $1
               ORDER BY recorded_at DESC, id DESC LIMIT $2"#,
        )
        .bind(store.as_uuid())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        rows.into_iter().map(audit_from_db).collect()
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    fn is_durable(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

fn db_err(err: sqlx::Error) -> StoreError {
    StoreError::Unexpected(err.into())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    database_code(err).as_deref() == Some("23505")
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    database_code(err).as_deref() == Some("23503")
}

fn database_code(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().map(|code| code.into_owned()),
        _ => None,
    }
}

fn store_from_db(row: DbStore) -> Store {
    Store {
        id: StoreId::from_uuid(row.id),
        name: row.name,
        location: row.location,
    }
}

fn equipment_from_db(row: DbEquipment) -> StoreResult<Equipment> {
    Ok(Equipment {
        id: EquipmentId::from_uuid(row.id),
        store_id: StoreId::from_uuid(row.store_id),
        name: row.name,
        category: parse_category(&row.category)?,
        min_temp: row.min_temp,
        max_temp: row.max_temp,
        location: row.location,
        active: row.active,
        created_at: row.created_at,
    })
}

fn reading_from_db(row: DbReading) -> TemperatureRecord {
    TemperatureRecord {
        id: TemperatureRecordId::from_uuid(row.id),
        equipment_id: EquipmentId::from_uuid(row.equipment_id),
        store_id: StoreId::from_uuid(row.store_id),
        temperature: row.temperature,
        recorded_at: row.recorded_at,
        recorded_by: UserId::from_uuid(row.recorded_by),
        notes: row.notes,
        is_compliant: row.is_compliant,
    }
}

fn record_from_db(row: DbRecord, details: Vec<RecordDetail>) -> StoreResult<ComplianceRecord> {
    Ok(ComplianceRecord {
        id: ComplianceRecordId::from_uuid(row.id),
        store_id: StoreId::from_uuid(row.store_id),
        kind: parse_record_kind(&row.kind)?,
        status: parse_record_status(&row.status)?,
        notes: row.notes,
        details,
        source_reading: TemperatureRecordId::from_uuid(row.source_reading),
        created_by: UserId::from_uuid(row.created_by),
        created_at: row.created_at,
        reviewed_by: row.reviewed_by.map(UserId::from_uuid),
        reviewed_at: row.reviewed_at,
    })
}

fn action_from_db(row: DbAction) -> StoreResult<CorrectiveAction> {
    Ok(CorrectiveAction {
        id: CorrectiveActionId::from_uuid(row.id),
        record_id: ComplianceRecordId::from_uuid(row.record_id),
        store_id: StoreId::from_uuid(row.store_id),
        assignee: UserId::from_uuid(row.assignee),
        description: row.description,
        due_at: row.due_at,
        status: parse_action_status(&row.status)?,
        created_at: row.created_at,
        completed_at: row.completed_at,
        completed_by: row.completed_by.map(UserId::from_uuid),
    })
}

fn notification_from_db(row: DbNotification) -> StoreResult<Notification> {
    Ok(Notification {
        id: NotificationId::from_uuid(row.id),
        user_id: UserId::from_uuid(row.user_id),
        store_id: StoreId::from_uuid(row.store_id),
        kind: parse_notification_kind(&row.kind)?,
        title: row.title,
        message: row.message,
        action_url: row.action_url,
        read: row.read,
        created_at: row.created_at,
    })
}

fn audit_from_db(row: DbAudit) -> StoreResult<AuditEntry> {
    let event: AuditEvent = serde_json::from_value(row.event)
        .map_err(|err| StoreError::Unexpected(anyhow!("invalid audit payload: {err}")))?;
    let schema_version = u16::try_from(row.schema_version)
        .map_err(|_| StoreError::Unexpected(anyhow!("invalid audit schema version")))?;
    Ok(AuditEntry {
        id: AuditEntryId::from_uuid(row.id),
        schema_version,
        actor: UserId::from_uuid(row.actor),
        store_id: StoreId::from_uuid(row.store_id),
        event,
        recorded_at: row.recorded_at,
    })
}

fn parse_category(value: &str) -> StoreResult<EquipmentCategory> {
    match value {
        "COLD_STORAGE" => Ok(EquipmentCategory::ColdStorage),
        "FREEZER" => Ok(EquipmentCategory::Freezer),
        "HOT_HOLDING" => Ok(EquipmentCategory::HotHolding),
        "COOKING" => Ok(EquipmentCategory::Cooking),
        "DELIVERY" => Ok(EquipmentCategory::Delivery),
        _ => Err(StoreError::Unexpected(anyhow!(
            "invalid equipment category {value}"
        ))),
    }
}

fn category_to_str(value: EquipmentCategory) -> &'static str {
    match value {
        EquipmentCategory::ColdStorage => "COLD_STORAGE",
        EquipmentCategory::Freezer => "FREEZER",
        EquipmentCategory::HotHolding => "HOT_HOLDING",
        EquipmentCategory::Cooking => "COOKING",
        EquipmentCategory::Delivery => "DELIVERY",
    }
}

fn parse_role(value: &str) -> StoreResult<Role> {
    match value {
        "STAFF" => Ok(Role::Staff),
        "MANAGER" => Ok(Role::Manager),
        "OWNER" => Ok(Role::Owner),
        "FRANCHISE_ADMIN" => Ok(Role::FranchiseAdmin),
        _ => Err(StoreError::Unexpected(anyhow!("invalid role {value}"))),
    }
}

fn role_to_str(value: Role) -> &'static str {
    match value {
        Role::Staff => "STAFF",
        Role::Manager => "MANAGER",
        Role::Owner => "OWNER",
        Role::FranchiseAdmin => "FRANCHISE_ADMIN",
    }
}

fn parse_record_kind(value: &str) -> StoreResult<RecordKind> {
    match value {
        "TEMPERATURE" => Ok(RecordKind::Temperature),
        _ => Err(StoreError::Unexpected(anyhow!("invalid record kind {value}"))),
    }
}

fn record_kind_to_str(value: RecordKind) -> &'static str {
    match value {
        RecordKind::Temperature => "TEMPERATURE",
    }
}

fn parse_record_status(value: &str) -> StoreResult<RecordStatus> {
    match value {
        "NON_COMPLIANT" => Ok(RecordStatus::NonCompliant),
        "COMPLIANT" => Ok(RecordStatus::Compliant),
        "CORRECTED" => Ok(RecordStatus::Corrected),
        _ => Err(StoreError::Unexpected(anyhow!(
            "invalid record status {value}"
        ))),
    }
}

fn record_status_to_str(value: RecordStatus) -> &'static str {
    match value {
        RecordStatus::NonCompliant => "NON_COMPLIANT",
        RecordStatus::Compliant => "COMPLIANT",
        RecordStatus::Corrected => "CORRECTED",
    }
}

fn parse_action_status(value: &str) -> StoreResult<ActionStatus> {
    match value {
        "PENDING" => Ok(ActionStatus::Pending),
        "COMPLETED" => Ok(ActionStatus::Completed),
        "OVERDUE" => Ok(ActionStatus::Overdue),
        _ => Err(StoreError::Unexpected(anyhow!(
            "invalid action status {value}"
        ))),
    }
}

fn action_status_to_str(value: ActionStatus) -> &'static str {
    match value {
        ActionStatus::Pending => "PENDING",
        ActionStatus::Completed => "COMPLETED",
        ActionStatus::Overdue => "OVERDUE",
    }
}

fn parse_notification_kind(value: &str) -> StoreResult<NotificationKind> {
    match value {
        "TEMP_ALERT" => Ok(NotificationKind::TempAlert),
        _ => Err(StoreError::Unexpected(anyhow!(
            "invalid notification kind {value}"
        ))),
    }
}

fn notification_kind_to_str(value: NotificationKind) -> &'static str {
    match value {
        NotificationKind::TempAlert => "TEMP_ALERT",
    }
}
