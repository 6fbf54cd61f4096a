//! The temperature-compliance workflow.
//!
//! # Purpose
//! [`ComplianceEvaluator::record_temperature`] classifies a reading against the
//! equipment's acceptable range and, when it falls outside, builds the cascade
//! (compliance record, corrective action, one alert per management user) and
//! commits it together with the reading. [`ComplianceEvaluator::temperature_stats`]
//! is the read side.
//!
//! # Failure semantics
//! - Unknown equipment fails with `NotFound` before any write.
//! - The reading and its cascade go through a single `commit_reading` call, so a
//!   backend failure leaves neither behind.
//! - The audit append happens after the commit and is best-effort: its failure
//!   is logged and counted but the reading is still returned.
use crate::audit::{AuditEntry, AuditEvent};
use crate::classify::{Classification, TemperatureRange, UnmonitoredPolicy, classify, format_degrees};
use crate::errors::{ComplianceError, ComplianceResult};
use crate::model::{
    ActionStatus, ComplianceRecord, CorrectiveAction, Notification, NotificationKind, RecordDetail,
    RecordKind, RecordStatus, Role, TemperatureRecord,
};
use crate::ports::{
    Cascade, ComplianceStore, EquipmentLookup, EquipmentReader, MembershipReader, ReadingWrite,
    TimeWindow,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use larder_common::ids::{
    ComplianceRecordId, CorrectiveActionId, EquipmentId, NotificationId, StoreId,
    TemperatureRecordId, UserId,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
pub struct EvaluatorPolicy {
    pub unmonitored: UnmonitoredPolicy,
    /// Corrective actions are due this long after creation.
    pub action_due_after: Duration,
    /// Link placed on every temperature alert.
    pub alert_url: String,
}

impl Default for EvaluatorPolicy {
    fn default() -> Self {
        Self {
            unmonitored: UnmonitoredPolicy::DefaultBand,
            action_due_after: Duration::hours(24),
            alert_url: "/temperature".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordTemperature {
    pub equipment_id: EquipmentId,
    pub temperature: f64,
    pub recorded_by: UserId,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TemperatureStats {
    pub total_records: u64,
    pub non_compliant_records: u64,
    pub equipment_count: u64,
    /// Whole percent of readings in range; 100 when there are none.
    pub compliance_rate: u8,
}

pub fn compliance_rate(total: u64, non_compliant: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let compliant = total.saturating_sub(non_compliant);
    ((compliant as f64 / total as f64) * 100.0).round() as u8
}

#[derive(Clone)]
pub struct ComplianceEvaluator {
    equipment: Arc<dyn EquipmentReader>,
    members: Arc<dyn MembershipReader>,
    store: Arc<dyn ComplianceStore>,
    clock: Arc<dyn Clock>,
    policy: EvaluatorPolicy,
}

impl ComplianceEvaluator {
    pub fn new(
        equipment: Arc<dyn EquipmentReader>,
        members: Arc<dyn MembershipReader>,
        store: Arc<dyn ComplianceStore>,
        clock: Arc<dyn Clock>,
        policy: EvaluatorPolicy,
    ) -> Self {
        Self {
            equipment,
            members,
            store,
            clock,
            policy,
        }
    }

    /// Wire every port to one backend that implements all of them.
    pub fn with_backend<B>(backend: Arc<B>, clock: Arc<dyn Clock>, policy: EvaluatorPolicy) -> Self
    where
        B: EquipmentReader + MembershipReader + ComplianceStore + 'static,
    {
        Self::new(backend.clone(), backend.clone(), backend, clock, policy)
    }

    pub fn policy(&self) -> &EvaluatorPolicy {
        &self.policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[tracing::instrument(
        skip(self, request),
        fields(equipment_id = %request.equipment_id, recorded_by = %request.recorded_by)
    )]
    pub async fn record_temperature(
        &self,
        request: RecordTemperature,
    ) -> ComplianceResult<TemperatureRecord> {
        if !request.temperature.is_finite() {
            return Err(ComplianceError::Validation(
                "temperature must be a finite number".to_string(),
            ));
        }
        let notes = request
            .notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());

        let lookup = self
            .equipment
            .find_equipment(request.equipment_id)
            .await
            .map_err(ComplianceError::failed("failed to load equipment"))?
            .ok_or_else(|| ComplianceError::NotFound("equipment not found".to_string()))?;
        if !lookup.equipment.active {
            return Err(ComplianceError::Validation(format!(
                "equipment {} is deactivated",
                lookup.equipment.name
            )));
        }

        let classification = classify(&lookup.equipment, request.temperature, self.policy.unmonitored)?;
        let now = self.clock.now();
        let reading = TemperatureRecord {
            id: TemperatureRecordId::new(),
            equipment_id: lookup.equipment.id,
            store_id: lookup.equipment.store_id,
            temperature: request.temperature,
            recorded_at: now,
            recorded_by: request.recorded_by,
            notes,
            is_compliant: classification.is_compliant(),
        };

        let cascade = match classification {
            Classification::NonCompliant(range) => {
                let managers = self
                    .members
                    .users_with_role_in_store(lookup.equipment.store_id, &Role::MANAGEMENT)
                    .await
                    .map_err(ComplianceError::failed("failed to resolve store managers"))?;
                Some(self.build_cascade(&lookup, &reading, range, &managers, now))
            }
            Classification::Compliant(_) | Classification::Unmonitored => None,
        };
        let notified = cascade.as_ref().map_or(0, |c| c.notifications.len());

        self.store
            .commit_reading(ReadingWrite {
                reading: reading.clone(),
                cascade,
            })
            .await
            .map_err(ComplianceError::failed("failed to record temperature"))?;

        let outcome = match classification {
            Classification::Compliant(_) => "compliant",
            Classification::NonCompliant(_) => "non_compliant",
            Classification::Unmonitored => "unmonitored",
        };
        metrics::counter!("larder_temperature_readings_total", "outcome" => outcome).increment(1);
        if !reading.is_compliant {
            metrics::counter!("larder_compliance_cascades_total").increment(1);
            tracing::warn!(
                reading_id = %reading.id,
                store_id = %reading.store_id,
                temperature = reading.temperature,
                notified,
                "non-compliant temperature recorded"
            );
        } else {
            tracing::info!(reading_id = %reading.id, outcome, "temperature recorded");
        }

        let audit = AuditEntry::new(
            request.recorded_by,
            reading.store_id,
            AuditEvent::TemperatureRecorded {
                reading_id: reading.id,
                equipment_id: reading.equipment_id,
                equipment_name: lookup.equipment.name.clone(),
                temperature: reading.temperature,
                compliant: reading.is_compliant,
                monitored: !matches!(classification, Classification::Unmonitored),
                range: classification.range(),
            },
            now,
        );
        if let Err(err) = self.store.append_audit(audit).await {
            metrics::counter!("larder_audit_failures_total").increment(1);
            tracing::warn!(error = ?err, reading_id = %reading.id, "failed to append audit entry");
        }

        Ok(reading)
    }

    fn build_cascade(
        &self,
        lookup: &EquipmentLookup,
        reading: &TemperatureRecord,
        range: TemperatureRange,
        managers: &[UserId],
        now: DateTime<Utc>,
    ) -> Cascade {
        let name = &lookup.equipment.name;
        let temperature = format_degrees(reading.temperature);
        let band = range.display();

        let record = ComplianceRecord {
            id: ComplianceRecordId::new(),
            store_id: reading.store_id,
            kind: RecordKind::Temperature,
            status: RecordStatus::NonCompliant,
            notes: format!(
                "Non-compliant temperature: {name} recorded at {temperature}°C (acceptable: {band})"
            ),
            details: vec![
                RecordDetail::new("Equipment", name.clone()),
                RecordDetail::new("Temperature", format!("{temperature}°C")),
                RecordDetail::new("Acceptable Range", band.clone()),
                RecordDetail::new(
                    "Location",
                    lookup
                        .equipment
                        .location
                        .clone()
                        .unwrap_or_else(|| "N/A".to_string()),
                ),
            ],
            source_reading: reading.id,
            created_by: reading.recorded_by,
            created_at: now,
            reviewed_by: None,
            reviewed_at: None,
        };

        let action = CorrectiveAction {
            id: CorrectiveActionId::new(),
            record_id: record.id,
            store_id: reading.store_id,
            assignee: reading.recorded_by,
            description: format!(
                "Temperature out of range for {name}: {temperature}°C (expected: {band}). Check equipment and take corrective action."
            ),
            due_at: now + self.policy.action_due_after,
            status: ActionStatus::Pending,
            created_at: now,
            completed_at: None,
            completed_by: None,
        };

        let title = format!("Temperature Alert – {}", lookup.store_name);
        let message = format!(
            "{name} recorded at {temperature}°C (outside {band} range). Corrective action required."
        );
        let notifications = managers
            .iter()
            .map(|user_id| Notification {
                id: NotificationId::new(),
                user_id: *user_id,
                store_id: reading.store_id,
                kind: NotificationKind::TempAlert,
                title: title.clone(),
                message: message.clone(),
                action_url: self.policy.alert_url.clone(),
                read: false,
                created_at: now,
            })
            .collect();

        Cascade {
            record,
            action,
            notifications,
        }
    }

    /// Reading counts for `store` over one UTC day (today when `day` is `None`).
    pub async fn temperature_stats(
        &self,
        store: StoreId,
        day: Option<NaiveDate>,
    ) -> ComplianceResult<TemperatureStats> {
        let day = day.unwrap_or_else(|| self.clock.now().date_naive());
        let counts = self
            .store
            .count_readings(store, TimeWindow::day(day))
            .await
            .map_err(ComplianceError::failed("failed to load temperature stats"))?;
        let equipment_count = self
            .store
            .count_active_equipment(store)
            .await
            .map_err(ComplianceError::failed("failed to load temperature stats"))?;
        Ok(TemperatureStats {
            total_records: counts.total,
            non_compliant_records: counts.non_compliant,
            equipment_count,
            compliance_rate: compliance_rate(counts.total, counts.non_compliant),
        })
    }
}
