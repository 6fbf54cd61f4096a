//! Tracker HTTP application wiring.
//!
//! # Purpose
//! Builds the Axum router, configures middleware, and defines the shared
//! application state injected into handlers.
//!
//! # Notes
//! The evaluator and the CRUD handlers share one backend instance, so a reading
//! recorded through the evaluator is immediately visible to every listing.
use crate::api;
use crate::api::openapi::ApiDoc;
use crate::api::types::FeatureFlags;
use crate::auth::rbac::Authorizer;
use crate::observability;
use crate::store::TrackerStore;
use axum::Router;
use larder_compliance::{Clock, ComplianceEvaluator, EvaluatorPolicy, UnmonitoredPolicy};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use utoipa::OpenApi;

#[derive(Clone)]
pub struct AppState {
    pub api_version: String,
    pub features: FeatureFlags,
    pub store: Arc<dyn TrackerStore>,
    pub evaluator: ComplianceEvaluator,
    pub authorizer: Authorizer,
}

impl AppState {
    /// Wire the evaluator and handlers to `backend` and build the RBAC enforcer.
    pub async fn build<S>(
        backend: Arc<S>,
        clock: Arc<dyn Clock>,
        policy: EvaluatorPolicy,
    ) -> anyhow::Result<Self>
    where
        S: TrackerStore + 'static,
    {
        let features = FeatureFlags {
            durable_storage: backend.is_durable(),
            unmonitored_policy: policy_name(policy.unmonitored).to_string(),
        };
        let evaluator = ComplianceEvaluator::with_backend(backend.clone(), clock, policy);
        let authorizer = Authorizer::build().await?;
        Ok(Self {
            api_version: "v1".to_string(),
            features,
            store: backend,
            evaluator,
            authorizer,
        })
    }
}

fn policy_name(policy: UnmonitoredPolicy) -> &'static str {
    match policy {
        UnmonitoredPolicy::DefaultBand => "default_band",
        UnmonitoredPolicy::Skip => "skip",
        UnmonitoredPolicy::Reject => "reject",
    }
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer =
        TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
            let parent = observability::trace_context_from_headers(request.headers());
            let span = tracing::info_span!(
                "http.request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version()
            );
            span.set_parent(parent);
            span
        });

    Router::new()
        .route(
            "/v1/system/info",
            axum::routing::get(api::system::system_info),
        )
        .route(
            "/v1/system/health",
            axum::routing::get(api::system::system_health),
        )
        .route(
            "/v1/stores",
            axum::routing::get(api::stores::list_stores).post(api::stores::create_store),
        )
        .route(
            "/v1/stores/:store_id/members",
            axum::routing::get(api::stores::list_members).post(api::stores::add_member),
        )
        .route(
            "/v1/stores/:store_id/equipment",
            axum::routing::get(api::equipment::list_equipment)
                .post(api::equipment::create_equipment),
        )
        .route(
            "/v1/stores/:store_id/temperatures",
            axum::routing::get(api::temperatures::list_temperatures),
        )
        .route(
            "/v1/stores/:store_id/temperature-stats",
            axum::routing::get(api::temperatures::temperature_stats),
        )
        .route(
            "/v1/stores/:store_id/compliance-records",
            axum::routing::get(api::records::list_compliance_records),
        )
        .route(
            "/v1/stores/:store_id/corrective-actions",
            axum::routing::get(api::actions::list_corrective_actions),
        )
        .route(
            "/v1/stores/:store_id/audit",
            axum::routing::get(api::audit::list_audit),
        )
        .route(
            "/v1/equipment/:equipment_id/deactivate",
            axum::routing::post(api::equipment::deactivate_equipment),
        )
        .route(
            "/v1/equipment/:equipment_id/temperatures",
            axum::routing::post(api::temperatures::record_temperature),
        )
        .route(
            "/v1/compliance-records/:record_id/review",
            axum::routing::post(api::records::review_compliance_record),
        )
        .route(
            "/v1/corrective-actions/:action_id/complete",
            axum::routing::post(api::actions::complete_corrective_action),
        )
        .route(
            "/v1/notifications",
            axum::routing::get(api::notifications::list_notifications),
        )
        .route(
            "/v1/notifications/:notification_id/read",
            axum::routing::post(api::notifications::mark_notification_read),
        )
        .merge(
            utoipa_swagger_ui::SwaggerUi::new("/docs").url("/v1/openapi.json", ApiDoc::openapi()),
        )
        .layer(trace_layer)
        .with_state(state)
}
