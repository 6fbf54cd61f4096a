//! Observability wiring for the tracker service.
//!
//! # Purpose
//! Initializes tracing, OpenTelemetry propagation, and the Prometheus metrics
//! listener, and registers descriptions for the compliance metrics.
//!
//! # Notes
//! Initialization is guarded by `OnceLock` so tests can call it repeatedly.
//! Span export is only attempted when `OTEL_EXPORTER_OTLP_ENDPOINT` is set; a
//! kitchen deployment without a collector logs to stdout and nothing else.
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::propagation::Extractor;
use opentelemetry::trace::TracerProvider;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const OTLP_ENDPOINT_ENV: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static SUBSCRIBER_INIT: OnceLock<()> = OnceLock::new();
static PROPAGATOR_INIT: OnceLock<()> = OnceLock::new();

/// Install the subscriber, propagator, and metrics recorder once per process
/// and return the handle the `/metrics` listener renders from.
pub fn init_observability(service_name: &str) -> PrometheusHandle {
    install_propagator();
    SUBSCRIBER_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer());
        match span_exporter(service_name) {
            Some(provider) => {
                let tracer = provider.tracer(service_name.to_string());
                global::set_tracer_provider(provider);
                let _ = registry
                    .with(tracing_opentelemetry::layer().with_tracer(tracer))
                    .try_init();
            }
            None => {
                let _ = registry.try_init();
            }
        }
    });

    let handle = install_metrics_recorder();
    describe_compliance_metrics();
    handle
}

fn install_propagator() {
    PROPAGATOR_INIT.get_or_init(|| {
        global::set_text_map_propagator(TraceContextPropagator::new());
    });
}

fn describe_compliance_metrics() {
    metrics::describe_counter!(
        "larder_temperature_readings_total",
        "Temperature readings recorded, labelled by outcome"
    );
    metrics::describe_counter!(
        "larder_compliance_cascades_total",
        "Non-compliant readings that produced a record, action, and alerts"
    );
    metrics::describe_counter!(
        "larder_audit_failures_total",
        "Audit entries that could not be written"
    );
    metrics::describe_gauge!(
        "larder_equipment_active",
        "Active equipment across all stores"
    );
}

fn span_exporter(service_name: &str) -> Option<SdkTracerProvider> {
    std::env::var(OTLP_ENDPOINT_ENV).ok()?;
    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .build()
    {
        Ok(exporter) => exporter,
        Err(err) => {
            eprintln!("larder: otlp span exporter disabled: {err}");
            return None;
        }
    };
    let resource = Resource::builder_empty()
        .with_attributes(resource_attributes(service_name))
        .build();
    Some(
        SdkTracerProvider::builder()
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build(),
    )
}

/// `service.instance.id` prefers `LARDER_SERVICE_INSTANCE_ID` and falls back to
/// the container hostname; the franchise label groups stores of one operator.
fn resource_attributes(service_name: &str) -> Vec<KeyValue> {
    let optional = [
        (
            "service.instance.id",
            std::env::var("LARDER_SERVICE_INSTANCE_ID").or_else(|_| std::env::var("HOSTNAME")),
        ),
        ("larder.franchise", std::env::var("LARDER_FRANCHISE")),
        (
            "deployment.environment",
            std::env::var("DEPLOYMENT_ENVIRONMENT"),
        ),
    ];
    std::iter::once(KeyValue::new("service.name", service_name.to_string()))
        .chain(
            optional
                .into_iter()
                .filter_map(|(key, value)| value.ok().map(|value| KeyValue::new(key, value))),
        )
        .collect()
}

/// Parent context for a request span, taken from W3C `traceparent`/`tracestate`.
pub fn trace_context_from_headers(headers: &axum::http::HeaderMap) -> opentelemetry::Context {
    install_propagator();
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderMapExtractor(headers)))
}

struct HeaderMapExtractor<'a>(&'a axum::http::HeaderMap);

impl Extractor for HeaderMapExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}

fn metrics_router(handle: PrometheusHandle) -> axum::Router {
    axum::Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let body = handle.render();
            async move { body }
        }),
    )
}

pub async fn serve_metrics(handle: PrometheusHandle, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics listening");
    serve_metrics_with_listener(handle, listener, std::future::pending()).await
}

async fn serve_metrics_with_listener<F>(
    handle: PrometheusHandle,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, metrics_router(handle).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}

fn install_metrics_recorder() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let recorder = PrometheusBuilder::new().build_recorder();
            let handle = recorder.handle();
            if let Err(err) = metrics::set_global_recorder(recorder) {
                // Another recorder owns the process; this handle renders nothing.
                tracing::warn!(error = %err, "metrics recorder already installed");
            }
            handle
        })
        .clone()
}
