use axum::http::StatusCode;
use axum::routing::RouterIntoService;
use chrono::{DateTime, Duration, TimeZone, Utc};
use larder_compliance::{Clock, EvaluatorPolicy};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use tracker::app::{AppState, build_router};
use tracker::store::TrackerStore;
use tracker::store::memory::InMemoryStore;

pub type App = RouterIntoService<axum::body::Body, ()>;

pub async fn read_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

/// Clock pinned to 2026-03-14 09:30 UTC until a test moves it.
pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub async fn app_with<S>(backend: Arc<S>, clock: Arc<TestClock>, policy: EvaluatorPolicy) -> App
where
    S: TrackerStore + 'static,
{
    let state = AppState::build(backend, clock, policy)
        .await
        .expect("state");
    build_router(state).into_service()
}

pub async fn memory_app(clock: Arc<TestClock>) -> (App, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    let app = app_with(store.clone(), clock, EvaluatorPolicy::default()).await;
    (app, store)
}

pub async fn send(
    app: &App,
    request: axum::http::Request<axum::body::Body>,
) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    (status, read_json(response).await)
}
