//! Common test utilities for E2E testing with mocks.
//!
//! Provides an in-process server wired to a mock toolchain, enabling full
//! API testing without external infrastructure.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use packsmith_core::{
    testing::MockBundler, BuildOrchestrator, BuilderToolConfig, Config, DatabaseConfig,
    JobStore, OrchestratorConfig, ServerConfig, SqliteJobStore, WorkspaceConfig, WorkspaceStore,
};
use packsmith_server::api::create_router;
use packsmith_server::state::AppState;

/// Test fixture for E2E testing with a mock toolchain.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock bundler - control build outcomes
    pub bundler: Arc<MockBundler>,
    /// The orchestrator backing the server
    pub orchestrator: BuildOrchestrator,
    /// Temporary directory for test database and workspaces
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Raw response for binary endpoints
#[derive(Debug)]
pub struct RawTestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub bytes: Vec<u8>,
}

impl TestFixture {
    /// Create a new test fixture. The queue worker is not started; call
    /// `start_worker` in tests that exercise the asynchronous path.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");

        let bundler = Arc::new(MockBundler::new());

        let config = Config {
            server: ServerConfig {
                host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                port: 0, // Not used for in-process testing
            },
            database: DatabaseConfig {
                path: db_path.clone(),
            },
            workspace: WorkspaceConfig {
                root: temp_dir.path().join("work"),
                cleanup_grace_secs: 3600,
                archive_grace_secs: 3600,
            },
            builder: BuilderToolConfig::default(),
            orchestrator: OrchestratorConfig {
                enabled: true,
                queue_poll_interval_ms: 25,
            },
        };

        let job_store: Arc<dyn JobStore> = Arc::new(
            SqliteJobStore::new(&db_path).expect("Failed to create job store"),
        );

        let workspaces = WorkspaceStore::new(&config.workspace);

        let orchestrator = BuildOrchestrator::new(
            config.orchestrator.clone(),
            config.builder.clone(),
            Arc::clone(&job_store),
            Arc::clone(&bundler) as Arc<dyn packsmith_core::Bundler>,
            workspaces,
        );

        let metrics_registry = prometheus::Registry::new();
        for metric in packsmith_core::metrics::all_metrics() {
            let _ = metrics_registry.register(metric);
        }

        let state = Arc::new(AppState::new(
            config,
            job_store,
            orchestrator.clone(),
            metrics_registry,
        ));

        let router = create_router(state);

        Self {
            router,
            bundler,
            orchestrator,
            temp_dir,
        }
    }

    /// Start the background queue worker.
    pub async fn start_worker(&self) {
        self.orchestrator.start().await;
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a GET request and return the raw bytes (for downloads).
    pub async fn get_raw(&self, path: &str) -> RawTestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let content_type = header_string(&response, "content-type");
        let content_disposition = header_string(&response, "content-disposition");

        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        RawTestResponse {
            status,
            content_type,
            content_disposition,
            bytes,
        }
    }

    /// Send a POST request with JSON body and return the raw bytes.
    pub async fn post_raw(&self, path: &str, body: Value) -> RawTestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let content_type = header_string(&response, "content-type");
        let content_disposition = header_string(&response, "content-disposition");

        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        RawTestResponse {
            status,
            content_type,
            content_disposition,
            bytes,
        }
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}

fn header_string(response: &axum::response::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// A structurally valid unsigned package request as a JSON body.
pub fn unsigned_options_json(host: &str) -> Value {
    serde_json::to_value(packsmith_core::testing::fixtures::unsigned_options(host)).unwrap()
}
