//! Mock bundler for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::bundler::{
    BundleRequest, Bundler, BundlerError, GeneratedPackage, LocalSigningKey,
};

/// A recorded bundler invocation for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedInvocation {
    /// The request that was submitted.
    pub request: BundleRequest,
    /// Whether the invocation succeeded.
    pub success: bool,
}

/// Mock implementation of the Bundler trait.
///
/// Provides controllable behavior for testing:
/// - Records every invocation for assertions
/// - Queued errors are returned in order; with the queue empty the
///   invocation succeeds and writes plausible artifacts into the workspace
/// - Simulated build duration
///
/// # Example
///
/// ```rust,ignore
/// use packsmith_core::testing::MockBundler;
///
/// let bundler = MockBundler::new();
/// bundler.push_error(BundlerError::AssetFetch { /* 403 */ }).await;
///
/// // First generate() fails with the queued error, the second succeeds.
/// let recorded = bundler.recorded_invocations().await;
/// assert_eq!(recorded.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockBundler {
    invocations: Arc<RwLock<Vec<RecordedInvocation>>>,
    queued_errors: Arc<RwLock<VecDeque<BundlerError>>>,
    build_duration_ms: Arc<RwLock<u64>>,
}

impl MockBundler {
    /// Create a new mock bundler that succeeds on every invocation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error; each queued error fails exactly one invocation, in
    /// FIFO order.
    pub async fn push_error(&self, error: BundlerError) {
        self.queued_errors.write().await.push_back(error);
    }

    /// Set the simulated build duration.
    pub async fn set_build_duration(&self, duration: Duration) {
        *self.build_duration_ms.write().await = duration.as_millis() as u64;
    }

    /// Get all recorded invocations.
    pub async fn recorded_invocations(&self) -> Vec<RecordedInvocation> {
        self.invocations.read().await.clone()
    }

    /// Get the number of invocations performed.
    pub async fn invocation_count(&self) -> usize {
        self.invocations.read().await.len()
    }

    /// Write the artifacts a real toolchain run would leave behind.
    async fn write_artifacts(
        request: &BundleRequest,
    ) -> Result<GeneratedPackage, BundlerError> {
        let ws = &request.workspace;
        if !ws.is_dir() {
            return Err(BundlerError::InvalidRequest(format!(
                "workspace {} does not exist",
                ws.display()
            )));
        }

        let signing: Option<LocalSigningKey> = request.signing.clone();

        let apk_name = if signing.is_some() {
            "app-release-signed.apk"
        } else {
            "app-release-unsigned.apk"
        };
        let apk_path = ws.join(apk_name);
        tokio::fs::write(&apk_path, b"mock apk bytes").await?;

        let app_bundle_path = ws.join("app-release-bundle.aab");
        tokio::fs::write(&app_bundle_path, b"mock aab bytes").await?;

        let asset_links_path = if signing.is_some() {
            let path = ws.join("assetlinks.json");
            tokio::fs::write(&path, b"[]").await?;
            Some(path)
        } else {
            None
        };

        if let Some(ref key) = signing {
            if !key.key_file_path.exists() {
                tokio::fs::write(&key.key_file_path, b"mock keystore bytes").await?;
            }
        }

        Ok(GeneratedPackage {
            apk_path,
            app_bundle_path: Some(app_bundle_path),
            asset_links_path,
            signing,
            project_dir: ws.clone(),
        })
    }
}

#[async_trait]
impl Bundler for MockBundler {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: BundleRequest) -> Result<GeneratedPackage, BundlerError> {
        let duration_ms = *self.build_duration_ms.read().await;
        if duration_ms > 0 {
            tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        }

        if let Some(error) = self.queued_errors.write().await.pop_front() {
            self.invocations.write().await.push(RecordedInvocation {
                request,
                success: false,
            });
            return Err(error);
        }

        let package = Self::write_artifacts(&request).await?;
        self.invocations.write().await.push(RecordedInvocation {
            request,
            success: true,
        });
        Ok(package)
    }

    async fn validate(&self) -> Result<(), BundlerError> {
        Ok(())
    }
}
