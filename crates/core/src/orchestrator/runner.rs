//! Build orchestrator implementation.
//!
//! One job, end to end: workspace allocation, signing preparation, the
//! bundler invocation with its single safe-URL fallback retry, archive
//! assembly, the terminal job record, and unconditional cleanup
//! scheduling. Also hosts the queue worker loop for builds submitted
//! asynchronously.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::archive::ArchiveAssembler;
use crate::bundler::{
    BundleRequest, Bundler, BundlerError, GeneratedPackage, LocalSigningKey, Transport,
};
use crate::config::BuilderToolConfig;
use crate::job::{Job, JobFilter, JobStatus, JobStore};
use crate::metrics;
use crate::options::{
    normalize_options, validate_options, with_safe_urls, PackageOptions, SigningMode,
    ValidationError,
};
use crate::progress::ProgressHandle;
use crate::workspace::WorkspaceStore;

use super::config::OrchestratorConfig;
use super::types::{OrchestratorError, OrchestratorStatus};

/// File name used for keystores staged inside a workspace.
const KEYSTORE_FILE: &str = "signing.keystore";

/// The build orchestrator.
///
/// Cheaply cloneable; clones share the job store, the running flag and the
/// shutdown channel, which is how the queue worker task is spawned.
#[derive(Clone)]
pub struct BuildOrchestrator {
    config: OrchestratorConfig,
    builder_config: BuilderToolConfig,
    job_store: Arc<dyn JobStore>,
    bundler: Arc<dyn Bundler>,
    workspaces: WorkspaceStore,
    assembler: ArchiveAssembler,
    progress: ProgressHandle,

    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl BuildOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: OrchestratorConfig,
        builder_config: BuilderToolConfig,
        job_store: Arc<dyn JobStore>,
        bundler: Arc<dyn Bundler>,
        workspaces: WorkspaceStore,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            config,
            builder_config,
            job_store,
            bundler,
            workspaces,
            assembler: ArchiveAssembler::new(),
            progress: ProgressHandle::default(),
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    /// The progress event handle; subscribe for live build feedback.
    pub fn progress(&self) -> &ProgressHandle {
        &self.progress
    }

    /// The job store this orchestrator writes to.
    pub fn job_store(&self) -> &Arc<dyn JobStore> {
        &self.job_store
    }

    /// Validate options and enqueue a job for the background worker.
    ///
    /// Fails fast with every violated constraint; no job record is created
    /// for invalid input.
    pub fn enqueue(&self, options: PackageOptions) -> Result<Job, OrchestratorError> {
        let options = Self::validated(options)?;
        let job = self.job_store.create(options, JobStatus::Queued)?;
        let job = self.job_store.append_log(&job.id, "job queued")?;

        info!("Enqueued package job {}", job.id);
        Ok(job)
    }

    /// Run one build inline, from options to a terminal job record.
    ///
    /// The returned job is `Completed`; build and archive failures surface
    /// as classified errors after the terminal `Failed` record has been
    /// written (fetch the job by id for its full logs).
    pub async fn run_build(&self, options: PackageOptions) -> Result<Job, OrchestratorError> {
        let options = Self::validated(options)?;
        let job = self.job_store.create(options, JobStatus::InProgress)?;
        self.run_claimed(job).await
    }

    /// Start the queue worker (spawns the background loop).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Orchestrator already running");
            return;
        }

        info!("Starting build queue worker");
        let worker = self.clone();
        tokio::spawn(async move {
            worker.queue_loop().await;
        });
    }

    /// Stop the queue worker gracefully.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Orchestrator not running");
            return;
        }

        info!("Stopping build queue worker");
        let _ = self.shutdown_tx.send(());
    }

    /// Get current orchestrator status.
    pub async fn status(&self) -> OrchestratorStatus {
        let count = |status: JobStatus| {
            self.job_store
                .count(&JobFilter::new().with_status(status))
                .unwrap_or(0) as usize
        };

        OrchestratorStatus {
            running: self.running.load(Ordering::Relaxed),
            queued_count: count(JobStatus::Queued),
            in_progress_count: count(JobStatus::InProgress),
            completed_count: count(JobStatus::Completed),
            failed_count: count(JobStatus::Failed),
        }
    }

    /// The queue worker loop: claim one queued job at a time and run it.
    async fn queue_loop(&self) {
        info!("Build queue worker started");
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let interval = Duration::from_millis(self.config.queue_poll_interval_ms);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Build queue worker received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    if !self.running.load(Ordering::Relaxed) {
                        break;
                    }
                    if let Err(e) = self.process_next_queued().await {
                        warn!("Queue worker error: {}", e);
                    }
                }
            }
        }
        info!("Build queue worker stopped");
    }

    /// Claim and run the oldest queued job, if any.
    async fn process_next_queued(&self) -> Result<(), OrchestratorError> {
        let Some(job) = self.job_store.claim_next_queued()? else {
            return Ok(()); // Nothing to do
        };

        debug!("Claimed queued job {}", job.id);
        match self.run_claimed(job).await {
            Ok(job) => info!("Job {} completed", job.id),
            // The terminal record is already written; the loop keeps going.
            Err(e) => warn!("Job failed ({}): {}", e.category(), e),
        }

        Ok(())
    }

    /// Run a job that is already `InProgress` through to a terminal state.
    async fn run_claimed(&self, job: Job) -> Result<Job, OrchestratorError> {
        let started = Instant::now();
        let job_id = job.id.clone();

        self.progress.info(&job_id, "creating workspace");
        let workspace = match self.workspaces.create_workspace().await {
            Ok(path) => path,
            Err(e) => {
                let _ = self.job_store.fail(
                    &job_id,
                    vec![format!("workspace error: {}", e)],
                    "build failed: could not allocate workspace",
                );
                metrics::BUILDS_TOTAL.with_label_values(&["failed"]).inc();
                return Err(OrchestratorError::Workspace(e));
            }
        };
        let _ = self
            .job_store
            .append_log(&job_id, &format!("workspace created at {}", workspace.display()));

        // Everything after this point funnels through one result so that
        // cleanup scheduling runs exactly once, on every path.
        let result = self.build_in_workspace(&job, &workspace).await;
        self.workspaces.schedule_cleanup(workspace);

        let duration = started.elapsed();
        match result {
            Ok((package, archive_path)) => {
                let terminal = self.job_store.complete(
                    &job_id,
                    package.artifact_paths(),
                    Some(archive_path.to_string_lossy().to_string()),
                    &format!(
                        "package created successfully in {}s",
                        duration.as_secs()
                    ),
                )?;

                self.progress
                    .info(&job_id, "package created successfully");
                metrics::BUILDS_TOTAL.with_label_values(&["completed"]).inc();
                metrics::BUILD_DURATION
                    .with_label_values(&["completed"])
                    .observe(duration.as_secs_f64());

                Ok(terminal)
            }
            Err(build_error) => {
                let (errors, orchestrator_error) = match build_error {
                    BuildPhaseError::Bundler(source) => (
                        vec![format!("{} error: {}", bundler_error_class(&source), source)],
                        OrchestratorError::Build {
                            job_id: job_id.clone(),
                            source,
                        },
                    ),
                    BuildPhaseError::Archive(source) => (
                        vec![format!("archive error: {}", source)],
                        OrchestratorError::Archive {
                            job_id: job_id.clone(),
                            source,
                        },
                    ),
                    BuildPhaseError::Store(e) => {
                        error!("Job store failure while building {}: {}", job_id, e);
                        return Err(OrchestratorError::JobStore(e));
                    }
                };

                let message = errors.join("; ");
                self.progress.error(&job_id, format!("error: {}", message));
                let _ = self.job_store.fail(
                    &job_id,
                    errors,
                    &format!("build failed: {}", message),
                );

                metrics::BUILDS_TOTAL.with_label_values(&["failed"]).inc();
                metrics::BUILD_DURATION
                    .with_label_values(&["failed"])
                    .observe(duration.as_secs_f64());

                Err(orchestrator_error)
            }
        }
    }

    /// Build and archive inside an allocated workspace.
    async fn build_in_workspace(
        &self,
        job: &Job,
        workspace: &Path,
    ) -> Result<(GeneratedPackage, PathBuf), BuildPhaseError> {
        let signing = self
            .prepare_signing(&job.options, workspace)
            .await
            .map_err(BuildPhaseError::Bundler)?;

        let package = self
            .generate_with_fallback(job, workspace, signing)
            .await?;

        self.progress.info(&job.id, "assembling archive");
        self.job_store
            .append_log(&job.id, "assembling downloadable archive")
            .map_err(BuildPhaseError::Store)?;

        let archive_path = self
            .workspaces
            .archive_dir()
            .join(format!("{}.zip", job.id));

        match self
            .assembler
            .assemble(&package, &job.options, &archive_path)
        {
            Ok(path) => {
                metrics::ARCHIVES_ASSEMBLED
                    .with_label_values(&["success"])
                    .inc();
                self.workspaces.schedule_file_cleanup(path.clone());
                Ok((package, path))
            }
            Err(e) => {
                metrics::ARCHIVES_ASSEMBLED
                    .with_label_values(&["error"])
                    .inc();
                Err(BuildPhaseError::Archive(e))
            }
        }
    }

    /// Invoke the bundler, retrying exactly once through the safe-URL proxy
    /// on a recoverable asset-fetch failure.
    async fn generate_with_fallback(
        &self,
        job: &Job,
        workspace: &Path,
        signing: Option<LocalSigningKey>,
    ) -> Result<GeneratedPackage, BuildPhaseError> {
        self.progress.info(&job.id, "invoking builder");
        self.job_store
            .append_log(&job.id, "invoking native builder (primary transport)")
            .map_err(BuildPhaseError::Store)?;

        let request = BundleRequest {
            job_id: job.id.clone(),
            options: job.options.clone(),
            transport: Transport::Primary,
            workspace: workspace.to_path_buf(),
            signing: signing.clone(),
        };

        let first_error = match self.bundler.generate(request).await {
            Ok(package) => {
                metrics::BUNDLER_INVOCATIONS
                    .with_label_values(&["primary", "success"])
                    .inc();
                return Ok(package);
            }
            Err(e) => {
                metrics::BUNDLER_INVOCATIONS
                    .with_label_values(&["primary", "error"])
                    .inc();
                e
            }
        };

        if !first_error.is_recoverable() {
            // Not an upstream-blocked asset fetch; no second attempt.
            return Err(BuildPhaseError::Bundler(first_error));
        }

        // An upstream host refused us the asset. Reroute every absolute-URL
        // option through the safe-URL proxy and try once more with the
        // HTTP/2-capable client.
        self.progress
            .warn(&job.id, "retrying with safe-url proxy");
        self.job_store
            .append_log(
                &job.id,
                &format!(
                    "recoverable fetch failure ({}), retrying with safe-URL proxy and fallback transport",
                    first_error
                ),
            )
            .map_err(BuildPhaseError::Store)?;
        self.job_store
            .increment_retry(&job.id)
            .map_err(BuildPhaseError::Store)?;
        metrics::FALLBACK_RETRIES.inc();

        let proxied_options = with_safe_urls(&job.options, &self.builder_config.proxy_base_url);
        let retry_request = BundleRequest {
            job_id: job.id.clone(),
            options: proxied_options,
            transport: Transport::Fallback,
            workspace: workspace.to_path_buf(),
            signing,
        };

        match self.bundler.generate(retry_request).await {
            Ok(package) => {
                metrics::BUNDLER_INVOCATIONS
                    .with_label_values(&["fallback", "success"])
                    .inc();
                Ok(package)
            }
            Err(e) => {
                metrics::BUNDLER_INVOCATIONS
                    .with_label_values(&["fallback", "error"])
                    .inc();
                // Second failure of any class is terminal.
                Err(BuildPhaseError::Bundler(e))
            }
        }
    }

    /// Stage local signing key material in the workspace.
    ///
    /// For `mine` mode the uploaded keystore is decoded and written here;
    /// for `new` mode only the target path is chosen (the bundler creates
    /// the key via keytool).
    async fn prepare_signing(
        &self,
        options: &PackageOptions,
        workspace: &Path,
    ) -> Result<Option<LocalSigningKey>, BundlerError> {
        if options.signing_mode == SigningMode::None {
            return Ok(None);
        }

        let Some(ref signing) = options.signing else {
            // Validation guarantees this; guarded anyway for direct callers.
            return Err(BundlerError::InvalidRequest(format!(
                "signing mode is '{}' but no signing options were supplied",
                options.signing_mode.as_str()
            )));
        };

        let key_file_path = workspace.join(KEYSTORE_FILE);

        if options.signing_mode == SigningMode::Mine {
            let encoded = signing.key_file_base64.as_deref().ok_or_else(|| {
                BundlerError::InvalidRequest(
                    "signing mode is 'mine' but no signing key file was supplied".to_string(),
                )
            })?;
            let bytes = decode_keystore_data_uri(encoded)?;
            tokio::fs::write(&key_file_path, bytes).await?;
        }

        Ok(Some(LocalSigningKey {
            key_file_path,
            options: signing.clone(),
        }))
    }

    fn validated(options: PackageOptions) -> Result<PackageOptions, OrchestratorError> {
        let issues = validate_options(&options);
        if !issues.is_empty() {
            metrics::VALIDATION_REJECTIONS.inc();
            return Err(OrchestratorError::Validation(ValidationError { issues }));
        }
        Ok(normalize_options(options))
    }
}

/// Internal per-phase error, folded into `OrchestratorError` once the
/// terminal record has been written.
enum BuildPhaseError {
    Bundler(BundlerError),
    Archive(crate::archive::ArchiveError),
    Store(crate::job::JobError),
}

fn bundler_error_class(error: &BundlerError) -> &'static str {
    match error {
        BundlerError::AssetFetch { kind, .. } if kind.is_recoverable() => {
            "network (recoverable)"
        }
        BundlerError::AssetFetch { .. } => "network",
        BundlerError::Timeout { .. } => "timeout",
        BundlerError::Io(_) => "io",
        BundlerError::InvalidRequest(_) => "request",
        _ => "toolchain",
    }
}

/// Decodes an uploaded keystore sent as a base64 `data:` URI.
fn decode_keystore_data_uri(data_uri: &str) -> Result<Vec<u8>, BundlerError> {
    let payload = data_uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once("base64,"))
        .map(|(_, payload)| payload)
        .ok_or_else(|| {
            BundlerError::InvalidRequest(
                "signing key file must be a base64 data URI".to_string(),
            )
        })?;

    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| {
            BundlerError::InvalidRequest(format!("signing key file is not valid base64: {}", e))
        })
}
