//! Core library for the packsmith packaging service.
//!
//! Turns a validated PWA description into a native app-store package by
//! driving an external TWA toolchain, tracking each build as a persisted
//! job, and assembling the downloadable archive.

pub mod archive;
pub mod bundler;
pub mod config;
pub mod job;
pub mod metrics;
pub mod options;
pub mod orchestrator;
pub mod poller;
pub mod progress;
pub mod testing;
pub mod workspace;

pub use archive::{archive_download_name, ArchiveAssembler, ArchiveError};
pub use bundler::{
    BundleRequest, Bundler, BundlerError, FetchFailureKind, GeneratedPackage, LocalSigningKey,
    Transport, TwaBundler,
};
pub use config::{
    load_config, load_config_from_str, validate_config, BuilderToolConfig, Config, ConfigError,
    DatabaseConfig, SanitizedConfig, ServerConfig, WorkspaceConfig,
};
pub use job::{Job, JobError, JobFilter, JobStatus, JobStore, SqliteJobStore};
pub use options::{
    normalize_options, validate_options, with_safe_urls, DisplayMode, FallbackType, Orientation,
    PackageOptions, SigningMode, SigningOptions, ValidationError, ValidationIssue,
};
pub use orchestrator::{BuildOrchestrator, OrchestratorConfig, OrchestratorError, OrchestratorStatus};
pub use poller::{HttpJobApi, JobApi, JobApiError, JobPoller, PollOutcome, PollReport, PollerConfig};
pub use progress::{ProgressEvent, ProgressHandle, ProgressLevel};
pub use workspace::{CleanupHandle, WorkspaceStore};
