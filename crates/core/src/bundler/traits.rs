//! Trait definitions for the bundler module.

use async_trait::async_trait;

use super::error::BundlerError;
use super::types::{BundleRequest, GeneratedPackage};

/// A bundler that can turn package options into native app artifacts.
///
/// Contract: one invocation per call, no internal retries (the fallback
/// policy is the orchestrator's), and no partially-written files in the
/// returned artifact set on failure.
#[async_trait]
pub trait Bundler: Send + Sync {
    /// Returns the name of this bundler implementation.
    fn name(&self) -> &str;

    /// Generates the app package in the request's workspace.
    async fn generate(&self, request: BundleRequest) -> Result<GeneratedPackage, BundlerError>;

    /// Validates that the bundler is properly configured and ready.
    async fn validate(&self) -> Result<(), BundlerError>;
}
