//! Types for the bundler module.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::options::{PackageOptions, SigningOptions};

/// Which HTTP client the bundler uses to fetch remote assets.
///
/// `Primary` mirrors a plain HTTP/1.1 fetcher. `Fallback` negotiates
/// HTTP/2, which some origins require; the orchestrator switches to it
/// together with the safe-URL proxy rewrite after a recoverable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    Primary,
    Fallback,
}

impl Transport {
    /// Short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Primary => "primary",
            Transport::Fallback => "fallback",
        }
    }
}

/// Prepared local signing key material for one build.
///
/// For `mine` mode the keystore file has already been written into the
/// workspace by the orchestrator; for `new` mode the bundler creates it
/// via keytool at this path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalSigningKey {
    /// Path of the keystore file inside the workspace.
    pub key_file_path: PathBuf,
    /// The signing details (alias, passwords, signer identity).
    pub options: SigningOptions,
}

/// One bundler invocation.
#[derive(Debug, Clone)]
pub struct BundleRequest {
    /// Job this invocation belongs to (for logs and progress events).
    pub job_id: String,
    /// The validated, normalized package options.
    pub options: PackageOptions,
    /// Asset fetch transport to use.
    pub transport: Transport,
    /// The job's exclusive workspace directory.
    pub workspace: PathBuf,
    /// Prepared signing material, if signing was requested.
    pub signing: Option<LocalSigningKey>,
}

/// The files produced by a successful bundler invocation.
///
/// Every path has been verified to exist before this struct is returned;
/// partially-written files never leak into the artifact set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPackage {
    /// The installable package (APK).
    pub apk_path: PathBuf,
    /// The store-upload bundle (AAB), when the toolchain produced one.
    pub app_bundle_path: Option<PathBuf>,
    /// The digital asset links file, produced only for signed packages.
    pub asset_links_path: Option<PathBuf>,
    /// Signing material used, if the package was signed.
    pub signing: Option<LocalSigningKey>,
    /// The project directory the toolchain generated (for source export).
    pub project_dir: PathBuf,
}

impl GeneratedPackage {
    /// Returns true when the package was signed.
    pub fn is_signed(&self) -> bool {
        self.signing.is_some()
    }

    /// All produced file paths, for recording on the job.
    pub fn artifact_paths(&self) -> Vec<String> {
        let mut paths = vec![self.apk_path.to_string_lossy().to_string()];
        if let Some(ref aab) = self.app_bundle_path {
            paths.push(aab.to_string_lossy().to_string());
        }
        if let Some(ref links) = self.asset_links_path {
            paths.push(links.to_string_lossy().to_string());
        }
        paths
    }
}
