//! Error types for the bundler module.

use std::path::PathBuf;
use thiserror::Error;

/// How a remote asset fetch failed.
///
/// Classification is structural (HTTP status / io error kind) rather than
/// substring matching on rendered messages, so the recoverable set stays
/// stable across transport library upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailureKind {
    /// The upstream host answered 403 Forbidden.
    Forbidden,
    /// TCP connection to the host was refused.
    ConnectionRefused,
    /// DNS lookup for the host failed.
    HostNotFound,
    /// The fetch timed out.
    Timeout,
    /// Any other fetch failure (4xx/5xx other than 403, protocol errors).
    Other,
}

impl FetchFailureKind {
    /// Whether proxying the fetch through the safe-URL service is known to
    /// fix this failure class.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            FetchFailureKind::Forbidden
                | FetchFailureKind::ConnectionRefused
                | FetchFailureKind::HostNotFound
        )
    }

    /// Short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchFailureKind::Forbidden => "forbidden",
            FetchFailureKind::ConnectionRefused => "connection_refused",
            FetchFailureKind::HostNotFound => "host_not_found",
            FetchFailureKind::Timeout => "timeout",
            FetchFailureKind::Other => "other",
        }
    }
}

/// Errors that can occur while generating an app package.
#[derive(Debug, Error)]
pub enum BundlerError {
    /// A referenced remote asset (icon, web manifest) could not be fetched.
    #[error("failed to fetch asset {url}: {kind:?}{}", detail.as_deref().map(|d| format!(" ({})", d)).unwrap_or_default())]
    AssetFetch {
        url: String,
        kind: FetchFailureKind,
        detail: Option<String>,
    },

    /// The builder CLI binary was not found.
    #[error("builder not found at path: {path}")]
    BuilderNotFound { path: PathBuf },

    /// The keytool binary was not found.
    #[error("keytool not found at path: {path}")]
    KeytoolNotFound { path: PathBuf },

    /// Creating a new signing key failed.
    #[error("keytool failed: {reason}")]
    KeytoolFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The native toolchain itself reported failure.
    #[error("toolchain failed: {reason}")]
    Toolchain {
        reason: String,
        stderr: Option<String>,
    },

    /// The builder invocation timed out.
    #[error("build timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The request was structurally unusable (missing workspace, missing
    /// signing material).
    #[error("invalid bundle request: {0}")]
    InvalidRequest(String),

    /// I/O error while staging the workspace.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BundlerError {
    /// Creates a toolchain failure with captured stderr.
    pub fn toolchain(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::Toolchain {
            reason: reason.into(),
            stderr,
        }
    }

    /// Whether this failure class is known to be fixable by proxying asset
    /// fetches. Only asset-fetch failures qualify; toolchain and local
    /// errors are terminal on the first occurrence.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BundlerError::AssetFetch { kind, .. } if kind.is_recoverable()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(FetchFailureKind::Forbidden.is_recoverable());
        assert!(FetchFailureKind::ConnectionRefused.is_recoverable());
        assert!(FetchFailureKind::HostNotFound.is_recoverable());
        assert!(!FetchFailureKind::Timeout.is_recoverable());
        assert!(!FetchFailureKind::Other.is_recoverable());
    }

    #[test]
    fn test_only_asset_fetch_errors_are_recoverable() {
        let fetch = BundlerError::AssetFetch {
            url: "https://foo.com/icon.png".to_string(),
            kind: FetchFailureKind::Forbidden,
            detail: Some("HTTP 403".to_string()),
        };
        assert!(fetch.is_recoverable());

        let fetch_other = BundlerError::AssetFetch {
            url: "https://foo.com/icon.png".to_string(),
            kind: FetchFailureKind::Other,
            detail: None,
        };
        assert!(!fetch_other.is_recoverable());

        let toolchain = BundlerError::toolchain("gradle exited with code 1", None);
        assert!(!toolchain.is_recoverable());

        let timeout = BundlerError::Timeout { timeout_secs: 600 };
        assert!(!timeout.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = BundlerError::AssetFetch {
            url: "https://foo.com/icon.png".to_string(),
            kind: FetchFailureKind::Forbidden,
            detail: Some("HTTP 403 Forbidden".to_string()),
        };
        let text = err.to_string();
        assert!(text.contains("https://foo.com/icon.png"));
        assert!(text.contains("Forbidden"));
    }
}
