//! The native builder adapter.
//!
//! Translates a validated option set plus a chosen transport into an
//! invocation of the external TWA toolchain and normalizes its result.
//! Never retries internally; the retry/fallback policy lives in the
//! orchestrator.

mod error;
mod traits;
mod twa;
mod types;

pub use error::{BundlerError, FetchFailureKind};
pub use traits::Bundler;
pub use twa::TwaBundler;
pub use types::{BundleRequest, GeneratedPackage, LocalSigningKey, Transport};
