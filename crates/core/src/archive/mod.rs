//! Downloadable bundle assembly.
//!
//! Turns a completed build's artifacts into the single zip the user
//! downloads. Archive failures are a class of their own: by the time this
//! runs the build itself has succeeded, and reporting a packaging problem
//! as a build failure would send the user down the wrong debugging path.

mod assembler;

pub use assembler::{archive_download_name, ArchiveAssembler, ArchiveError};
