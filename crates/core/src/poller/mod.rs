//! Client-side job polling.
//!
//! For builds executed out-of-band, the poller watches a job record by id
//! until it reaches a terminal state, enforcing a wall-clock cap on the
//! wait. The timeout only abandons local observation: the remote build
//! keeps running and can be checked again later.

mod config;
mod http;
mod poller;
mod types;

pub use config::PollerConfig;
pub use http::HttpJobApi;
pub use poller::{merge_logs, JobPoller};
pub use types::{JobApi, JobApiError, PollOutcome, PollReport};
