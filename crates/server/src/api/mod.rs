//! HTTP API modules.

mod fetch_check;
mod handlers;
mod jobs;
mod packages;
mod routes;

pub use routes::create_router;
