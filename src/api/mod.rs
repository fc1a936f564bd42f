//! HTTP API for lab report extraction.
//!
//! `POST /get-lab-tests` accepts a report photo and returns the lab tests
//! found in it. `GET /health` is a liveness check. The router is composable:
//! `lab_api_router()` returns a `Router` that can be mounted on any axum
//! server instance.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::lab_api_router;
pub use server::{shutdown_signal, start_server_on, LabApiServer};
pub use types::{ApiContext, HealthResponse, LabTestsResponse};
