//! Shared types for the HTTP layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::models::LabTest;
use crate::pipeline::extraction::LabReportExtractor;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes.
/// The extractor is stateless, so one instance serves every request.
#[derive(Clone)]
pub struct ApiContext {
    pub extractor: Arc<LabReportExtractor>,
    pub config: Arc<ServerConfig>,
}

impl ApiContext {
    pub fn new(extractor: LabReportExtractor, config: ServerConfig) -> Self {
        Self {
            extractor: Arc::new(extractor),
            config: Arc::new(config),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Response bodies
// ═══════════════════════════════════════════════════════════

/// Successful `POST /get-lab-tests` body.
#[derive(Debug, Serialize, Deserialize)]
pub struct LabTestsResponse {
    pub is_success: bool,
    pub lab_tests: Vec<LabTest>,
}

impl LabTestsResponse {
    pub fn success(lab_tests: Vec<LabTest>) -> Self {
        Self {
            is_success: true,
            lab_tests,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
