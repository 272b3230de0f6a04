use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct CompileRequest {
    #[serde(default)]
    pub latex: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub version: String,
}
