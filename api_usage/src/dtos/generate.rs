use entitlements::{FeatureKey, UsageCheck};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Free text about the candidate: experience, skills, the current resume.
    pub input: String,
    pub job_description: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub feature: FeatureKey,
    pub content: String,
    /// Usage after this generation was counted.
    pub usage: UsageCheck,
}
