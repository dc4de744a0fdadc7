use std::time::Duration;

use async_trait::async_trait;
use common::{
    env_config::GenerationConfig,
    error::{AppError, Res},
};
use entitlements::FeatureKey;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::dtos::generate::GenerateRequest;

/// Turns a natural-language prompt into text.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Res<String>;
}

#[derive(Serialize)]
struct GenerationBody<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct GenerationReply {
    text: Option<String>,
}

/// Client for the hosted text generation endpoint. One attempt per call.
pub struct HttpGenerator {
    client: Client,
    api_url: String,
    api_key: String,
}

impl HttpGenerator {
    pub fn new(config: &GenerationConfig) -> Res<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ContentGenerator for HttpGenerator {
    async fn generate(&self, prompt: &str) -> Res<String> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&GenerationBody { prompt })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Upstream("Generation service timed out".to_string())
                } else {
                    AppError::Upstream(format!("Generation service unreachable: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Generation service returned {}: {}",
                status, message
            )));
        }

        let reply: GenerationReply = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed generation reply: {}", e)))?;
        reply
            .text
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| AppError::Upstream("Generation service returned no text".to_string()))
    }
}

/// Builds the prompt sent for a generated feature.
pub fn build_prompt(feature: FeatureKey, req: &GenerateRequest) -> Res<String> {
    let task = match feature {
        FeatureKey::CoverLetters => {
            "Write a concise, professional cover letter for the candidate below."
        }
        FeatureKey::AtsOptimizations => {
            "Rewrite the resume below so it passes applicant tracking systems, keeping every fact."
        }
        FeatureKey::InterviewQuestions => {
            "List likely interview questions for the candidate below, each with a short model answer."
        }
        other => {
            return Err(AppError::BadRequest(format!(
                "{} is not a generated feature",
                other
            )));
        }
    };
    if req.input.trim().is_empty() {
        return Err(AppError::BadRequest("input is required".to_string()));
    }

    let mut prompt = format!("{}\n\nCandidate:\n{}", task, req.input.trim());
    if let Some(job) = req.job_description.as_deref().filter(|j| !j.trim().is_empty()) {
        prompt.push_str(&format!("\n\nTarget job:\n{}", job.trim()));
    }
    if let Some(language) = &req.language {
        prompt.push_str(&format!("\n\nAnswer in {}.", language));
    }
    Ok(prompt)
}
