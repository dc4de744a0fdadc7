use common::error::{AppError, Res};
use entitlements::{EntitlementEngine, FeatureKey};
use uuid::Uuid;

use crate::{
    dtos::generate::{GenerateRequest, GenerateResponse},
    services::generator::{ContentGenerator, build_prompt},
};

/// Generates content for a gated feature and counts it only once it exists.
///
/// A failed generation leaves the counter untouched. If a concurrent request
/// took the last slot while this one was generating, the text is discarded
/// and the caller gets `QuotaExceeded`.
pub async fn generate_content(
    engine: &EntitlementEngine,
    generator: &dyn ContentGenerator,
    user_id: Uuid,
    feature: FeatureKey,
    req: &GenerateRequest,
) -> Res<GenerateResponse> {
    if !feature.is_generated() {
        return Err(AppError::NotFound(format!("{} cannot be generated", feature)));
    }
    let prompt = build_prompt(feature, req)?;

    let content = generator
        .generate(&prompt)
        .await
        .inspect_err(|e| log::error!("Generation of {} for user {} failed: {}", feature, user_id, e))?;

    let usage = engine.consume(user_id, feature).await.inspect_err(|_| {
        log::warn!(
            "Discarding {} for user {}: quota was used up during generation",
            feature,
            user_id
        )
    })?;

    Ok(GenerateResponse {
        feature,
        content,
        usage,
    })
}
