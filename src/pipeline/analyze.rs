//! Batch analysis and aggregation steps
//!
//! Each step makes at most one oracle call and always returns a result
//! value; oracle failures become `failed` outcomes.

use tracing::{debug, warn};

use super::checkpoint::{
    BatchOutcome, BatchResult, EntityProfile, GlobalProfile, ProfileOutcome,
};
use super::config::AggregationFallback;
use crate::llm::prompt::{self, BatchDigest, EntityDigest};
use crate::llm::{LlmClient, LlmError, Oracle, StructuredProfile};

/// Analyze one batch of reviews as free text
pub async fn analyze_batch<C: LlmClient>(
    oracle: &Oracle<C>,
    entity: &str,
    batch_index: usize,
    reviews: &[String],
) -> BatchResult {
    let user = prompt::batch_prompt(entity, batch_index, reviews);

    let (outcome, elapsed) = match oracle.complete_text(prompt::BATCH_SYSTEM_PROMPT, &user).await {
        Ok(timed) => (
            BatchOutcome::Success {
                analysis_text: timed.value,
            },
            timed.elapsed.as_secs_f64(),
        ),
        Err(e) => {
            warn!(entity, batch_index, error = %e, "Batch analysis failed");
            (
                BatchOutcome::Failed {
                    error: format!("Analysis failed: {e}"),
                },
                0.0,
            )
        }
    };

    BatchResult {
        entity: entity.to_string(),
        batch_index,
        review_count: reviews.len(),
        processing_time_seconds: elapsed,
        outcome,
    }
}

/// Merge an entity's successful batch analyses into one profile
///
/// Failed batches are ignored. With no successful batch the profile fails
/// without calling the oracle.
pub async fn aggregate_entity<C: LlmClient>(
    oracle: &Oracle<C>,
    entity: &str,
    batches: &[&BatchResult],
    fallback: AggregationFallback,
) -> EntityProfile {
    let digests: Vec<BatchDigest<'_>> = batches
        .iter()
        .filter_map(|b| match &b.outcome {
            BatchOutcome::Success { analysis_text } => Some(BatchDigest {
                batch_index: b.batch_index,
                review_count: b.review_count,
                analysis: analysis_text,
            }),
            BatchOutcome::Failed { .. } => None,
        })
        .collect();

    if digests.is_empty() {
        return EntityProfile::failed(entity, 0, "All batch analyses failed");
    }

    let total_reviews: usize = digests.iter().map(|d| d.review_count).sum();
    let user = prompt::entity_prompt(entity, &digests);
    let result = oracle
        .attempt_structured(prompt::ENTITY_SYSTEM_PROMPT, &user)
        .await
        .map(|t| (t.value, t.elapsed.as_secs_f64()));

    let placeholder = || StructuredProfile {
        summary: format!("Profile of {entity} based on {total_reviews} reviews"),
        pros: vec!["Players responded positively".to_string()],
        cons: vec!["More feedback needed".to_string()],
        tags: vec!["player reviews".to_string()],
        filled_keys: Vec::new(),
    };

    let (outcome, elapsed) = resolve(result, total_reviews, fallback, placeholder, entity);
    debug!(entity, total_reviews, success = outcome.is_success(), "Entity aggregated");

    EntityProfile {
        entity: entity.to_string(),
        batch_count: digests.len(),
        processing_time_seconds: elapsed,
        outcome,
    }
}

/// Merge successful entity profiles into the global profile
///
/// With no successful entity the profile fails without calling the oracle.
/// `profiles` is expected in source order.
pub async fn aggregate_global<C: LlmClient>(
    oracle: &Oracle<C>,
    profiles: &[&EntityProfile],
    fallback: AggregationFallback,
) -> GlobalProfile {
    let digests: Vec<EntityDigest<'_>> = profiles
        .iter()
        .filter_map(|p| match &p.outcome {
            ProfileOutcome::Success {
                total_reviews,
                summary,
                pros,
                cons,
                tags,
                ..
            } => Some(EntityDigest {
                entity: &p.entity,
                total_reviews: *total_reviews,
                summary,
                pros,
                cons,
                tags,
            }),
            ProfileOutcome::Failed { .. } => None,
        })
        .collect();

    if digests.is_empty() {
        return GlobalProfile {
            total_entities: 0,
            processing_time_seconds: 0.0,
            outcome: ProfileOutcome::Failed {
                error: "No successful entity profiles to aggregate".to_string(),
            },
        };
    }

    let total_reviews: usize = digests.iter().map(|d| d.total_reviews).sum();
    let entity_count = digests.len();
    let user = prompt::global_prompt(&digests);
    let result = oracle
        .attempt_structured(prompt::GLOBAL_SYSTEM_PROMPT, &user)
        .await
        .map(|t| (t.value, t.elapsed.as_secs_f64()));

    let placeholder = || StructuredProfile {
        summary: format!(
            "Overall profile based on {entity_count} entities and {total_reviews} reviews"
        ),
        pros: vec!["Players responded positively".to_string()],
        cons: vec!["More feedback needed".to_string()],
        tags: vec!["player reviews".to_string()],
        filled_keys: Vec::new(),
    };

    let (outcome, elapsed) = resolve(result, total_reviews, fallback, placeholder, "global");

    GlobalProfile {
        total_entities: entity_count,
        processing_time_seconds: elapsed,
        outcome,
    }
}

/// Turn an oracle result into a profile outcome, applying the fallback policy
///
/// A placeholder keeps the duration of the call whose answer it replaces.
fn resolve(
    result: Result<(Result<StructuredProfile, LlmError>, f64), LlmError>,
    total_reviews: usize,
    fallback: AggregationFallback,
    placeholder: impl FnOnce() -> StructuredProfile,
    scope: &str,
) -> (ProfileOutcome, f64) {
    match result {
        Ok((Ok(profile), elapsed)) => (success(profile, total_reviews, false), elapsed),
        Ok((Err(e), elapsed))
            if e.is_malformed_output() && fallback == AggregationFallback::Placeholder =>
        {
            warn!(
                scope,
                error = %e,
                "Aggregation answer unusable; storing placeholder profile marked degraded"
            );
            (success(placeholder(), total_reviews, true), elapsed)
        }
        Ok((Err(e), _)) | Err(e) => {
            warn!(scope, error = %e, "Aggregation failed");
            (
                ProfileOutcome::Failed {
                    error: format!("Aggregation failed: {e}"),
                },
                0.0,
            )
        }
    }
}

fn success(profile: StructuredProfile, total_reviews: usize, degraded: bool) -> ProfileOutcome {
    ProfileOutcome::Success {
        total_reviews,
        summary: profile.summary,
        pros: profile.pros,
        cons: profile.cons,
        tags: profile.tags,
        degraded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockLlmClient;
    use std::time::Duration;

    fn oracle(client: MockLlmClient) -> Oracle<MockLlmClient> {
        Oracle::new(client, Duration::from_secs(5))
    }

    fn batch(index: usize, count: usize, ok: bool) -> BatchResult {
        BatchResult {
            entity: "A".to_string(),
            batch_index: index,
            review_count: count,
            processing_time_seconds: 1.0,
            outcome: if ok {
                BatchOutcome::Success {
                    analysis_text: format!("analysis {index}"),
                }
            } else {
                BatchOutcome::Failed {
                    error: "boom".to_string(),
                }
            },
        }
    }

    const GOOD_JSON: &str = r#"{"summary": "fine", "pros": ["art"], "cons": ["length"], "tags": ["moe"]}"#;

    #[tokio::test]
    async fn test_analyze_batch_success() {
        let o = oracle(MockLlmClient::new("  the players like it  "));
        let reviews = vec!["a".to_string(), "b".to_string()];
        let result = analyze_batch(&o, "A", 2, &reviews).await;

        assert!(result.is_success());
        assert_eq!(result.analysis_text(), "the players like it");
        assert_eq!(result.review_count, 2);
        assert_eq!(result.batch_index, 2);
        let request = &o.client().requests()[0];
        assert!(request.user_content().contains("1. a\n2. b"));
        assert!(!request.json_format);
    }

    #[tokio::test]
    async fn test_analyze_batch_failure_is_recorded() {
        let o = oracle(MockLlmClient::failing());
        let result = analyze_batch(&o, "A", 1, &["a".to_string()]).await;

        assert!(!result.is_success());
        assert!(result.analysis_text().contains("Mock failure"));
        assert_eq!(result.processing_time_seconds, 0.0);
    }

    #[tokio::test]
    async fn test_aggregate_entity_uses_successful_batches_only() {
        let o = oracle(MockLlmClient::new(GOOD_JSON));
        let b1 = batch(1, 20, true);
        let b2 = batch(2, 20, false);
        let b3 = batch(3, 5, true);
        let profile =
            aggregate_entity(&o, "A", &[&b1, &b2, &b3], AggregationFallback::Placeholder).await;

        assert_eq!(profile.batch_count, 2);
        assert_eq!(profile.outcome.total_reviews(), 25);
        match &profile.outcome {
            ProfileOutcome::Success { summary, pros, degraded, .. } => {
                assert_eq!(summary, "fine");
                assert_eq!(pros, &vec!["art".to_string()]);
                assert!(!degraded);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        let prompt = o.client().requests()[0].user_content().to_string();
        assert!(prompt.contains("analysis 1"));
        assert!(prompt.contains("analysis 3"));
        assert!(!prompt.contains("boom"));
    }

    #[tokio::test]
    async fn test_aggregate_entity_all_failed_skips_oracle() {
        let o = oracle(MockLlmClient::new(GOOD_JSON));
        let b1 = batch(1, 3, false);
        let profile = aggregate_entity(&o, "A", &[&b1], AggregationFallback::Placeholder).await;

        assert!(!profile.is_success());
        assert_eq!(profile.outcome.total_reviews(), 0);
        assert_eq!(o.client().calls(), 0);
    }

    #[tokio::test]
    async fn test_aggregate_entity_placeholder_on_bad_json() {
        let o = oracle(MockLlmClient::new("I cannot produce JSON today"));
        let b1 = batch(1, 7, true);
        let profile = aggregate_entity(&o, "A", &[&b1], AggregationFallback::Placeholder).await;

        assert!(profile.is_success());
        assert!(profile.outcome.is_degraded());
        match &profile.outcome {
            ProfileOutcome::Success { summary, pros, cons, tags, .. } => {
                assert!(summary.contains("7 reviews"));
                assert_eq!(pros.len(), 1);
                assert_eq!(cons.len(), 1);
                assert_eq!(tags.len(), 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    /// Answers after a short real delay
    struct SlowAnswer(&'static str);

    #[async_trait::async_trait]
    impl LlmClient for SlowAnswer {
        async fn chat(&self, _request: &crate::llm::ChatRequest) -> crate::llm::LlmResult<String> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(self.0.to_string())
        }

        fn model_name(&self) -> &str {
            "slow"
        }

        async fn is_ready(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn test_placeholder_keeps_call_duration() {
        let o = Oracle::new(SlowAnswer("no json here"), Duration::from_secs(5));
        let b1 = batch(1, 4, true);
        let profile = aggregate_entity(&o, "A", &[&b1], AggregationFallback::Placeholder).await;
        assert!(profile.outcome.is_degraded());
        assert!(profile.processing_time_seconds >= 0.02);

        let b = aggregate_entity(&o, "A", &[&b1], AggregationFallback::Placeholder).await;
        let global = aggregate_global(&o, &[&b], AggregationFallback::Placeholder).await;
        assert!(global.outcome.is_degraded());
        assert!(global.processing_time_seconds >= 0.02);
    }

    #[tokio::test]
    async fn test_aggregate_entity_fail_policy_on_bad_json() {
        let o = oracle(MockLlmClient::new("not json"));
        let b1 = batch(1, 7, true);
        let profile = aggregate_entity(&o, "A", &[&b1], AggregationFallback::Fail).await;

        assert!(!profile.is_success());
        assert!(profile.outcome.error().unwrap().contains("parse"));
    }

    #[tokio::test]
    async fn test_aggregate_entity_transport_error_fails_even_with_placeholder() {
        let o = oracle(MockLlmClient::failing());
        let b1 = batch(1, 7, true);
        let profile = aggregate_entity(&o, "A", &[&b1], AggregationFallback::Placeholder).await;
        assert!(!profile.is_success());
        assert_eq!(profile.batch_count, 1);
    }

    #[tokio::test]
    async fn test_aggregate_entity_fills_missing_keys() {
        let o = oracle(MockLlmClient::new(r#"{"summary": "only summary"}"#));
        let b1 = batch(1, 2, true);
        let profile = aggregate_entity(&o, "A", &[&b1], AggregationFallback::Fail).await;

        match profile.outcome {
            ProfileOutcome::Success { pros, cons, tags, degraded, .. } => {
                assert!(pros.is_empty() && cons.is_empty() && tags.is_empty());
                assert!(!degraded);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_aggregate_global_excludes_failed_entities() {
        let o = oracle(MockLlmClient::new(GOOD_JSON));
        let a = aggregate_entity(
            &oracle(MockLlmClient::new(GOOD_JSON)),
            "A",
            &[&batch(1, 4, true)],
            AggregationFallback::Placeholder,
        )
        .await;
        let b = EntityProfile::failed("B", 0, "x");

        let global = aggregate_global(&o, &[&a, &b], AggregationFallback::Placeholder).await;
        assert!(global.is_success());
        assert_eq!(global.total_entities, 1);
        assert_eq!(global.outcome.total_reviews(), 4);

        let prompt = o.client().requests()[0].user_content().to_string();
        assert!(prompt.contains("Game: A (4 reviews)"));
        assert!(!prompt.contains("Game: B"));
    }

    #[tokio::test]
    async fn test_aggregate_global_no_success_skips_oracle() {
        let o = oracle(MockLlmClient::new(GOOD_JSON));
        let b = EntityProfile::failed("B", 0, "x");
        let global = aggregate_global(&o, &[&b], AggregationFallback::Placeholder).await;

        assert!(!global.is_success());
        assert_eq!(o.client().calls(), 0);
    }
}
