use anomaly_common::{AnomalyStrategy, DetectOutcome, StrategyContext};
use async_trait::async_trait;

use crate::cast::cast_to_f64_list;

const VALUE_EQUALITY_THRESHOLD: f64 = 1e-1;

/// Fires when a three-value window shows a small-then-huge jump: register
/// with `buffer_size = 3`. The middle-to-last delta must exceed the
/// first-to-middle delta by 100x, and the first delta must clear the
/// equality threshold (otherwise noise near zero would divide up into a
/// false 100x ratio).
pub struct BigJumpStrategy;

#[async_trait]
impl AnomalyStrategy for BigJumpStrategy {
    async fn detect(&self, _ctx: &StrategyContext, values: &[serde_json::Value]) -> DetectOutcome {
        let values = match cast_to_f64_list(values) {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(error = %err, "big_jump: values are not numeric");
                return DetectOutcome::default();
            }
        };
        tracing::debug!(?values, "big_jump values");
        if values.len() < 3 {
            return DetectOutcome::default();
        }
        let diff_starting_two = values[1] - values[0];
        let diff_ending_two = values[2] - values[1];
        if diff_starting_two > VALUE_EQUALITY_THRESHOLD && diff_ending_two > 100.0 * diff_starting_two {
            DetectOutcome {
                anomaly: true,
                description: "Meter reading had big jump.".to_string(),
            }
        } else {
            DetectOutcome::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct NullStore;
    #[async_trait]
    impl anomaly_common::StrategyStore for NullStore {
        async fn get(&self, _key: &str) -> anyhow::Result<Option<serde_json::Value>> {
            Ok(None)
        }
        async fn set(&self, _key: &str, _value: serde_json::Value) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn ctx() -> StrategyContext {
        StrategyContext {
            device_id: "d1".to_string(),
            service_id: "s1".to_string(),
            store: Arc::new(NullStore),
        }
    }

    #[tokio::test]
    async fn small_then_huge_jump_is_an_anomaly() {
        let outcome = BigJumpStrategy
            .detect(
                &ctx(),
                &[serde_json::json!(1.0), serde_json::json!(1.2), serde_json::json!(50.0)],
            )
            .await;
        assert!(outcome.anomaly);
    }

    #[tokio::test]
    async fn steady_growth_is_not_an_anomaly() {
        let outcome = BigJumpStrategy
            .detect(
                &ctx(),
                &[serde_json::json!(1.0), serde_json::json!(2.0), serde_json::json!(3.0)],
            )
            .await;
        assert!(!outcome.anomaly);
    }
}
