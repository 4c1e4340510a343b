use anomaly_common::{AnomalyStrategy, DetectOutcome, StrategyContext};
use async_trait::async_trait;

use crate::cast::cast_to_f64_list;

/// Fires when a two-value meter-reading window decreases: register with
/// `buffer_size = 2` against a strictly-increasing characteristic (energy,
/// volume, ...).
pub struct JumpBackStrategy;

#[async_trait]
impl AnomalyStrategy for JumpBackStrategy {
    async fn detect(&self, _ctx: &StrategyContext, values: &[serde_json::Value]) -> DetectOutcome {
        let values = match cast_to_f64_list(values) {
            Ok(v) => v,
            Err(err) => {
                tracing::warn!(error = %err, "jump_back: values are not numeric");
                return DetectOutcome::default();
            }
        };
        tracing::debug!(?values, "jump_back values");
        if values.len() >= 2 && values[1] < values[0] {
            DetectOutcome {
                anomaly: true,
                description: "Meter reading jumped back.".to_string(),
            }
        } else {
            DetectOutcome::default()
        }
    }
}
