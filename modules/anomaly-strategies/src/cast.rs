/// Coerce a window of decoded values into `f64`, failing if any entry isn't
/// numeric. Detectors that need a specific shape call this once up front
/// rather than repeating `serde_json::Value` matching.
pub fn cast_to_f64_list(values: &[serde_json::Value]) -> anyhow::Result<Vec<f64>> {
    values
        .iter()
        .map(|v| {
            v.as_f64()
                .ok_or_else(|| anyhow::anyhow!("value is not a number: {v:?}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_numeric_entries() {
        let values = vec![serde_json::json!(1.0), serde_json::json!("oops")];
        assert!(cast_to_f64_list(&values).is_err());
    }

    #[test]
    fn casts_ints_and_floats() {
        let values = vec![serde_json::json!(1), serde_json::json!(2.5)];
        assert_eq!(cast_to_f64_list(&values).unwrap(), vec![1.0, 2.5]);
    }
}
