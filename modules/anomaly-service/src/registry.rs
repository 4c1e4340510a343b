use std::sync::Arc;

use anomaly_common::{AnomalyStrategy, HandlerSpec};
use anomaly_strategies::JumpBackStrategy;

/// Seeds the handler registry the way the reference strategies' own
/// registration code did: `jump_back_anom` is declared seven times against
/// different function/aspect/characteristic triples, all under the same
/// name. Because the registry keys on name alone, only the final
/// registration below (gas consumption, cubic meter) survives — preserved
/// here rather than "fixed", since fixing it would change which meters get
/// watched.
pub fn reference_handlers() -> Vec<HandlerSpec> {
    const JUMP_BACK_TRIPLES: &[(&str, &str, &str)] = &[
        (
            "urn:infai:ses:measuring-function:57dfd369-92db-462c-aca4-a767b52c972e",
            "urn:infai:ses:aspect:fdc999eb-d366-44e8-9d24-bfd48d5fece1",
            "urn:infai:ses:characteristic:3febed55-ba9b-43dc-8709-9c73bae3716e",
        ), // Electricity Consumption, Electricity -> Total, kWh
        (
            "urn:infai:ses:measuring-function:57dfd369-92db-462c-aca4-a767b52c972e",
            "urn:infai:ses:aspect:fdc999eb-d366-44e8-9d24-bfd48d5fece1",
            "urn:infai:ses:characteristic:d4ac88cf-f10b-45d5-a3a9-e42b4b2a55ca",
        ), // Electricity Consumption, Electricity -> Total, Wh
        (
            "urn:infai:ses:measuring-function:57dfd369-92db-462c-aca4-a767b52c972e",
            "urn:infai:ses:aspect:fdc999eb-d366-44e8-9d24-bfd48d5fece1",
            "urn:infai:ses:characteristic:00413fba-f7e9-447c-8476-1d236db9ec53",
        ), // Electricity Consumption, Electricity -> Total, Wmin
        (
            "urn:infai:ses:measuring-function:cfa56e75-8e8f-4f0d-a3fa-ed2758422b2a",
            "urn:infai:ses:aspect:b8b3b549-3b01-4604-a727-20aa528c21c9",
            "urn:infai:ses:characteristic:aeb260f8-5fe5-4989-9e66-3c0a4ff273c4",
        ), // Volume, Water, Liter
        (
            "urn:infai:ses:measuring-function:cfa56e75-8e8f-4f0d-a3fa-ed2758422b2a",
            "urn:infai:ses:aspect:b8b3b549-3b01-4604-a727-20aa528c21c9",
            "urn:infai:ses:characteristic:fbfea6c7-3392-4ec2-9ec5-0d0ef6362b9b",
        ), // Volume, Water, Cubic Meter
        (
            "urn:infai:ses:measuring-function:4daa591f-ad97-4e57-8014-aa3f5e552c3b",
            "urn:infai:ses:aspect:7ea324c1-48e4-419a-a499-325d79dac09f",
            "urn:infai:ses:characteristic:aeb260f8-5fe5-4989-9e66-3c0a4ff273c4",
        ), // Gas Consumption, Gas, Liter
        (
            "urn:infai:ses:measuring-function:4daa591f-ad97-4e57-8014-aa3f5e552c3b",
            "urn:infai:ses:aspect:7ea324c1-48e4-419a-a499-325d79dac09f",
            "urn:infai:ses:characteristic:fbfea6c7-3392-4ec2-9ec5-0d0ef6362b9b",
        ), // Gas Consumption, Gas, Cubic Meter
    ];

    let strategy: Arc<dyn AnomalyStrategy> = Arc::new(JumpBackStrategy);
    JUMP_BACK_TRIPLES
        .iter()
        .map(|(function_id, aspect_id, characteristic_id)| HandlerSpec {
            name: "jump_back_anom".to_string(),
            function_id: function_id.to_string(),
            aspect_id: aspect_id.to_string(),
            characteristic_id: characteristic_id.to_string(),
            buffer_size: 2,
            strategy: strategy.clone(),
        })
        .collect()
}
