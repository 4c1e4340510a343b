use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `default_directive` is used when
/// `RUST_LOG` is unset, e.g. `"anomaly_router=info"`.
pub fn init_tracing(default_directive: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}
