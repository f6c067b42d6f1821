use crate::Result;

/// Initialize tracing for the agent.
///
/// Default: info for our crates, info for everything else.
/// Can be overridden with `RUST_LOG`. A second call is a no-op.
pub fn init(service_name: &str) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "info,faqbot_core=info,faqbot_telegram=info,{service_name}=info"
        ))
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .try_init();

    Ok(())
}
