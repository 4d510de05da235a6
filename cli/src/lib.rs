//! Shared start-up for the operator scripts.

use billing_core::{Config, OperationResult};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

/// Install a `fmt` subscriber honouring `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Load configuration from the environment (and `.env`), failing fast.
pub fn load_config() -> anyhow::Result<Config> {
    let config = Config::from_env()?;
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}

pub fn banner(title: &str) {
    let rule = "=".repeat(50);
    println!("{rule}\n{title}\n{rule}");
}

/// `(code, name)` pairs from a plan list envelope, in listing order.
///
/// Entries without a string `code` are skipped; a missing `name` falls back
/// to the code.
pub fn available_plans(plans: &OperationResult) -> Vec<(&str, &str)> {
    plans
        .get("data")
        .and_then(Value::as_array)
        .map(|data| {
            data.iter()
                .filter_map(|plan| {
                    let code = plan.get("code")?.as_str()?;
                    let name = plan.get("name").and_then(Value::as_str).unwrap_or(code);
                    Some((code, name))
                })
                .collect()
        })
        .unwrap_or_default()
}
