//! Typing Gateway Server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p typing-gateway
//! ```
//!
//! Configuration is loaded from environment variables.

use tracing::{error, info};
use typing_common::{try_init_tracing_with_config, AppConfig, TracingConfig};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, "Gateway failed to start");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = AppConfig::from_env()?;

    // Initialize tracing
    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_app(&config.app)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        name = %config.app.name,
        env = ?config.app.env,
        port = config.gateway.port,
        typing_timeout_ms = config.typing.timeout_ms,
        "Configuration loaded"
    );

    // Run the gateway server
    typing_gateway::run(config).await?;

    Ok(())
}
