//! # Strata API Entry Point
//!
//! ## Startup Sequence
//! 1. Initialize tracing (logging)
//! 2. Load `STRATA_*` configuration from the environment
//! 3. Open the database and serve (see [`strata_api::serve`])

use strata_api::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    strata_api::init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        bind = %config.bind_addr,
        loyalty = config.loyalty.is_some(),
        "Starting Strata API"
    );

    strata_api::serve(config).await
}
