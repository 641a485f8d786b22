use std::sync::Arc;

use anyhow::{Context, Result};

use trivia::{cli, Config, HttpApi, SessionTracker};

#[tokio::main]
async fn main() -> Result<()> {
    // Begin logger
    env_logger::init();

    // Load backend location (.env is read here too)
    let config = Config::from_env()?;
    log::info!("Using trivia backend at {}", config.api_url);

    let api = HttpApi::new(config.clone()).context("Error creating HTTP client.")?;
    let tracker = SessionTracker::new(Arc::new(api), config);

    if let Err(why) = cli::run(tracker).await {
        log::error!("Terminal error: {why:?}");
        return Err(why);
    }

    Ok(())
}
