use std::sync::Arc;
use log::{error, info};

use sqlrelay::config::RelayConfig;
use sqlrelay::providers::GeminiClient;
use sqlrelay::SqlRelay;

#[tokio::main]
async fn main()
{   dotenvy::dotenv().ok();
    env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).init();

    if let Err(e) = run().await
    {   error!("sqlrelay failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), sqlrelay::Error>
{   let config = RelayConfig::from_env()?;
    let provider = GeminiClient::from_config(&config.provider)?;
    info!(
      "Using {} with candidates {:?}",
      provider.api_base(),
      config.failover.candidates
    );
    let relay = SqlRelay::new(Arc::new(provider), &config.failover);
    sqlrelay::server::serve(relay, &config.server).await
}
