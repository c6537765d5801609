use std::sync::Arc;

use ibot_core::config::Config;

#[tokio::main]
async fn main() -> Result<(), ibot_core::Error> {
    ibot_core::logging::init("ibot")?;

    let cfg = Arc::new(Config::load()?);

    ibot_telegram::router::run_polling(cfg)
        .await
        .map_err(|e| ibot_core::Error::External(format!("telegram bot failed: {e}")))?;

    tracing::info!("shutdown complete");
    Ok(())
}
