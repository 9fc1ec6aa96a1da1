use callsign::{config, logger, server, Context, Result};
use log::info;
use tokio::signal;

#[tokio::main]
pub async fn main() -> Result<()> {
    logger::setup_logger();

    let cli_config = config::cli();
    let config = config::load(&cli_config)?;

    let context = Context::new(&config.assets.static_dir);

    info!("Serving static files from {}", config.assets.static_dir);

    let listener = server::bind(&config.network.listen).await?;

    tokio::select! {
        _ = server::serve(listener, context) => {}
        result = signal::ctrl_c() => {
            result?;

            info!("Shutting down");
        }
    }

    Ok(())
}
