use std::sync::Arc;

use ircbot_channel_irc::TcpTransport;
use ircbot_config::BotConfig;
use ircbot_engine::Engine;
use ircbot_storage::BotStorage;
use tracing::info;

/// Open storage, load plugins and drive the engine until it stops.
pub async fn run_bot(config: BotConfig) -> anyhow::Result<()> {
    config.validate()?;

    let db_path = config.database_path()?;
    let storage = Arc::new(BotStorage::open(&db_path)?);
    info!(path = %db_path.display(), "Storage opened");

    let loader = ircbot_plugins::create_plugins(&config, storage.clone())?;
    let transport = TcpTransport::new(&config.irc.server, config.irc.port);
    let mut engine = Engine::new(&config, Box::new(transport), storage)?;

    let loaded = engine.load_plugins(&loader)?;
    info!(
        plugins = loaded.len(),
        jobs = engine.cron().len(),
        "Starting ircbot as {} on {}:{}",
        config.irc.nick,
        config.irc.server,
        config.irc.port
    );

    engine.run().await?;
    Ok(())
}
