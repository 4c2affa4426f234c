//! ircbot-plugins: Extensions compiled into the bot, enabled by name from
//! `plugins.enabled`.

pub mod clock;
pub mod message_log;
pub mod sample;

use std::sync::Arc;

use ircbot_config::BotConfig;
use ircbot_engine::{PluginError, PluginLoader};
use ircbot_storage::BotStorage;

pub use clock::ClockPlugin;
pub use message_log::MessageLogPlugin;
pub use sample::SamplePlugin;

/// Names accepted in `plugins.enabled`.
pub const BUILTIN_PLUGINS: [&str; 3] = [sample::NAME, clock::NAME, message_log::NAME];

/// Build a loader holding every plugin enabled in `config`, in listed order.
pub fn create_plugins(
    config: &BotConfig,
    storage: Arc<BotStorage>,
) -> Result<PluginLoader, PluginError> {
    let mut loader = PluginLoader::new();
    for name in &config.plugins.enabled {
        match name.as_str() {
            sample::NAME => loader.add(Box::new(SamplePlugin)),
            clock::NAME => loader.add(Box::new(ClockPlugin::new(config.irc.channels.clone()))),
            message_log::NAME => loader.add(Box::new(MessageLogPlugin::new(storage.clone()))),
            other => return Err(PluginError::Unknown(other.to_string())),
        }
    }
    Ok(loader)
}
