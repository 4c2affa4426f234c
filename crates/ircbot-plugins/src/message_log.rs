//! Persists every channel message to the `messages` table.

use std::sync::Arc;

use chrono::Utc;
use ircbot_engine::{Plugin, Registrar};
use ircbot_hooks::DEFAULT_PRIORITY;
use ircbot_storage::{BotStorage, LoggedMessage};
use ircbot_types::{IrcEvent, actions};
use tracing::debug;

pub const NAME: &str = "message-log";

pub struct MessageLogPlugin {
    storage: Arc<BotStorage>,
}

impl MessageLogPlugin {
    pub fn new(storage: Arc<BotStorage>) -> Self {
        Self { storage }
    }
}

fn log_channel_message(storage: &BotStorage, event: &IrcEvent) -> anyhow::Result<()> {
    let IrcEvent::ChannelMessage {
        username,
        channel,
        message,
    } = event
    else {
        return Ok(());
    };
    storage.log_message(&LoggedMessage {
        username: username.clone(),
        channel: channel.clone(),
        message: message.clone(),
        timestamp: Utc::now().timestamp(),
    })?;
    debug!(channel = %channel, "Logged channel message");
    Ok(())
}

impl Plugin for MessageLogPlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn register(&self, registrar: &mut Registrar<'_>) -> anyhow::Result<()> {
        let storage = self.storage.clone();
        registrar.on_action(actions::CHANNEL_MESSAGE, DEFAULT_PRIORITY, move |event, _| {
            log_channel_message(&storage, event)
        });
        Ok(())
    }
}
