use thiserror::Error;

use ircbot_channel_irc::TransportError;
use ircbot_cron::CronError;
use ircbot_storage::StorageError;

use crate::plugin::PluginError;

/// Conditions that stop the poll loop. None of them are retried.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("Username \"{nick}\" already taken on {server}")]
    NicknameInUse { nick: String, server: String },
    #[error("Roster store error: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Cron(#[from] CronError),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error("Cannot build classifier for nick: {0}")]
    Classifier(#[from] regex::Error),
}
