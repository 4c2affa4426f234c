//! ircbot-types: Shared types for the ircbot workspace.
//!
//! Holds the classified protocol events that flow through the hook bus and
//! the per-connection [`Session`] that handlers and cron tasks write to.

use std::panic::{AssertUnwindSafe, catch_unwind};

use serde::{Deserialize, Serialize};

// ──────────────────── Action Names ────────────────────

/// Names of the actions fired by the engine for classified events.
pub mod actions {
    pub const USER_JOIN: &str = "user-join";
    pub const USER_PART: &str = "user-part";
    pub const CHANNEL_MESSAGE: &str = "channel-message";
    pub const PRIVATE_MESSAGE: &str = "private-message";
    pub const NICK_CHANGED: &str = "nick-changed";
}

/// Username used when a line carries no `:nick!` prefix.
pub const UNKNOWN_USER: &str = "unknown";

// ──────────────────── Events ────────────────────

/// A protocol line classified into a semantic event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IrcEvent {
    /// Server liveness check. `payload` is everything after `PING `.
    Ping { payload: String },
    /// The configured nick is already taken on the server.
    UsernameTaken,
    /// A message sent to a channel the bot is in.
    ChannelMessage {
        username: String,
        channel: String,
        message: String,
    },
    /// A message addressed to the bot's own nick.
    PrivateMessage {
        username: String,
        channel: String,
        message: String,
    },
    /// A user left a channel.
    UserPart { username: String, channel: String },
    /// A user joined a channel.
    UserJoin { username: String, channel: String },
    /// Channel occupants listed by a NAMES reply (numeric 353).
    NamesReply { channel: String, users: Vec<String> },
    /// A user disconnected from the network.
    UserQuit { username: String },
    /// A user changed nick.
    NickChange { old_nick: String, new_nick: String },
}

impl IrcEvent {
    /// Action fired for this event, if any.
    ///
    /// Ping, username-taken and names-reply are handled by the engine itself
    /// and never reach extensions.
    pub fn action_name(&self) -> Option<&'static str> {
        match self {
            IrcEvent::ChannelMessage { .. } => Some(actions::CHANNEL_MESSAGE),
            IrcEvent::PrivateMessage { .. } => Some(actions::PRIVATE_MESSAGE),
            IrcEvent::UserJoin { .. } => Some(actions::USER_JOIN),
            IrcEvent::UserPart { .. } | IrcEvent::UserQuit { .. } => Some(actions::USER_PART),
            IrcEvent::NickChange { .. } => Some(actions::NICK_CHANGED),
            IrcEvent::Ping { .. } | IrcEvent::UsernameTaken | IrcEvent::NamesReply { .. } => None,
        }
    }

    /// The user the event is about. For nick changes this is the old nick.
    pub fn username(&self) -> Option<&str> {
        match self {
            IrcEvent::ChannelMessage { username, .. }
            | IrcEvent::PrivateMessage { username, .. }
            | IrcEvent::UserPart { username, .. }
            | IrcEvent::UserJoin { username, .. }
            | IrcEvent::UserQuit { username } => Some(username),
            IrcEvent::NickChange { old_nick, .. } => Some(old_nick),
            IrcEvent::Ping { .. } | IrcEvent::UsernameTaken | IrcEvent::NamesReply { .. } => None,
        }
    }

    /// Channel name without the leading `#`.
    pub fn channel(&self) -> Option<&str> {
        match self {
            IrcEvent::ChannelMessage { channel, .. }
            | IrcEvent::PrivateMessage { channel, .. }
            | IrcEvent::UserPart { channel, .. }
            | IrcEvent::UserJoin { channel, .. }
            | IrcEvent::NamesReply { channel, .. } => Some(channel),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            IrcEvent::ChannelMessage { message, .. } | IrcEvent::PrivateMessage { message, .. } => {
                Some(message)
            }
            _ => None,
        }
    }

    /// Membership facts carried by a NAMES reply, one per listed user.
    pub fn memberships(&self) -> Vec<Membership<'_>> {
        match self {
            IrcEvent::NamesReply { channel, users } => users
                .iter()
                .map(|username| Membership { username, channel })
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// A single `(username, channel)` membership fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Membership<'a> {
    pub username: &'a str,
    pub channel: &'a str,
}

// ──────────────────── Channel Names ────────────────────

/// Strip a single leading `#` from a channel name.
pub fn strip_channel_prefix(channel: &str) -> &str {
    channel.strip_prefix('#').unwrap_or(channel)
}

/// Remove characters that would break a protocol line.
fn sanitize_outbound(text: &str) -> String {
    text.chars().filter(|c| !matches!(c, '\r' | '\n')).collect()
}

// ──────────────────── Session ────────────────────

/// Connection-scoped state shared by the engine, hook handlers and cron tasks.
///
/// Tracks the channels the bot currently occupies and queues outbound
/// protocol lines. The engine flushes the queue to the transport after every
/// dispatch and every cron tick.
#[derive(Debug, Clone)]
pub struct Session {
    nick: String,
    channels: Vec<String>,
    outbound: Vec<String>,
}

impl Session {
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            channels: Vec::new(),
            outbound: Vec::new(),
        }
    }

    /// The bot's configured nick.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Channels currently joined, in join order, without `#`.
    pub fn joined_channels(&self) -> &[String] {
        &self.channels
    }

    pub fn is_joined(&self, channel: &str) -> bool {
        let channel = strip_channel_prefix(channel);
        self.channels.iter().any(|c| c == channel)
    }

    /// Record that the bot joined `channel`. Returns false if already present.
    pub fn mark_joined(&mut self, channel: &str) -> bool {
        if self.is_joined(channel) {
            return false;
        }
        self.channels.push(strip_channel_prefix(channel).to_string());
        true
    }

    /// Record that the bot left `channel`. Returns false if it was not joined.
    pub fn mark_parted(&mut self, channel: &str) -> bool {
        let channel = strip_channel_prefix(channel);
        let before = self.channels.len();
        self.channels.retain(|c| c != channel);
        self.channels.len() != before
    }

    /// Queue a message to a joined channel.
    ///
    /// Does nothing and returns false if the bot is not in `channel`.
    pub fn send_channel_message(&mut self, channel: &str, message: &str) -> bool {
        let channel = strip_channel_prefix(channel);
        if !self.is_joined(channel) {
            tracing::debug!(channel, "Dropping message to channel not joined");
            return false;
        }
        self.outbound.push(format!(
            "PRIVMSG #{channel} :{}\n",
            sanitize_outbound(message)
        ));
        true
    }

    /// Queue a private message to another user.
    pub fn send_private_message(&mut self, nick: &str, message: &str) {
        self.outbound
            .push(format!("PRIVMSG {nick} :{}\n", sanitize_outbound(message)));
    }

    pub fn has_outbound(&self) -> bool {
        !self.outbound.is_empty()
    }

    /// Drain the outbound queue.
    pub fn take_outbound(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outbound)
    }
}

// ──────────────────── Callback Isolation ────────────────────

/// Run an extension callback, optionally containing a panic.
///
/// With `isolate` set, a panic is caught and returned as `Err` carrying the
/// panic message. Otherwise the panic unwinds to the caller.
pub fn run_isolated<T>(isolate: bool, f: impl FnOnce() -> T) -> Result<T, String> {
    if !isolate {
        return Ok(f());
    }
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        if let Some(msg) = payload.downcast_ref::<&str>() {
            msg.to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "non-string panic payload".to_string()
        }
    })
}
