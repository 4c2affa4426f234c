//! Outbound command lines. Fields are space-joined and newline-terminated.

use ircbot_types::strip_channel_prefix;

/// `USER <nick> <service> <server> ircbot`
pub fn user(nick: &str, service_name: &str, server: &str) -> String {
    format!("USER {nick} {service_name} {server} ircbot\n")
}

pub fn nick(nick: &str) -> String {
    format!("NICK {nick}\n")
}

/// `JOIN #channel`, adding the `#` if the configured name lacks it.
pub fn join(channel: &str) -> String {
    format!("JOIN #{}\n", strip_channel_prefix(channel))
}

/// Reply to a server `PING` carrying the same payload.
pub fn pong(payload: &str) -> String {
    format!("PONG {payload}\n")
}
