//! Protocol line classifier.
//!
//! Rules are tried in a fixed order and the first match wins:
//! ping, username-taken, PRIVMSG, PART, JOIN, NAMES (353), QUIT, NICK.
//! The order matters: a PRIVMSG whose text contains ` JOIN #x` is a message,
//! not a join.

use once_cell::sync::Lazy;
use regex::Regex;

use ircbot_types::{IrcEvent, UNKNOWN_USER, strip_channel_prefix};

static USERNAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:([^!\s]+)!").expect("valid regex"));
static PING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^PING\s").expect("valid regex"));
static NICK_IN_USE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Nickname is already in use\.").expect("valid regex"));
static PRIVMSG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\sPRIVMSG\s(\S+)\s:(.*)$").expect("valid regex"));
static PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\sPART\s#([^\s,]+)(?:\s|$)").expect("valid regex"));
static JOIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\sJOIN\s:?#([^\s,]+)").expect("valid regex"));
static QUIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\sQUIT(?:\s|$)").expect("valid regex"));
static NICK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\sNICK\s:?(\S+)").expect("valid regex"));

/// Membership prefixes a NAMES reply may put in front of a nick.
const MEMBER_PREFIXES: &[char] = &['~', '&', '@', '%', '+'];

/// Classifies inbound lines for one bot nick.
#[derive(Debug, Clone)]
pub struct Classifier {
    nick: String,
    names_reply: Regex,
}

impl Classifier {
    pub fn new(nick: &str) -> Result<Self, regex::Error> {
        let names_reply = Regex::new(&format!(
            r"(?i)\s353\s{}\s[=*@]\s#?([^\s:]+)\s:(.*)$",
            regex::escape(nick)
        ))?;
        Ok(Self {
            nick: nick.to_string(),
            names_reply,
        })
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// The sender nick from a `:nick!user@host` prefix, without a leading `@`.
    pub fn extract_username(line: &str) -> Option<&str> {
        USERNAME
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim_start_matches('@'))
    }

    /// Map one line to an event, or `None` if no rule matches.
    pub fn classify(&self, line: &str) -> Option<IrcEvent> {
        let sender = Self::extract_username(line);
        let username = sender.unwrap_or(UNKNOWN_USER).to_string();

        if let Some(m) = PING.find(line) {
            return Some(IrcEvent::Ping {
                payload: line[m.end()..].to_string(),
            });
        }

        // Server lines only.
        if sender.is_none() && NICK_IN_USE.is_match(line) {
            return Some(IrcEvent::UsernameTaken);
        }

        if let Some(caps) = PRIVMSG.captures(line) {
            let target = &caps[1];
            let message: String = caps[2].chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
            if !target.starts_with('#') && target == self.nick {
                return Some(IrcEvent::PrivateMessage {
                    username,
                    channel: target.to_string(),
                    message,
                });
            }
            return Some(IrcEvent::ChannelMessage {
                username,
                channel: strip_channel_prefix(target).to_string(),
                message,
            });
        }

        if let Some(caps) = PART.captures(line) {
            return Some(IrcEvent::UserPart {
                username,
                channel: caps[1].to_string(),
            });
        }

        if let Some(caps) = JOIN.captures(line) {
            return Some(IrcEvent::UserJoin {
                username,
                channel: caps[1].to_string(),
            });
        }

        if let Some(caps) = self.names_reply.captures(line) {
            let channel = strip_channel_prefix(&caps[1]).to_string();
            let users = caps[2]
                .split_whitespace()
                .map(|u| u.trim_start_matches(MEMBER_PREFIXES))
                .filter(|u| !u.is_empty() && *u != self.nick)
                .map(str::to_string)
                .collect();
            return Some(IrcEvent::NamesReply { channel, users });
        }

        if QUIT.is_match(line) {
            return Some(IrcEvent::UserQuit { username });
        }

        if let Some(caps) = NICK.captures(line) {
            return Some(IrcEvent::NickChange {
                old_nick: username,
                new_nick: caps[1].to_string(),
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new("bot").unwrap()
    }

    #[test]
    fn test_extract_username() {
        assert_eq!(Classifier::extract_username(":alice!u@h QUIT"), Some("alice"));
        assert_eq!(Classifier::extract_username(":@op!u@h QUIT"), Some("op"));
        assert_eq!(Classifier::extract_username("PING :irc.example.net"), None);
        assert_eq!(
            Classifier::extract_username(":irc.example.net 353 bot = #room :a!b"),
            None
        );
    }

    #[test]
    fn test_ping() {
        assert_eq!(
            classifier().classify("PING :irc.example.net"),
            Some(IrcEvent::Ping {
                payload: ":irc.example.net".into()
            })
        );
    }

    #[test]
    fn test_username_taken_from_server() {
        let line = ":irc.example.net 433 * bot :Nickname is already in use.";
        assert_eq!(classifier().classify(line), Some(IrcEvent::UsernameTaken));
    }

    #[test]
    fn test_username_taken_phrase_in_chat_is_a_message() {
        let line = ":eve!u@h PRIVMSG #room :Nickname is already in use.";
        assert!(matches!(
            classifier().classify(line),
            Some(IrcEvent::ChannelMessage { .. })
        ));
    }

    #[test]
    fn test_channel_message() {
        assert_eq!(
            classifier().classify(":alice!u@h PRIVMSG #room :hello"),
            Some(IrcEvent::ChannelMessage {
                username: "alice".into(),
                channel: "room".into(),
                message: "hello".into(),
            })
        );
    }

    #[test]
    fn test_message_text_keeps_colons_and_spaces() {
        let event = classifier()
            .classify(":alice!u@h PRIVMSG #room :note: a :b c")
            .unwrap();
        assert_eq!(event.message(), Some("note: a :b c"));
    }

    #[test]
    fn test_private_message() {
        assert_eq!(
            classifier().classify(":alice!u@h PRIVMSG bot :hi"),
            Some(IrcEvent::PrivateMessage {
                username: "alice".into(),
                channel: "bot".into(),
                message: "hi".into(),
            })
        );
    }

    #[test]
    fn test_message_to_other_user_is_not_private() {
        assert!(matches!(
            classifier().classify(":alice!u@h PRIVMSG carol :hi"),
            Some(IrcEvent::ChannelMessage { .. })
        ));
    }

    #[test]
    fn test_privmsg_wins_over_join_text() {
        assert!(matches!(
            classifier().classify(":alice!u@h PRIVMSG #room :please JOIN #other now"),
            Some(IrcEvent::ChannelMessage { .. })
        ));
    }

    #[test]
    fn test_part() {
        assert_eq!(
            classifier().classify(":alice!u@h PART #room :bye"),
            Some(IrcEvent::UserPart {
                username: "alice".into(),
                channel: "room".into(),
            })
        );
        assert_eq!(
            classifier().classify(":alice!u@h PART #room"),
            Some(IrcEvent::UserPart {
                username: "alice".into(),
                channel: "room".into(),
            })
        );
    }

    #[test]
    fn test_join_with_and_without_colon() {
        let expected = Some(IrcEvent::UserJoin {
            username: "bob".into(),
            channel: "room".into(),
        });
        assert_eq!(classifier().classify(":bob!u@h JOIN #room"), expected);
        assert_eq!(classifier().classify(":bob!u@h JOIN :#room"), expected);
    }

    #[test]
    fn test_names_reply() {
        assert_eq!(
            classifier().classify(":irc.example.net 353 bot @ #room :bot @alice bob"),
            Some(IrcEvent::NamesReply {
                channel: "room".into(),
                users: vec!["alice".into(), "bob".into()],
            })
        );
    }

    #[test]
    fn test_names_reply_public_channel_and_prefixes() {
        assert_eq!(
            classifier().classify(":irc.example.net 353 bot = #room :@bot +carol %dave "),
            Some(IrcEvent::NamesReply {
                channel: "room".into(),
                users: vec!["carol".into(), "dave".into()],
            })
        );
    }

    #[test]
    fn test_names_reply_for_other_nick_is_ignored() {
        assert_eq!(
            classifier().classify(":irc.example.net 353 robot = #room :alice"),
            None
        );
    }

    #[test]
    fn test_quit() {
        assert_eq!(
            classifier().classify(":alice!u@h QUIT :Quit: gone"),
            Some(IrcEvent::UserQuit {
                username: "alice".into()
            })
        );
    }

    #[test]
    fn test_nick_change() {
        assert_eq!(
            classifier().classify(":alice!u@h NICK :alicia"),
            Some(IrcEvent::NickChange {
                old_nick: "alice".into(),
                new_nick: "alicia".into(),
            })
        );
    }

    #[test]
    fn test_unknown_user_and_unmatched_lines() {
        assert_eq!(
            classifier().classify("NOTICE * :*** Looking up your hostname"),
            None
        );
        assert_eq!(classifier().classify(""), None);
        assert_eq!(
            classifier().classify("server PRIVMSG #room :no prefix"),
            Some(IrcEvent::ChannelMessage {
                username: UNKNOWN_USER.into(),
                channel: "room".into(),
                message: "no prefix".into(),
            })
        );
    }

    #[test]
    fn test_nick_with_regex_metacharacters() {
        let classifier = Classifier::new("bot|away").unwrap();
        assert!(matches!(
            classifier.classify(":srv 353 bot|away = #room :x"),
            Some(IrcEvent::NamesReply { .. })
        ));
        assert_eq!(classifier.classify(":srv 353 bot = #room :x"), None);
    }
}
