//! Replies to `!test` in joined channels and in private messages.

use ircbot_engine::{Plugin, Registrar};
use ircbot_hooks::DEFAULT_PRIORITY;
use ircbot_types::{IrcEvent, Session, actions};

pub const NAME: &str = "sample";

const COMMAND: &str = "!test";
const REPLY: &str = "♩♫♫♩♬♪♩♫♬♩";

fn is_command(message: &str) -> bool {
    message
        .get(..COMMAND.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(COMMAND))
}

pub struct SamplePlugin;

impl SamplePlugin {
    fn check_commands(event: &IrcEvent, session: &mut Session) -> anyhow::Result<()> {
        match event {
            IrcEvent::ChannelMessage {
                username,
                channel,
                message,
            } if is_command(message) => {
                session.send_channel_message(channel, &format!("{username}: {REPLY}"));
            }
            IrcEvent::PrivateMessage {
                username, message, ..
            } if is_command(message) => {
                session.send_private_message(username, REPLY);
            }
            _ => {}
        }
        Ok(())
    }
}

impl Plugin for SamplePlugin {
    fn name(&self) -> &str {
        NAME
    }

    fn register(&self, registrar: &mut Registrar<'_>) -> anyhow::Result<()> {
        registrar.on_action(actions::CHANNEL_MESSAGE, DEFAULT_PRIORITY, Self::check_commands);
        registrar.on_action(actions::PRIVATE_MESSAGE, DEFAULT_PRIORITY, Self::check_commands);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ircbot_cron::CronScheduler;
    use ircbot_hooks::HookBus;

    fn message(text: &str) -> IrcEvent {
        IrcEvent::ChannelMessage {
            username: "alice".into(),
            channel: "room".into(),
            message: text.into(),
        }
    }

    fn joined() -> Session {
        let mut session = Session::new("bot");
        session.mark_joined("room");
        session
    }

    #[test]
    fn test_replies_to_command() {
        let mut session = joined();
        SamplePlugin::check_commands(&message("!TEST please"), &mut session).unwrap();
        assert_eq!(
            session.take_outbound(),
            vec!["PRIVMSG #room :alice: ♩♫♫♩♬♪♩♫♬♩\n"]
        );
    }

    #[test]
    fn test_ignores_other_messages() {
        let mut session = joined();
        SamplePlugin::check_commands(&message("say !test"), &mut session).unwrap();
        SamplePlugin::check_commands(&message("!te"), &mut session).unwrap();
        assert!(!session.has_outbound());
    }

    #[test]
    fn test_private_command_replies_to_sender() {
        let mut hooks = HookBus::new();
        let mut cron = CronScheduler::new();
        SamplePlugin
            .register(&mut Registrar::new(&mut hooks, &mut cron))
            .unwrap();

        let event = IrcEvent::PrivateMessage {
            username: "alice".into(),
            channel: "bot".into(),
            message: "!test".into(),
        };
        let mut session = Session::new("bot");
        hooks.do_action(actions::PRIVATE_MESSAGE, &event, &mut session);
        assert_eq!(session.take_outbound(), vec!["PRIVMSG alice :♩♫♫♩♬♪♩♫♬♩\n"]);
    }
}
