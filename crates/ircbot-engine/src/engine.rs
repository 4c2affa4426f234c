//! The poll loop.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use ircbot_channel_irc::{Classifier, LineFramer, Readiness, Transport, commands};
use ircbot_config::BotConfig;
use ircbot_cron::CronScheduler;
use ircbot_hooks::HookBus;
use ircbot_storage::RosterStore;
use ircbot_types::{IrcEvent, Session};

use crate::error::EngineError;
use crate::plugin::{PluginLoader, Registrar};

/// Owns every piece of connection state and drives it from a single loop.
///
/// Handlers and cron tasks run synchronously inside the loop; a slow one
/// delays the next read and the next tick.
pub struct Engine {
    server: String,
    service_name: String,
    channels: Vec<String>,
    debug: bool,
    poll_interval: Duration,
    read_buffer: usize,
    transport: Box<dyn Transport>,
    roster: Arc<dyn RosterStore>,
    framer: LineFramer,
    classifier: Classifier,
    hooks: HookBus,
    cron: CronScheduler,
    session: Session,
}

impl Engine {
    pub fn new(
        config: &BotConfig,
        transport: Box<dyn Transport>,
        roster: Arc<dyn RosterStore>,
    ) -> Result<Self, EngineError> {
        let isolate = config.engine.isolate_handlers;
        Ok(Self {
            server: config.irc.server.clone(),
            service_name: config.irc.service_name.clone(),
            channels: config.irc.channels.clone(),
            debug: config.irc.debug,
            poll_interval: Duration::from_millis(config.engine.poll_interval_ms),
            read_buffer: config.engine.read_buffer,
            transport,
            roster,
            framer: LineFramer::new(config.engine.framing),
            classifier: Classifier::new(&config.irc.nick)?,
            hooks: HookBus::new().with_isolation(isolate),
            cron: CronScheduler::new().with_isolation(isolate),
            session: Session::new(config.irc.nick.clone()),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn hooks(&self) -> &HookBus {
        &self.hooks
    }

    pub fn cron(&self) -> &CronScheduler {
        &self.cron
    }

    /// Registration access for extensions.
    pub fn registrar(&mut self) -> Registrar<'_> {
        Registrar::new(&mut self.hooks, &mut self.cron)
    }

    /// Register every plugin held by `loader`.
    pub fn load_plugins(&mut self, loader: &PluginLoader) -> Result<Vec<String>, EngineError> {
        Ok(loader.load(&mut self.registrar())?)
    }

    /// Connect, log in, then poll until a fatal error occurs.
    ///
    /// Only returns on error; the transport is closed before returning.
    pub async fn run(&mut self) -> Result<(), EngineError> {
        let result = self.run_inner().await;
        if let Err(e) = &result {
            error!("Engine stopped: {e}");
        }
        if let Err(e) = self.transport.close().await {
            debug!("Error while closing transport: {e}");
        }
        result
    }

    async fn run_inner(&mut self) -> Result<(), EngineError> {
        self.connect().await?;
        loop {
            self.poll_once().await?;
        }
    }

    /// Reset the roster, open the transport and send USER, NICK and JOINs.
    pub async fn connect(&mut self) -> Result<(), EngineError> {
        self.roster.clear()?;
        self.transport.connect().await?;

        let nick = self.session.nick().to_string();
        self.write(&commands::user(&nick, &self.service_name, &self.server))
            .await?;
        self.write(&commands::nick(&nick)).await?;
        for channel in self.channels.clone() {
            self.write(&commands::join(&channel)).await?;
        }
        info!(nick = %nick, server = %self.server, channels = self.channels.len(), "Logged in");
        Ok(())
    }

    /// One loop iteration: bounded wait, read and dispatch if data arrived,
    /// then one cron tick.
    pub async fn poll_once(&mut self) -> Result<(), EngineError> {
        if self.transport.wait_readable(self.poll_interval).await? == Readiness::Ready {
            let data = self.transport.read(self.read_buffer).await?;
            if !data.is_empty() {
                if self.debug {
                    info!(raw = %String::from_utf8_lossy(&data), "Inbound data");
                }
                for line in self.framer.push(&data) {
                    self.process_line(&line).await?;
                }
            }
        }

        self.cron.tick(&mut self.session);
        self.flush().await
    }

    /// Classify one line and apply it: pong, roster bookkeeping, session
    /// state, then the matching action.
    pub async fn process_line(&mut self, line: &str) -> Result<Option<IrcEvent>, EngineError> {
        let Some(event) = self.classifier.classify(line) else {
            return Ok(None);
        };

        match &event {
            IrcEvent::Ping { payload } => {
                self.write(&commands::pong(payload)).await?;
                return Ok(Some(event));
            }
            IrcEvent::UsernameTaken => {
                return Err(EngineError::NicknameInUse {
                    nick: self.session.nick().to_string(),
                    server: self.server.clone(),
                });
            }
            IrcEvent::UserJoin { username, channel } => {
                self.roster.add_membership(username, channel)?;
                if username == self.session.nick() && self.session.mark_joined(channel) {
                    info!(channel = %channel, "Joined channel");
                }
            }
            IrcEvent::UserPart { username, channel } => {
                self.roster.remove_membership(username, Some(channel))?;
                if username == self.session.nick() && self.session.mark_parted(channel) {
                    info!(channel = %channel, "Left channel");
                }
            }
            IrcEvent::UserQuit { username } => {
                self.roster.remove_membership(username, None)?;
            }
            IrcEvent::NickChange { old_nick, new_nick } => {
                self.roster.rename_user(old_nick, new_nick)?;
            }
            IrcEvent::NamesReply { .. } => {
                for membership in event.memberships() {
                    self.roster
                        .add_membership(membership.username, membership.channel)?;
                }
            }
            IrcEvent::ChannelMessage { .. } | IrcEvent::PrivateMessage { .. } => {}
        }

        if let Some(action) = event.action_name() {
            debug!(action, "Dispatching action");
            self.hooks.do_action(action, &event, &mut self.session);
        }
        self.flush().await?;
        Ok(Some(event))
    }

    /// Write everything handlers and jobs queued on the session.
    async fn flush(&mut self) -> Result<(), EngineError> {
        for line in self.session.take_outbound() {
            self.write(&line).await?;
        }
        Ok(())
    }

    async fn write(&mut self, line: &str) -> Result<(), EngineError> {
        self.transport.write(line.as_bytes()).await?;
        Ok(())
    }
}
