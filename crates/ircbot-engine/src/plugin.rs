//! Extension registration.
//!
//! A [`Plugin`] is handed a [`Registrar`] once at startup and subscribes its
//! handlers and cron jobs through it. Discovery is the caller's business:
//! the [`PluginLoader`] only registers what it is given.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use ircbot_cron::{CronError, CronScheduler, CronTask, IntervalSpec};
use ircbot_hooks::{ActionHandler, FilterHandler, HookBus};
use ircbot_types::{IrcEvent, Session};

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Unknown plugin \"{0}\"")]
    Unknown(String),
    #[error("Plugin \"{name}\" failed to register: {source:#}")]
    Registration {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// An extension compiled into the bot.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// Subscribe handlers and jobs. Any error is fatal at startup.
    fn register(&self, registrar: &mut Registrar<'_>) -> anyhow::Result<()>;
}

/// Registration API handed to plugins.
pub struct Registrar<'a> {
    hooks: &'a mut HookBus,
    cron: &'a mut CronScheduler,
}

impl<'a> Registrar<'a> {
    pub fn new(hooks: &'a mut HookBus, cron: &'a mut CronScheduler) -> Self {
        Self { hooks, cron }
    }

    pub fn add_action(&mut self, name: &str, priority: i32, handler: Arc<dyn ActionHandler>) {
        self.hooks.register_action(name, priority, handler);
    }

    pub fn on_action<F>(&mut self, name: &str, priority: i32, f: F)
    where
        F: Fn(&IrcEvent, &mut Session) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.hooks.on_action(name, priority, f);
    }

    pub fn remove_action(&mut self, name: &str) {
        self.hooks.remove_action(name);
    }

    pub fn add_filter(&mut self, name: &str, priority: i32, handler: Arc<dyn FilterHandler>) {
        self.hooks.register_filter(name, priority, handler);
    }

    pub fn on_filter<F>(&mut self, name: &str, priority: i32, f: F)
    where
        F: Fn(String) -> String + Send + Sync + 'static,
    {
        self.hooks.on_filter(name, priority, f);
    }

    pub fn remove_filter(&mut self, name: &str) {
        self.hooks.remove_filter(name);
    }

    pub fn add_cron_job(
        &mut self,
        name: &str,
        interval: IntervalSpec,
        task: Arc<dyn CronTask>,
    ) -> Result<(), CronError> {
        self.cron.register(name, interval, task)
    }

    pub fn schedule<F>(&mut self, name: &str, interval: IntervalSpec, f: F) -> Result<(), CronError>
    where
        F: Fn(&mut Session) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.cron.schedule(name, interval, f)
    }

    pub fn remove_cron_job(&mut self, name: &str) -> bool {
        self.cron.remove(name)
    }
}

/// Registers a fixed set of plugins.
#[derive(Default)]
pub struct PluginLoader {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Register every plugin in insertion order, stopping at the first failure.
    pub fn load(&self, registrar: &mut Registrar<'_>) -> Result<Vec<String>, PluginError> {
        let mut loaded = Vec::with_capacity(self.plugins.len());
        for plugin in &self.plugins {
            plugin
                .register(registrar)
                .map_err(|source| PluginError::Registration {
                    name: plugin.name().to_string(),
                    source,
                })?;
            info!(plugin = plugin.name(), "Plugin loaded");
            loaded.push(plugin.name().to_string());
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ircbot_types::actions;

    struct Greeter;

    impl Plugin for Greeter {
        fn name(&self) -> &str {
            "greeter"
        }

        fn register(&self, registrar: &mut Registrar<'_>) -> anyhow::Result<()> {
            registrar.on_action(actions::USER_JOIN, 10, |event, session| {
                if let (Some(user), Some(channel)) = (event.username(), event.channel()) {
                    session.send_channel_message(channel, &format!("welcome {user}"));
                }
                Ok(())
            });
            registrar.schedule("greeter.heartbeat", IntervalSpec::every_second(), |_| Ok(()))?;
            Ok(())
        }
    }

    #[test]
    fn test_load_registers_hooks_and_jobs() {
        let mut hooks = HookBus::new();
        let mut cron = CronScheduler::new();
        let mut loader = PluginLoader::new();
        loader.add(Box::new(Greeter));

        let loaded = loader
            .load(&mut Registrar::new(&mut hooks, &mut cron))
            .unwrap();
        assert_eq!(loaded, vec!["greeter"]);
        assert!(hooks.has_action(actions::USER_JOIN));
        assert!(cron.contains("greeter.heartbeat"));
    }

    #[test]
    fn test_duplicate_job_fails_registration() {
        let mut hooks = HookBus::new();
        let mut cron = CronScheduler::new();
        let mut loader = PluginLoader::new();
        loader.add(Box::new(Greeter));
        loader.add(Box::new(Greeter));

        let err = loader
            .load(&mut Registrar::new(&mut hooks, &mut cron))
            .unwrap_err();
        assert!(matches!(err, PluginError::Registration { ref name, .. } if name == "greeter"));
        assert!(err.to_string().contains("greeter.heartbeat"));
        assert_eq!(cron.len(), 1);
    }
}
