//! ircbot-engine: The poll loop tying transport, classifier, hooks and cron together.
//!
//! ```text
//! Transport::wait_readable (bounded)
//!     ↓ ready
//! Transport::read → LineFramer → Classifier
//!     ↓ IrcEvent
//! RosterStore bookkeeping + HookBus::do_action
//!     ↓
//! CronScheduler::tick (every iteration)
//!     ↓
//! Session outbound queue → Transport::write
//! ```

pub mod engine;
pub mod error;
pub mod plugin;

pub use engine::Engine;
pub use error::EngineError;
pub use plugin::{Plugin, PluginError, PluginLoader, Registrar};
