//! ircbot-hooks: Priority-ordered action and filter hooks.
//!
//! Actions broadcast a classified [`IrcEvent`](ircbot_types::IrcEvent) to
//! every subscribed handler. Filters thread a value through a chain of
//! transforms. Both run handlers in ascending priority order, synchronously,
//! on the caller's thread.

pub mod handler;
pub mod registry;

pub use handler::{ActionHandler, FilterHandler};
pub use registry::{DEFAULT_PRIORITY, HookBus};
