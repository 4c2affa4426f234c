//! Handler traits for actions and filters.

use ircbot_types::{IrcEvent, Session};

/// Subscriber to a named action.
///
/// Handlers run on the poll loop's thread; use interior mutability for any
/// state they keep. The returned error is logged and does not stop dispatch.
pub trait ActionHandler: Send + Sync {
    fn handle(&self, event: &IrcEvent, session: &mut Session) -> anyhow::Result<()>;
}

impl<F> ActionHandler for F
where
    F: Fn(&IrcEvent, &mut Session) -> anyhow::Result<()> + Send + Sync,
{
    fn handle(&self, event: &IrcEvent, session: &mut Session) -> anyhow::Result<()> {
        self(event, session)
    }
}

/// A single stage of a filter pipeline.
pub trait FilterHandler: Send + Sync {
    fn transform(&self, data: String) -> String;
}

impl<F> FilterHandler for F
where
    F: Fn(String) -> String + Send + Sync,
{
    fn transform(&self, data: String) -> String {
        self(data)
    }
}
