//! Hook bus: manages action/filter subscriptions and dispatches events.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use ircbot_types::{IrcEvent, Session, run_isolated};

use crate::handler::{ActionHandler, FilterHandler};

/// Priority used by extensions that have no ordering requirement.
pub const DEFAULT_PRIORITY: i32 = 10;

struct Registration<H: ?Sized> {
    priority: i32,
    sequence: u64,
    handler: Arc<H>,
}

impl<H: ?Sized> Registration<H> {
    fn order_key(&self) -> (i32, u64) {
        (self.priority, self.sequence)
    }
}

/// Insert keeping the list sorted by `(priority, sequence)`, so ties run in
/// registration order.
fn insert_ordered<H: ?Sized>(list: &mut Vec<Registration<H>>, registration: Registration<H>) {
    let key = registration.order_key();
    let index = list.partition_point(|r| r.order_key() < key);
    list.insert(index, registration);
}

/// Registry of named actions and filters.
pub struct HookBus {
    actions: HashMap<String, Vec<Registration<dyn ActionHandler>>>,
    filters: HashMap<String, Vec<Registration<dyn FilterHandler>>>,
    next_sequence: u64,
    isolate: bool,
}

impl HookBus {
    /// Create an empty bus that contains handler panics.
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
            filters: HashMap::new(),
            next_sequence: 0,
            isolate: true,
        }
    }

    /// Choose whether a panicking handler is caught and logged (`true`) or
    /// unwinds through the dispatch call (`false`).
    pub fn with_isolation(mut self, isolate: bool) -> Self {
        self.isolate = isolate;
        self
    }

    fn sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    // ─── Actions ────────────────────────────────────────────

    /// Subscribe `handler` to the action `name`. Lower priorities run first.
    pub fn register_action(&mut self, name: &str, priority: i32, handler: Arc<dyn ActionHandler>) {
        let sequence = self.sequence();
        debug!(action = name, priority, "Registering action handler");
        insert_ordered(
            self.actions.entry(name.to_string()).or_default(),
            Registration {
                priority,
                sequence,
                handler,
            },
        );
    }

    /// Subscribe a closure to the action `name`.
    pub fn on_action<F>(&mut self, name: &str, priority: i32, f: F)
    where
        F: Fn(&IrcEvent, &mut Session) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register_action(name, priority, Arc::new(f));
    }

    /// Remove every handler subscribed to `name`.
    pub fn remove_action(&mut self, name: &str) {
        if self.actions.remove(name).is_some() {
            debug!(action = name, "Removed action handlers");
        }
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.action_count(name) > 0
    }

    pub fn action_count(&self, name: &str) -> usize {
        self.actions.get(name).map_or(0, Vec::len)
    }

    /// Invoke every handler for `name` in priority order.
    ///
    /// Handler outcomes are ignored: errors and contained panics are logged
    /// and the next handler still runs. No handlers means no-op.
    pub fn do_action(&self, name: &str, event: &IrcEvent, session: &mut Session) {
        let Some(handlers) = self.actions.get(name) else {
            return;
        };

        for registration in handlers {
            let outcome = run_isolated(self.isolate, || {
                registration.handler.handle(event, session)
            });
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(
                    action = name,
                    priority = registration.priority,
                    "Action handler failed: {e:#}"
                ),
                Err(panic) => warn!(
                    action = name,
                    priority = registration.priority,
                    "Action handler panicked: {panic}"
                ),
            }
        }
    }

    // ─── Filters ────────────────────────────────────────────

    /// Add `handler` to the filter pipeline `name`. Lower priorities run first.
    pub fn register_filter(&mut self, name: &str, priority: i32, handler: Arc<dyn FilterHandler>) {
        let sequence = self.sequence();
        debug!(filter = name, priority, "Registering filter handler");
        insert_ordered(
            self.filters.entry(name.to_string()).or_default(),
            Registration {
                priority,
                sequence,
                handler,
            },
        );
    }

    /// Add a closure to the filter pipeline `name`.
    pub fn on_filter<F>(&mut self, name: &str, priority: i32, f: F)
    where
        F: Fn(String) -> String + Send + Sync + 'static,
    {
        self.register_filter(name, priority, Arc::new(f));
    }

    /// Remove every handler in the filter pipeline `name`.
    pub fn remove_filter(&mut self, name: &str) {
        if self.filters.remove(name).is_some() {
            debug!(filter = name, "Removed filter handlers");
        }
    }

    pub fn filter_count(&self, name: &str) -> usize {
        self.filters.get(name).map_or(0, Vec::len)
    }

    /// Thread `data` through every filter for `name` in priority order.
    ///
    /// Each stage receives the previous stage's output. A stage that panics
    /// under isolation is skipped and its input passed on unchanged.
    pub fn apply_filter(&self, name: &str, data: String) -> String {
        let Some(handlers) = self.filters.get(name) else {
            return data;
        };

        let mut data = data;
        for registration in handlers {
            if !self.isolate {
                data = registration.handler.transform(data);
                continue;
            }
            let input = data.clone();
            match run_isolated(true, || registration.handler.transform(input)) {
                Ok(output) => data = output,
                Err(panic) => warn!(
                    filter = name,
                    priority = registration.priority,
                    "Filter handler panicked, passing value through: {panic}"
                ),
            }
        }
        data
    }

    /// Sequence numbers in dispatch order, for ordering tests.
    #[cfg(test)]
    fn action_sequences(&self, name: &str) -> Vec<u64> {
        self.actions
            .get(name)
            .map(|list| list.iter().map(|r| r.sequence).collect())
            .unwrap_or_default()
    }
}

impl Default for HookBus {
    fn default() -> Self {
        Self::new()
    }
}
