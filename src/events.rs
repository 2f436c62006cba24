//! Event sink for tracing notable state transitions
//!
//! The worker and the sync protocol report every notable step through a
//! single-string observer. Consumers use it for test assertions and node
//! dashboards; when no sink is installed the emissions still land on the
//! `tracing` output.

use std::sync::Arc;

/// Observer invoked with a human-readable line per notable event.
pub type EventHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// An optional event sink. Absent sink is a safe no-op.
#[derive(Clone, Default)]
pub struct Events {
    handler: Option<EventHandler>,
}

impl Events {
    pub fn new(handler: Option<EventHandler>) -> Self {
        Events { handler }
    }

    pub fn emit(&self, message: &str) {
        tracing::debug!(target: "emberchain::events", "{}", message);
        if let Some(handler) = &self.handler {
            handler(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn emit_reaches_installed_handler() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let events = Events::new(Some(Arc::new(move |msg: &str| {
            sink.lock().push(msg.to_string());
        })));

        events.emit("one");
        events.emit("two");
        assert_eq!(*seen.lock(), vec!["one".to_string(), "two".to_string()]);
    }

    #[test]
    fn absent_handler_is_a_noop() {
        Events::default().emit("nobody listening");
    }
}
